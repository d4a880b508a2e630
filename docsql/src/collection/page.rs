use crate::collection::Document;
use crate::common::{Value, DEFAULT_PAGE_SIZE};

/// Keyset pagination options.
///
/// Documents are ordered on `cursor_field`; a page starts strictly after the
/// `after` cursor value (or at the beginning when it is `None`). The cursor
/// field should be unique and present in every document, otherwise pages may
/// skip or repeat documents.
///
/// # Examples
///
/// ```rust,ignore
/// let first = collection.find_page(all(), PageOptions::new("id").limit(2)).await?;
/// if let Some(cursor) = first.next_cursor.clone() {
///     let second = collection
///         .find_page(all(), PageOptions::new("id").limit(2).after(cursor))
///         .await?;
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PageOptions {
    pub(crate) cursor_field: String,
    pub(crate) after: Option<Value>,
    pub(crate) ascending: bool,
    pub(crate) limit: u64,
}

impl PageOptions {
    /// Ascending pages of [DEFAULT_PAGE_SIZE] documents from the beginning.
    pub fn new(cursor_field: &str) -> Self {
        PageOptions {
            cursor_field: cursor_field.to_string(),
            after: None,
            ascending: true,
            limit: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn after<T: Into<Value>>(mut self, cursor: T) -> Self {
        self.after = Some(cursor.into());
        self
    }

    pub fn descending(mut self) -> Self {
        self.ascending = false;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn cursor_field(&self) -> &str {
        &self.cursor_field
    }

    pub fn is_ascending(&self) -> bool {
        self.ascending
    }

    pub fn page_size(&self) -> u64 {
        self.limit
    }

    /// `filter` narrowed to documents strictly past the `after` cursor in
    /// page order.
    pub(crate) fn cursor_filter(&self, filter: Document) -> Document {
        let after = match &self.after {
            None => return filter,
            Some(after) => after,
        };

        let operator = if self.ascending { "gt" } else { "lt" };
        let mut bound = Document::new();
        bound.insert(operator, after.clone());
        let mut cursor = Document::new();
        cursor.insert(self.cursor_field.as_str(), bound);

        if filter.is_empty() {
            cursor
        } else {
            crate::filter::and(vec![filter, cursor])
        }
    }
}

/// One page of documents.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub documents: Vec<Document>,
    /// The last returned document's cursor value, when another page follows.
    pub next_cursor: Option<Value>,
    pub has_next: bool,
}

impl Page {
    /// Builds a page from rows fetched with one extra row of look-ahead.
    pub(crate) fn from_lookahead(mut documents: Vec<Document>, options: &PageOptions) -> Page {
        let page_size = usize::try_from(options.limit).unwrap_or(usize::MAX);
        let has_next = documents.len() > page_size;
        if has_next {
            documents.truncate(page_size);
        }

        let next_cursor = if has_next {
            documents
                .last()
                .and_then(|last| last.get(&options.cursor_field))
                .cloned()
        } else {
            None
        };

        Page {
            documents,
            next_cursor,
            has_next,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
