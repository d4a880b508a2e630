use indexmap::IndexMap;

use crate::common::{Value, DOC_ID, FIELD_SEPARATOR};
use crate::errors::{DocResult, DocSqlError, ErrorKind};
use std::borrow::Cow;
use std::fmt::{Debug, Display};

/// Represents a schema-less document.
///
/// A document is an insertion-ordered mapping of [String] keys to [Value]s.
/// It is stored as one JSON blob per row in the collection's table.
///
/// Nested documents are addressed with dotted paths: in `{"a": {"b": 1}}`
/// the value `1` is reached through `document.get("a.b")`. Array elements can
/// be addressed by position (`"items.0"`).
///
/// The field `id` is the conventional identity of a document. Inserting a
/// document without one assigns a generated id.
///
/// Equality ignores key order.
#[derive(Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct Document {
    data: IndexMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document {
            data: IndexMap::new(),
        }
    }

    /// Checks if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Associates the specified [Value] with the specified key in this document.
    ///
    /// If the key contains the field separator (`.`), intermediate documents are
    /// created as needed and the value is put at the embedded position.
    ///
    /// # Errors
    ///
    /// Returns an error if the key, or one of its path segments, is empty.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let mut doc = Document::new();
    /// doc.put("user.name", "Alice")?;
    /// assert_eq!(doc.get("user.name"), Some(&Value::from("Alice")));
    /// ```
    pub fn put<'a, T: Into<Value>>(&mut self, key: impl Into<Cow<'a, str>>, value: T) -> DocResult<()> {
        let key = key.into();
        // key cannot be empty
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(DocSqlError::new(
                "Document does not support empty key",
                ErrorKind::InvalidName,
            ));
        }

        let value = value.into();
        if key.contains(FIELD_SEPARATOR) {
            let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
            self.deep_put(&splits, value)
        } else {
            self.data.insert(key.into_owned(), value);
            Ok(())
        }
    }

    /// Inserts a value under a literal top-level key, without path expansion.
    ///
    /// Returns the previous value, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(key.into(), value.into())
    }

    /// Returns the value at the given key or dotted path.
    ///
    /// A literal top-level key wins over path expansion, so a stored key
    /// `"a.b"` is still reachable.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.data.get(key) {
            Some(value) => Some(value),
            None if key.contains(FIELD_SEPARATOR) => {
                let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
                let first = self.data.get(splits[0])?;
                recursive_get(first, &splits[1..])
            }
            None => None,
        }
    }

    /// Returns a mutable reference to a top-level value.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.data.get_mut(key)
    }

    /// Returns the identity field `id`, if present.
    pub fn id(&self) -> Option<&Value> {
        self.data.get(DOC_ID)
    }

    /// Checks if this document carries an identity field.
    pub fn has_id(&self) -> bool {
        self.data.contains_key(DOC_ID)
    }

    /// Retrieves all fields (top level and embedded) of this document.
    ///
    /// Embedded fields are joined with the field separator.
    pub fn fields(&self) -> Vec<String> {
        self.get_fields_internal("")
    }

    /// Removes the key (or dotted path) and returns its value.
    ///
    /// Removing a missing key is not an error.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        if let Some(value) = self.data.shift_remove(key) {
            return Some(value);
        }

        if key.contains(FIELD_SEPARATOR) {
            let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
            self.deep_remove(&splits)
        } else {
            None
        }
    }

    /// Removes a top-level key only; dots in `key` are not path separators.
    pub fn remove_key(&mut self, key: &str) -> Option<Value> {
        self.data.shift_remove(key)
    }

    /// Returns the number of top-level entries in the document.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Shallow-merges another document over this one.
    ///
    /// Every top-level entry of `other` replaces the entry with the same key.
    pub fn merge(&mut self, other: &Document) {
        for (key, value) in other.data.iter() {
            self.data.insert(key.clone(), value.clone());
        }
    }

    /// Checks if a top-level key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Checks if a field exists, following dotted paths.
    pub fn contains_field(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Iterates over the top-level entries in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.data.iter()
    }

    /// Iterates over the top-level keys in insertion order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.data.keys()
    }

    /// Converts this document into a `serde_json::Value` object.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::with_capacity(self.data.len());
        for (key, value) in self.data.iter() {
            map.insert(key.clone(), value.to_json());
        }
        serde_json::Value::Object(map)
    }

    /// Serializes this document into its stored JSON text.
    pub fn to_json_string(&self) -> DocResult<String> {
        serde_json::to_string(self).map_err(|err| {
            log::error!("Failed to encode document: {}", err);
            DocSqlError::from_driver("Failed to encode document", ErrorKind::EncodingError, err)
        })
    }

    /// Parses a stored JSON text into a document.
    ///
    /// # Errors
    ///
    /// Returns [ErrorKind::EncodingError] if the text is not a JSON object.
    pub fn from_json_str(json: &str) -> DocResult<Document> {
        match Value::from_json_str(json)? {
            Value::Document(doc) => Ok(doc),
            other => {
                log::error!("Stored blob is not a JSON object: {}", other);
                Err(DocSqlError::new(
                    "Stored blob is not a JSON object",
                    ErrorKind::EncodingError,
                ))
            }
        }
    }

    fn get_fields_internal(&self, prefix: &str) -> Vec<String> {
        let mut fields = Vec::new();
        for (key, value) in self.data.iter() {
            let field = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}{}{}", prefix, FIELD_SEPARATOR, key)
            };

            match value {
                Value::Document(doc) if !doc.is_empty() => {
                    fields.append(&mut doc.get_fields_internal(&field))
                }
                _ => fields.push(field),
            }
        }
        fields
    }

    fn deep_put(&mut self, splits: &[&str], value: Value) -> DocResult<()> {
        let key = splits[0];
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(DocSqlError::new(
                "Document does not support empty key",
                ErrorKind::InvalidName,
            ));
        }

        if splits.len() == 1 {
            self.data.insert(key.to_string(), value);
            return Ok(());
        }

        let remaining = &splits[1..];
        match self.data.get_mut(key) {
            Some(Value::Document(nested)) => nested.deep_put(remaining, value),
            _ => {
                // anything other than a document at this level is replaced
                let mut nested = Document::new();
                nested.deep_put(remaining, value)?;
                self.data.insert(key.to_string(), Value::Document(nested));
                Ok(())
            }
        }
    }

    fn deep_remove(&mut self, splits: &[&str]) -> Option<Value> {
        let key = splits[0];
        if splits.len() == 1 {
            return self.data.shift_remove(key);
        }

        match self.data.get_mut(key) {
            Some(Value::Document(nested)) => nested.deep_remove(&splits[1..]),
            Some(Value::Array(items)) => {
                let index = splits[1].parse::<usize>().ok()?;
                if index >= items.len() {
                    return None;
                }
                if splits.len() == 2 {
                    Some(items.remove(index))
                } else {
                    items[index]
                        .as_document_mut()
                        .and_then(|nested| nested.deep_remove(&splits[2..]))
                }
            }
            _ => None,
        }
    }
}

fn recursive_get<'a>(value: &'a Value, splits: &[&str]) -> Option<&'a Value> {
    if splits.is_empty() {
        return Some(value);
    }

    match value {
        Value::Document(doc) => {
            let next = doc.data.get(splits[0])?;
            recursive_get(next, &splits[1..])
        }
        Value::Array(items) => {
            let index = splits[0].parse::<usize>().ok()?;
            recursive_get(items.get(index)?, &splits[1..])
        }
        _ => None,
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.data.iter()).finish()
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => write!(f, "{}", json),
            Err(_) => Err(std::fmt::Error),
        }
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Document {
            data: iter.into_iter().collect(),
        }
    }
}

pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Creates a [Document] with JSON-like syntax.
///
/// Negative numbers and other multi-token expressions must be wrapped in
/// parentheses. `null` is accepted as a literal.
///
/// # Examples
///
/// ```rust
/// use docsql::doc;
///
/// let empty = doc!{};
///
/// let simple = doc!{
///     name: "Alice",
///     age: 30
/// };
///
/// let pipeline_stage = doc!{
///     "sort": { "age": (-1) }
/// };
///
/// let complex = doc!{
///     user: {
///         name: "Charlie",
///         tags: ["admin", "user"],
///         manager: null
///     },
///     values: [1, 2, 3]
/// };
/// ```
#[macro_export]
macro_rules! doc {
    // match an empty document (with braces for backward compat)
    ({}) => {
        $crate::collection::Document::new()
    };

    // match an empty document
    () => {
        $crate::collection::Document::new()
    };

    // match a document with key value pairs wrapped in outer braces
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::doc!($($key : $value),*)
    };

    // match a document with key value pairs
    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            let mut doc = $crate::collection::Document::new();
            $(
                doc.insert($crate::collection::normalize(stringify!($key)), $crate::doc_value!($value));
            )*
            doc
        }
    };
}

/// Helper macro to convert values for the doc! macro.
/// Handles nested documents, arrays, null and expressions.
#[macro_export]
macro_rules! doc_value {
    // match a null literal
    (null) => {
        $crate::common::Value::Null
    };

    // match a nested document
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        {
            $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
        }
    };

    // match an array of values
    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    // match an expression (variable, function call, arithmetic in parens, literals, etc.)
    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
