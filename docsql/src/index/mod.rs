//! Index descriptions for the expression indexes created on a collection's
//! document blob.
//!
//! An index covers one or more document fields. Each field becomes one key
//! part built from the dialect's extraction expression, so the index serves
//! the same expressions the predicate compiler emits.
//!
//! ```rust,ignore
//! use docsql::index::IndexSpec;
//! use docsql::common::SortOrder;
//!
//! let spec = IndexSpec::on("email").unique();
//! users.create_index(&spec).await?;
//!
//! let spec = IndexSpec::on("last_name")
//!     .and_field("first_name", SortOrder::Ascending)
//!     .named("by_full_name");
//! ```

use crate::common::{SortOrder, FIELD_SEPARATOR};

/// Describes an index to create on a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    name: Option<String>,
    fields: Vec<(String, SortOrder)>,
    unique: bool,
}

impl IndexSpec {
    /// Starts a non-unique ascending index on `field`.
    pub fn on(field: &str) -> IndexSpec {
        IndexSpec {
            name: None,
            fields: vec![(field.to_string(), SortOrder::Ascending)],
            unique: false,
        }
    }

    /// Creates an index spec over several fields.
    pub fn with_fields(fields: Vec<(String, SortOrder)>) -> IndexSpec {
        IndexSpec {
            name: None,
            fields,
            unique: false,
        }
    }

    /// Adds another key part.
    pub fn and_field(mut self, field: &str, order: SortOrder) -> IndexSpec {
        self.fields.push((field.to_string(), order));
        self
    }

    /// Sets the direction of the last added key part.
    pub fn descending(mut self) -> IndexSpec {
        if let Some(last) = self.fields.last_mut() {
            last.1 = SortOrder::Descending;
        }
        self
    }

    /// Marks the index unique.
    pub fn unique(mut self) -> IndexSpec {
        self.unique = true;
        self
    }

    /// Gives the index an explicit name.
    pub fn named(mut self, name: &str) -> IndexSpec {
        self.name = Some(name.to_string());
        self
    }

    pub fn fields(&self) -> &[(String, SortOrder)] {
        &self.fields
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// The index name: the explicit one, or `idx_<collection>_<fields>`.
    pub fn index_name(&self, collection: &str) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => {
                let fields: Vec<String> = self
                    .fields
                    .iter()
                    .map(|(field, _)| field.replace(FIELD_SEPARATOR, "_"))
                    .collect();
                format!("idx_{}_{}", collection, fields.join("_"))
            }
        }
    }
}

/// An index as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    /// The index name.
    pub name: String,
    /// The engine's definition text, when the engine reports one.
    pub definition: Option<String>,
}
