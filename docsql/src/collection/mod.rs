//! Documents and collections.
//!
//! A [Document] is an insertion-ordered mapping of field names to
//! [Value](crate::common::Value)s, stored as one JSON blob per row. A
//! [DocumentCollection] exposes the document verbs over one table.

mod document;
mod document_collection;
mod find_options;
mod page;
mod write_result;

pub use document::*;
pub use document_collection::*;
pub use find_options::*;
pub use page::*;
pub use write_result::*;
