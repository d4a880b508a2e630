//! SQLite adapter for docsql.
//!
//! Stores each collection as a table with an `INTEGER` row id and the
//! document as JSON text, queried through SQLite's JSON1 functions.

mod adapter;
mod config;
mod convert;
mod error;

pub use adapter::*;
pub use config::*;
pub use error::*;
