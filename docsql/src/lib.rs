//! # docsql - a document query layer over relational databases
//!
//! docsql stores schemaless documents as one JSON blob per table row and
//! translates a MongoDB-like filter, update and aggregation language into
//! dialect-specific SQL plus positional parameters at call time. Execution
//! is delegated to a relational engine behind a [DocumentStoreAdapter]:
//! PostgreSQL and MySQL through `docsql-sqlx-adapter`, SQLite through
//! `docsql-sqlite-adapter`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docsql::{doc, DocSql};
//! use docsql::filter::field;
//! use docsql_sqlite_adapter::SqliteAdapter;
//!
//! let db = DocSql::builder()
//!     .adapter(Arc::new(SqliteAdapter::in_memory()?))
//!     .open()
//!     .await?;
//!
//! let people = db.collection("people")?;
//! people.insert_many(vec![doc!{ name: "Ada", age: 36 }, doc!{ name: "Alan", age: 41 }]).await?;
//!
//! let older = people.find(field("age").gt(40), None).await?;
//! people.update_one(field("name").eq("Ada"), doc!{ inc: { age: 1 } }).await?;
//!
//! let by_age = people
//!     .aggregate(vec![doc!{ group: { _id: "$age", count: { sum: 1 } } }], None)
//!     .await?;
//! ```
//!
//! ## Module Organization
//!
//! - [`collection`] - Documents, collections and their result types
//! - [`common`] - The value model, sort order and operator policy
//! - [`errors`] - Error types and result definitions
//! - [`filter`] - Filter builders and the predicate compiler
//! - [`update`] - The update operator engine
//! - [`pipeline`] - The aggregation pipeline compiler
//! - [`sql`] - Dialects and DDL statements
//! - [`index`] - Expression index specifications
//! - [`store`] - The adapter trait
//! - [`transaction`] - Transaction sessions
//! - [`validator`] - Per-collection document validators

pub mod collection;
pub mod common;
pub mod docsql;
pub mod docsql_builder;
pub mod docsql_config;
pub mod errors;
pub mod filter;
pub mod index;
pub mod pipeline;
pub mod sql;
pub mod store;
pub mod transaction;
pub mod update;
pub mod validator;

pub use crate::collection::{Document, DocumentCollection};
pub use crate::common::{OperatorPolicy, SortOrder, Value};
pub use crate::docsql::DocSql;
pub use crate::docsql_builder::DocSqlBuilder;
pub use crate::docsql_config::DocSqlConfig;
pub use crate::errors::{DocResult, DocSqlError, ErrorCategory, ErrorKind};
pub use crate::sql::Dialect;
pub use crate::store::DocumentStoreAdapter;
pub use crate::transaction::Session;
pub use crate::validator::DocumentValidator;
