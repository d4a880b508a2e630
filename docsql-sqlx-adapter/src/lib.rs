//! PostgreSQL and MySQL adapters for docsql, built on sqlx connection pools.
//!
//! Both adapters keep one pool per client. A session checks a connection out
//! of the pool and holds it, with an open transaction, until it is released.

mod config;
mod convert;
mod error;
mod mysql;
mod pool;
mod postgres;
mod session;

pub use config::*;
pub use error::*;
pub use mysql::MySqlAdapter;
pub use postgres::PostgresAdapter;
