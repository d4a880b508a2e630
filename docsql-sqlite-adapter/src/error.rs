use docsql::errors::{DocSqlError, ErrorKind};
use thiserror::Error;

/// Driver-level failures of the SQLite adapter.
#[derive(Debug, Error)]
pub enum SqliteAdapterError {
    /// The database could not be opened or configured
    #[error("Failed to open SQLite database: {0}")]
    Open(#[source] rusqlite::Error),
    /// A statement failed
    #[error("SQLite statement failed: {0}")]
    Statement(#[from] rusqlite::Error),
    /// A parameter could not be bound
    #[error("Failed to encode parameter {index}: {reason}")]
    Encoding { index: usize, reason: String },
    #[error("SQLite adapter is closed")]
    Closed,
}

pub type SqliteAdapterResult<T> = Result<T, SqliteAdapterError>;

impl From<SqliteAdapterError> for DocSqlError {
    fn from(err: SqliteAdapterError) -> Self {
        match err {
            SqliteAdapterError::Open(_) => {
                DocSqlError::from_driver("SQLite connection failed", ErrorKind::ConnectionFailed, err)
            }
            SqliteAdapterError::Statement(_) => {
                DocSqlError::from_driver("SQLite query failed", ErrorKind::QueryFailed, err)
            }
            SqliteAdapterError::Encoding { .. } => {
                DocSqlError::new(&err.to_string(), ErrorKind::EncodingError)
            }
            SqliteAdapterError::Closed => DocSqlError::new(&err.to_string(), ErrorKind::ClientClosed),
        }
    }
}
