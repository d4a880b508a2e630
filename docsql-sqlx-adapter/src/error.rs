use docsql::errors::{DocSqlError, ErrorKind};
use thiserror::Error;

/// Driver-level failures of the pooled adapters.
#[derive(Debug, Error)]
pub enum SqlxAdapterError {
    /// The pool could not reach the server
    #[error("Failed to connect: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("Statement failed: {0}")]
    Statement(#[from] sqlx::Error),
    /// A result column has a type the adapter cannot map to a value
    #[error("Failed to decode column '{column}': {reason}")]
    Decode { column: String, reason: String },
}

pub type SqlxAdapterResult<T> = Result<T, SqlxAdapterError>;

impl From<SqlxAdapterError> for DocSqlError {
    fn from(err: SqlxAdapterError) -> Self {
        match &err {
            SqlxAdapterError::Connect(_) => {
                DocSqlError::from_driver("Connection failed", ErrorKind::ConnectionFailed, err)
            }
            SqlxAdapterError::Statement(source) => {
                let (message, kind) = match source {
                    sqlx::Error::PoolClosed => ("Connection pool is closed", ErrorKind::ClientClosed),
                    sqlx::Error::PoolTimedOut => {
                        ("Timed out waiting for a connection", ErrorKind::PoolExhausted)
                    }
                    sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                        ("Connection to the server was lost", ErrorKind::ConnectionFailed)
                    }
                    _ => ("Query failed", ErrorKind::QueryFailed),
                };
                DocSqlError::from_driver(message, kind, err)
            }
            SqlxAdapterError::Decode { .. } => {
                DocSqlError::new(&err.to_string(), ErrorKind::EncodingError)
            }
        }
    }
}
