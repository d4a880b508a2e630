use backtrace::Backtrace;
use serde::{de, ser};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

/// Broad class of a failure.
///
/// Callers can branch on the category without inspecting driver messages,
/// regardless of which dialect produced the error.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ErrorCategory {
    /// The client was configured with an unsupported or incomplete setting.
    Configuration,
    /// The engine could not be reached.
    Connection,
    /// The engine rejected or failed a statement.
    Query,
    /// A document was rejected by a collection validator.
    Validation,
    /// The caller used the API in a way it does not support.
    Usage,
    /// A bug or an unexpected state inside docsql.
    Internal,
}

impl Display for ErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Connection => write!(f, "connection"),
            ErrorCategory::Query => write!(f, "query"),
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Usage => write!(f, "usage"),
            ErrorCategory::Internal => write!(f, "internal"),
        }
    }
}

/// Error kinds for docsql operations.
///
/// Every kind maps to exactly one [ErrorCategory] and to a stable machine
/// code returned by [ErrorKind::code].
///
/// # Examples
///
/// ```rust,ignore
/// use docsql::errors::{DocSqlError, ErrorKind, DocResult};
///
/// fn example() -> DocResult<()> {
///     Err(DocSqlError::new("dialect 'oracle' is not supported", ErrorKind::UnsupportedDialect))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Configuration Errors
    /// The configured dialect name is not one of the supported engines
    UnsupportedDialect,
    /// A configuration value is missing or out of range
    InvalidConfiguration,

    // Connection Errors
    /// The initial connection to the engine failed
    ConnectionFailed,
    /// A connection could not be checked out of the pool
    PoolExhausted,

    // Query Errors
    /// The engine failed to execute a statement
    QueryFailed,
    /// The engine failed to begin, commit or roll back a transaction
    TransactionFailed,
    /// A DDL statement failed
    SchemaError,

    // Validation Errors
    /// The collection validator rejected a document
    ValidationError,

    // Usage Errors
    /// A filter, update or pipeline used an operator that is not supported
    UnsupportedOperator,
    /// The operation is not valid in the current context
    InvalidOperation,
    /// Invalid collection, field or index name
    InvalidName,
    /// The session was already committed, rolled back or released
    SessionClosed,
    /// The client has been closed
    ClientClosed,

    // Encoding Errors
    /// A document could not be encoded to or decoded from its stored form
    EncodingError,

    // Extension Errors - lets adapter crates report their own failure classes
    /// Error from an adapter crate (e.g. "sqlite", "postgres")
    Extension(String),

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl ErrorKind {
    /// Returns the category this kind belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorKind::UnsupportedDialect | ErrorKind::InvalidConfiguration => {
                ErrorCategory::Configuration
            }
            ErrorKind::ConnectionFailed | ErrorKind::PoolExhausted => ErrorCategory::Connection,
            ErrorKind::QueryFailed | ErrorKind::TransactionFailed | ErrorKind::SchemaError => {
                ErrorCategory::Query
            }
            ErrorKind::ValidationError => ErrorCategory::Validation,
            ErrorKind::UnsupportedOperator
            | ErrorKind::InvalidOperation
            | ErrorKind::InvalidName
            | ErrorKind::SessionClosed
            | ErrorKind::ClientClosed
            | ErrorKind::EncodingError => ErrorCategory::Usage,
            ErrorKind::Extension(_) => ErrorCategory::Query,
            ErrorKind::InternalError => ErrorCategory::Internal,
        }
    }

    /// Returns the stable machine code of this kind.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::UnsupportedDialect => "UNSUPPORTED_DIALECT",
            ErrorKind::InvalidConfiguration => "INVALID_CONFIGURATION",
            ErrorKind::ConnectionFailed => "CONNECTION_FAILED",
            ErrorKind::PoolExhausted => "POOL_EXHAUSTED",
            ErrorKind::QueryFailed => "QUERY_FAILED",
            ErrorKind::TransactionFailed => "TRANSACTION_FAILED",
            ErrorKind::SchemaError => "SCHEMA_ERROR",
            ErrorKind::ValidationError => "VALIDATION_FAILED",
            ErrorKind::UnsupportedOperator => "UNSUPPORTED_OPERATOR",
            ErrorKind::InvalidOperation => "INVALID_OPERATION",
            ErrorKind::InvalidName => "INVALID_NAME",
            ErrorKind::SessionClosed => "SESSION_CLOSED",
            ErrorKind::ClientClosed => "CLIENT_CLOSED",
            ErrorKind::EncodingError => "ENCODING_ERROR",
            ErrorKind::Extension(_) => "EXTENSION_ERROR",
            ErrorKind::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::UnsupportedDialect => write!(f, "Unsupported dialect"),
            ErrorKind::InvalidConfiguration => write!(f, "Invalid configuration"),
            ErrorKind::ConnectionFailed => write!(f, "Connection failed"),
            ErrorKind::PoolExhausted => write!(f, "Pool exhausted"),
            ErrorKind::QueryFailed => write!(f, "Query failed"),
            ErrorKind::TransactionFailed => write!(f, "Transaction failed"),
            ErrorKind::SchemaError => write!(f, "Schema error"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::UnsupportedOperator => write!(f, "Unsupported operator"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::InvalidName => write!(f, "Invalid name"),
            ErrorKind::SessionClosed => write!(f, "Session closed"),
            ErrorKind::ClientClosed => write!(f, "Client closed"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::Extension(name) => write!(f, "{} error", name),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// The single error type surfaced by docsql.
///
/// `DocSqlError` carries a user-facing message, an [ErrorKind] (and through it
/// a category and machine code), an optional docsql cause, and optionally the
/// original driver error it wraps.
///
/// # Examples
///
/// ```rust,ignore
/// use docsql::errors::{DocSqlError, ErrorKind};
///
/// let cause = DocSqlError::new("socket closed", ErrorKind::ConnectionFailed);
/// let err = DocSqlError::new_with_cause("Failed to start session", ErrorKind::TransactionFailed, cause);
/// assert_eq!(err.code(), "TRANSACTION_FAILED");
/// ```
#[derive(Clone)]
pub struct DocSqlError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<DocSqlError>>,
    driver_error: Option<Arc<dyn Error + Send + Sync + 'static>>,
    backtrace: Arc<Backtrace>,
}

impl DocSqlError {
    /// Creates a new `DocSqlError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        DocSqlError {
            message: message.to_string(),
            error_kind,
            cause: None,
            driver_error: None,
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    /// Creates a new `DocSqlError` chained to a docsql cause.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: DocSqlError) -> Self {
        DocSqlError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            driver_error: None,
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    /// Wraps an error raised by a native driver.
    ///
    /// The driver error is retained and reachable through
    /// [std::error::Error::source] for diagnostics.
    pub fn from_driver<E>(message: &str, error_kind: ErrorKind, driver_error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        DocSqlError {
            message: format!("{}: {}", message, driver_error),
            error_kind,
            cause: None,
            driver_error: Some(Arc::new(driver_error)),
            backtrace: Arc::new(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn category(&self) -> ErrorCategory {
        self.error_kind.category()
    }

    pub fn code(&self) -> &'static str {
        self.error_kind.code()
    }

    pub fn cause(&self) -> Option<&DocSqlError> {
        self.cause.as_deref()
    }

    /// The original driver error, if this error wraps one.
    pub fn driver_error(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.driver_error.as_deref()
    }
}

impl Display for DocSqlError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for DocSqlError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match (&self.cause, &self.driver_error) {
            (Some(cause), _) => write!(f, "[{}] {}\nCaused by: {:?}", self.code(), self.message, cause),
            (None, Some(driver)) => write!(f, "[{}] {}\nDriver error: {:?}", self.code(), self.message, driver),
            (None, None) => write!(f, "[{}] {}\n{:?}", self.code(), self.message, self.backtrace),
        }
    }
}

impl Error for DocSqlError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        if let Some(cause) = &self.cause {
            return Some(cause.as_ref());
        }
        match &self.driver_error {
            Some(driver) => Some(driver.as_ref() as &(dyn Error + 'static)),
            None => None,
        }
    }
}

/// A result type alias for docsql operations.
pub type DocResult<T> = Result<T, DocSqlError>;

impl de::Error for DocSqlError {
    fn custom<T: Display>(msg: T) -> Self {
        DocSqlError::new(&msg.to_string(), ErrorKind::EncodingError)
    }
}

impl ser::Error for DocSqlError {
    fn custom<T: Display>(msg: T) -> Self {
        DocSqlError::new(&msg.to_string(), ErrorKind::EncodingError)
    }
}

impl From<serde_json::Error> for DocSqlError {
    fn from(err: serde_json::Error) -> Self {
        DocSqlError::from_driver("JSON encoding error", ErrorKind::EncodingError, err)
    }
}

impl From<std::io::Error> for DocSqlError {
    fn from(err: std::io::Error) -> Self {
        DocSqlError::from_driver("IO error", ErrorKind::ConnectionFailed, err)
    }
}

impl From<std::fmt::Error> for DocSqlError {
    fn from(err: std::fmt::Error) -> Self {
        DocSqlError::new(&format!("Formatting error: {}", err), ErrorKind::InternalError)
    }
}

impl From<String> for DocSqlError {
    fn from(msg: String) -> Self {
        DocSqlError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for DocSqlError {
    fn from(msg: &str) -> Self {
        DocSqlError::new(msg, ErrorKind::InternalError)
    }
}
