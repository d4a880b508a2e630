//! Per-collection document validation.
//!
//! A validator runs before every insert and before every updated document is
//! written back. Validators are registered on a [DocSql](crate::docsql::DocSql)
//! instance, keyed by collection name, and are not persisted.
//!
//! Any `Fn(&Document) -> DocResult<()>` closure is a validator, which is how a
//! caller plugs in an external JSON-schema library:
//!
//! ```rust,ignore
//! db.create_collection("users", Some(Arc::new(|doc: &Document| {
//!     if doc.contains_key("email") {
//!         Ok(())
//!     } else {
//!         Err(DocSqlError::new("email is required", ErrorKind::ValidationError))
//!     }
//! })))
//! .await?;
//! ```

use crate::collection::Document;
use crate::errors::{DocResult, DocSqlError, ErrorKind};

/// Accepts or rejects a document before it is written.
pub trait DocumentValidator: Send + Sync {
    /// Returns an error to reject the document.
    fn validate(&self, document: &Document) -> DocResult<()>;
}

impl<F> DocumentValidator for F
where
    F: Fn(&Document) -> DocResult<()> + Send + Sync,
{
    fn validate(&self, document: &Document) -> DocResult<()> {
        self(document)
    }
}

/// Rejects documents missing any of the listed fields (dotted paths allowed).
pub struct RequiredFields {
    fields: Vec<String>,
}

impl RequiredFields {
    pub fn new(fields: &[&str]) -> Self {
        RequiredFields {
            fields: fields.iter().map(|it| it.to_string()).collect(),
        }
    }
}

impl DocumentValidator for RequiredFields {
    fn validate(&self, document: &Document) -> DocResult<()> {
        for field in &self.fields {
            if !document.contains_field(field) {
                return Err(DocSqlError::new(
                    &format!("Required field '{}' is missing", field),
                    ErrorKind::ValidationError,
                ));
            }
        }
        Ok(())
    }
}

/// Runs `validator`, normalizing any rejection into a
/// [ErrorKind::ValidationError] that names the collection.
pub(crate) fn run_validator(
    collection: &str,
    validator: &dyn DocumentValidator,
    document: &Document,
) -> DocResult<()> {
    match validator.validate(document) {
        Ok(()) => Ok(()),
        Err(err) => {
            log::error!("Document rejected by validator of '{}': {}", collection, err);
            if err.kind() == &ErrorKind::ValidationError {
                Err(err)
            } else {
                Err(DocSqlError::new_with_cause(
                    &format!("Document rejected by validator of '{}'", collection),
                    ErrorKind::ValidationError,
                    err,
                ))
            }
        }
    }
}
