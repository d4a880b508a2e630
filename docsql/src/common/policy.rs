use crate::common::OPERATOR_PREFIX;
use crate::errors::{DocResult, DocSqlError, ErrorKind};

/// Decides what the compilers do with an operator, combinator or stage name
/// they do not recognize.
///
/// The default is [OperatorPolicy::Lenient]: unknown names are skipped and
/// logged at debug level, so a malformed filter never fails to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatorPolicy {
    /// Skip unknown names silently.
    #[default]
    Lenient,
    /// Reject unknown names with [ErrorKind::UnsupportedOperator].
    Strict,
}

impl OperatorPolicy {
    /// Applies the policy to an unrecognized name found in `context`.
    ///
    /// Returns `Ok(())` when the caller should skip the entry.
    pub fn unknown(&self, context: &str, name: &str) -> DocResult<()> {
        match self {
            OperatorPolicy::Lenient => {
                log::debug!("Skipping unsupported {} '{}'", context, name);
                Ok(())
            }
            OperatorPolicy::Strict => {
                log::error!("Unsupported {} '{}'", context, name);
                Err(DocSqlError::new(
                    &format!("Unsupported {} '{}'", context, name),
                    ErrorKind::UnsupportedOperator,
                ))
            }
        }
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, OperatorPolicy::Strict)
    }
}

/// Strips the optional `$` prefix from an operator, combinator or stage name.
pub fn operator_name(key: &str) -> &str {
    key.strip_prefix(OPERATOR_PREFIX).unwrap_or(key)
}
