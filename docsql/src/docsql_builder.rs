use crate::common::OperatorPolicy;
use crate::docsql::DocSql;
use crate::docsql_config::DocSqlConfig;
use crate::errors::{DocResult, DocSqlError, ErrorKind};
use crate::store::DocumentStoreAdapter;
use std::sync::Arc;

/// Builder for opening a [DocSql] client.
///
/// Configuration errors are captured as they happen and the first one is
/// returned by [DocSqlBuilder::open], so a chain never needs intermediate
/// `?`s.
///
/// # Examples
///
/// ```rust,ignore
/// use docsql::DocSql;
///
/// let db = DocSql::builder()
///     .adapter(Arc::new(SqliteAdapter::in_memory()?))
///     .dialect("sqlite")
///     .default_find_limit(500)
///     .open()
///     .await?;
/// ```
#[derive(Default)]
pub struct DocSqlBuilder {
    error: Option<DocSqlError>,
    adapter: Option<Arc<dyn DocumentStoreAdapter>>,
    config: DocSqlConfig,
}

impl DocSqlBuilder {
    pub fn new() -> Self {
        DocSqlBuilder {
            error: None,
            adapter: None,
            config: DocSqlConfig::new(),
        }
    }

    /// Sets the adapter every statement goes through. Required.
    pub fn adapter(mut self, adapter: Arc<dyn DocumentStoreAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Names the expected dialect (`mysql`, `postgres`, `sqlite`).
    ///
    /// An unknown name, or one that does not match the adapter, makes
    /// [DocSqlBuilder::open] fail.
    pub fn dialect(mut self, name: &str) -> Self {
        self.capture(|config| config.set_dialect(name));
        self
    }

    pub fn operator_policy(mut self, policy: OperatorPolicy) -> Self {
        self.capture(|config| config.set_operator_policy(policy));
        self
    }

    /// Rejects unknown operators, combinators and stages instead of
    /// skipping them.
    pub fn strict_operators(self) -> Self {
        self.operator_policy(OperatorPolicy::Strict)
    }

    pub fn auto_create_collections(mut self, enabled: bool) -> Self {
        self.capture(|config| config.set_auto_create_collections(enabled));
        self
    }

    pub fn default_find_limit(mut self, limit: u64) -> Self {
        self.capture(|config| config.set_default_find_limit(limit));
        self
    }

    fn capture<F>(&mut self, setter: F)
    where
        F: FnOnce(&DocSqlConfig) -> DocResult<()>,
    {
        if self.error.is_none() {
            if let Err(e) = setter(&self.config) {
                self.error = Some(e);
            }
        }
    }

    /// Validates the configuration against the adapter and opens the client.
    pub async fn open(self) -> DocResult<DocSql> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let adapter = match self.adapter {
            Some(adapter) => adapter,
            None => {
                log::error!("No adapter configured");
                return Err(DocSqlError::new(
                    "No adapter configured",
                    ErrorKind::InvalidConfiguration,
                ));
            }
        };

        self.config.initialize(adapter.dialect())?;
        log::debug!("Opened DocSql client with dialect {}", adapter.dialect());
        Ok(DocSql::new(adapter, self.config))
    }
}
