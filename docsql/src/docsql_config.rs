//! Configuration management for a [DocSql](crate::docsql::DocSql) client.

use crate::common::OperatorPolicy;
use crate::errors::{DocResult, DocSqlError, ErrorKind};
use crate::sql::Dialect;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Public interface for client configuration.
///
/// Settings can be changed until the client is opened; afterwards they are
/// frozen and setters fail with [ErrorKind::InvalidConfiguration].
///
/// # Examples
///
/// ```rust,ignore
/// use docsql::DocSql;
///
/// let db = DocSql::builder()
///     .adapter(adapter)
///     .dialect("postgres")
///     .strict_operators()
///     .open()
///     .await?;
/// ```
#[derive(Clone)]
pub struct DocSqlConfig {
    /// The pointer to implementation. Uses Arc for cheap cloning and thread safety.
    inner: Arc<DocSqlConfigInner>,
}

impl Default for DocSqlConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DocSqlConfig {
    /// Creates a new configuration instance with default values: the
    /// adapter's dialect, lenient operators, collections created on first
    /// insert and no default find limit.
    pub fn new() -> Self {
        DocSqlConfig {
            inner: Arc::new(DocSqlConfigInner::new()),
        }
    }

    /// The explicitly configured dialect, if any.
    pub fn dialect(&self) -> Option<Dialect> {
        self.inner.dialect()
    }

    /// Selects the dialect by name.
    ///
    /// # Errors
    ///
    /// Returns [ErrorKind::UnsupportedDialect] for unknown names.
    pub fn set_dialect(&self, name: &str) -> DocResult<()> {
        self.inner.set_dialect(name)
    }

    pub fn operator_policy(&self) -> OperatorPolicy {
        self.inner.operator_policy()
    }

    pub fn set_operator_policy(&self, policy: OperatorPolicy) -> DocResult<()> {
        self.inner.set_operator_policy(policy)
    }

    /// Whether the first insert into a missing collection creates its table.
    pub fn auto_create_collections(&self) -> bool {
        self.inner.auto_create_collections()
    }

    pub fn set_auto_create_collections(&self, enabled: bool) -> DocResult<()> {
        self.inner.set_auto_create_collections(enabled)
    }

    /// The limit applied to finds that do not set one.
    pub fn default_find_limit(&self) -> Option<u64> {
        self.inner.default_find_limit()
    }

    /// Sets the default find limit.
    ///
    /// # Errors
    ///
    /// Returns [ErrorKind::InvalidConfiguration] for a zero limit.
    pub fn set_default_find_limit(&self, limit: u64) -> DocResult<()> {
        self.inner.set_default_find_limit(limit)
    }

    pub fn is_configured(&self) -> bool {
        self.inner.configured.load(Ordering::Relaxed)
    }

    /// Checks the settings against the adapter's dialect and freezes them.
    pub(crate) fn initialize(&self, adapter_dialect: Dialect) -> DocResult<()> {
        self.inner.initialize(adapter_dialect)
    }
}

/// Internal implementation of the client configuration.
struct DocSqlConfigInner {
    /// Set once the client is opened
    configured: AtomicBool,
    dialect: RwLock<Option<Dialect>>,
    operator_policy: RwLock<OperatorPolicy>,
    auto_create_collections: AtomicBool,
    /// Zero means no default limit
    default_find_limit: AtomicU64,
}

impl DocSqlConfigInner {
    fn new() -> Self {
        DocSqlConfigInner {
            configured: AtomicBool::from(false),
            dialect: RwLock::new(None),
            operator_policy: RwLock::new(OperatorPolicy::Lenient),
            auto_create_collections: AtomicBool::from(true),
            default_find_limit: AtomicU64::from(0),
        }
    }

    fn check_not_configured(&self, setting: &str) -> DocResult<()> {
        if self.configured.load(Ordering::Relaxed) {
            log::error!("{} cannot be changed after the client is opened", setting);
            return Err(DocSqlError::new(
                &format!("{} cannot be changed after the client is opened", setting),
                ErrorKind::InvalidConfiguration,
            ));
        }
        Ok(())
    }

    fn dialect(&self) -> Option<Dialect> {
        *self.dialect.read()
    }

    fn set_dialect(&self, name: &str) -> DocResult<()> {
        self.check_not_configured("Dialect")?;
        let dialect = Dialect::parse(name)?;
        *self.dialect.write() = Some(dialect);
        Ok(())
    }

    fn operator_policy(&self) -> OperatorPolicy {
        *self.operator_policy.read()
    }

    fn set_operator_policy(&self, policy: OperatorPolicy) -> DocResult<()> {
        self.check_not_configured("Operator policy")?;
        *self.operator_policy.write() = policy;
        Ok(())
    }

    fn auto_create_collections(&self) -> bool {
        self.auto_create_collections.load(Ordering::Relaxed)
    }

    fn set_auto_create_collections(&self, enabled: bool) -> DocResult<()> {
        self.check_not_configured("Auto-create collections")?;
        self.auto_create_collections.store(enabled, Ordering::Relaxed);
        Ok(())
    }

    fn default_find_limit(&self) -> Option<u64> {
        match self.default_find_limit.load(Ordering::Relaxed) {
            0 => None,
            limit => Some(limit),
        }
    }

    fn set_default_find_limit(&self, limit: u64) -> DocResult<()> {
        self.check_not_configured("Default find limit")?;
        if limit == 0 {
            log::error!("Default find limit must be positive");
            return Err(DocSqlError::new(
                "Default find limit must be positive",
                ErrorKind::InvalidConfiguration,
            ));
        }
        self.default_find_limit.store(limit, Ordering::Relaxed);
        Ok(())
    }

    fn initialize(&self, adapter_dialect: Dialect) -> DocResult<()> {
        if let Some(configured) = self.dialect() {
            if configured != adapter_dialect {
                log::error!(
                    "Configured dialect {} does not match the adapter's dialect {}",
                    configured,
                    adapter_dialect
                );
                return Err(DocSqlError::new(
                    &format!(
                        "Configured dialect {} does not match the adapter's dialect {}",
                        configured, adapter_dialect
                    ),
                    ErrorKind::InvalidConfiguration,
                ));
            }
        } else {
            *self.dialect.write() = Some(adapter_dialect);
        }

        self.configured.store(true, Ordering::Relaxed);
        Ok(())
    }
}
