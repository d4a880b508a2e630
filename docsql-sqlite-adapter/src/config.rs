use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub(crate) const IN_MEMORY_PATH: &str = ":memory:";

/// The SQLite journal mode applied when the connection opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMode {
    Delete,
    Wal,
    Memory,
}

impl JournalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Wal => "WAL",
            JournalMode::Memory => "MEMORY",
        }
    }
}

/// SQLite adapter configuration.
///
/// A cloneable configuration holder using the PIMPL pattern with
/// `Arc<SqliteConfigInner>`. Configure it before passing it to
/// [SqliteAdapter::open](crate::SqliteAdapter::open); later changes do not
/// affect an open adapter.
///
/// # Examples
///
/// ```rust,ignore
/// let config = SqliteConfig::new()
///     .db_path("/var/lib/app/documents.db")
///     .journal_mode(JournalMode::Wal)
///     .busy_timeout(Duration::from_secs(5));
/// let adapter = SqliteAdapter::open(config)?;
/// ```
#[derive(Clone)]
pub struct SqliteConfig {
    inner: Arc<SqliteConfigInner>,
}

impl SqliteConfig {
    /// An in-memory database with a 5 second busy timeout, the default
    /// journal mode, and foreign keys enabled.
    pub fn new() -> SqliteConfig {
        SqliteConfig {
            inner: Arc::new(SqliteConfigInner::new()),
        }
    }

    pub fn in_memory() -> SqliteConfig {
        SqliteConfig::new()
    }

    pub fn db_path(self, path: &str) -> SqliteConfig {
        *self.inner.db_path.write() = path.to_string();
        self
    }

    pub fn journal_mode(self, journal_mode: JournalMode) -> SqliteConfig {
        *self.inner.journal_mode.write() = Some(journal_mode);
        self
    }

    pub fn busy_timeout(self, timeout: Duration) -> SqliteConfig {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.inner.busy_timeout_ms.store(millis, Ordering::Relaxed);
        self
    }

    pub fn statement_cache_capacity(self, capacity: usize) -> SqliteConfig {
        self.inner
            .statement_cache_capacity
            .store(capacity, Ordering::Relaxed);
        self
    }

    pub fn foreign_keys(self, enabled: bool) -> SqliteConfig {
        self.inner.foreign_keys.store(enabled, Ordering::Relaxed);
        self
    }

    pub fn path(&self) -> String {
        self.inner.db_path.read().clone()
    }

    pub fn is_in_memory(&self) -> bool {
        let path = self.inner.db_path.read();
        path.is_empty() || path.as_str() == IN_MEMORY_PATH
    }

    pub fn journal(&self) -> Option<JournalMode> {
        *self.inner.journal_mode.read()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.inner.busy_timeout_ms.load(Ordering::Relaxed))
    }

    pub fn cache_capacity(&self) -> usize {
        self.inner.statement_cache_capacity.load(Ordering::Relaxed)
    }

    pub fn foreign_keys_enabled(&self) -> bool {
        self.inner.foreign_keys.load(Ordering::Relaxed)
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        SqliteConfig::new()
    }
}

struct SqliteConfigInner {
    db_path: RwLock<String>,
    /// `None` keeps SQLite's default
    journal_mode: RwLock<Option<JournalMode>>,
    busy_timeout_ms: AtomicU64,
    statement_cache_capacity: AtomicUsize,
    foreign_keys: AtomicBool,
}

impl SqliteConfigInner {
    fn new() -> Self {
        SqliteConfigInner {
            db_path: RwLock::new(IN_MEMORY_PATH.to_string()),
            journal_mode: RwLock::new(None),
            busy_timeout_ms: AtomicU64::new(5_000),
            statement_cache_capacity: AtomicUsize::new(64),
            foreign_keys: AtomicBool::new(true),
        }
    }
}
