use crate::config::SqliteConfig;
use crate::convert::{collect_rows, to_sql_values};
use crate::error::{SqliteAdapterError, SqliteAdapterResult};
use async_trait::async_trait;
use docsql::common::Value;
use docsql::errors::DocResult;
use docsql::store::DocumentStoreAdapter;
use docsql::transaction::{downcast_connection, Session, SessionState};
use docsql::{Dialect, Document};
use rusqlite::{Connection, OpenFlags};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// An embedded [DocumentStoreAdapter] over one SQLite connection.
///
/// SQLite allows a single writer, so the adapter owns exactly one
/// connection behind an async mutex. A [Session] holds that mutex from
/// `start_session` until `release`; statements issued without the session
/// meanwhile wait for it. Issuing a session-less statement from inside a
/// transaction on the same adapter therefore never completes.
///
/// Statements run inline on the calling task; no thread is spawned.
///
/// # Examples
///
/// ```rust,ignore
/// use docsql::DocSql;
/// use docsql_sqlite_adapter::SqliteAdapter;
///
/// let db = DocSql::builder()
///     .adapter(Arc::new(SqliteAdapter::in_memory()?))
///     .open()
///     .await?;
/// ```
#[derive(Clone)]
pub struct SqliteAdapter {
    inner: Arc<SqliteAdapterInner>,
}

impl SqliteAdapter {
    /// Opens the database described by `config` and applies its pragmas.
    pub fn open(config: SqliteConfig) -> DocResult<SqliteAdapter> {
        let connection = connect(&config).map_err(|err| {
            log::error!("Failed to open SQLite database '{}': {}", config.path(), err);
            err
        })?;

        log::debug!("Opened SQLite database '{}'", config.path());
        Ok(SqliteAdapter {
            inner: Arc::new(SqliteAdapterInner {
                connection: Arc::new(Mutex::new(Some(connection))),
                config,
            }),
        })
    }

    /// Opens a private in-memory database.
    pub fn in_memory() -> DocResult<SqliteAdapter> {
        SqliteAdapter::open(SqliteConfig::in_memory())
    }

    pub fn config(&self) -> SqliteConfig {
        self.inner.config.clone()
    }
}

fn connect(config: &SqliteConfig) -> SqliteAdapterResult<Connection> {
    let connection = if config.is_in_memory() {
        Connection::open_in_memory()
    } else {
        Connection::open_with_flags(
            config.path(),
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    }
    .map_err(SqliteAdapterError::Open)?;

    connection
        .busy_timeout(config.timeout())
        .map_err(SqliteAdapterError::Open)?;
    connection.set_prepared_statement_cache_capacity(config.cache_capacity());
    connection
        .pragma_update(None, "foreign_keys", config.foreign_keys_enabled())
        .map_err(SqliteAdapterError::Open)?;
    if let Some(journal_mode) = config.journal() {
        connection
            .pragma_update(None, "journal_mode", journal_mode.as_str())
            .map_err(SqliteAdapterError::Open)?;
    }
    Ok(connection)
}

struct SqliteAdapterInner {
    /// `None` once closed
    connection: Arc<Mutex<Option<Connection>>>,
    config: SqliteConfig,
}

/// The connection a [Session] owns: the adapter's locked connection with an
/// open transaction.
struct SqliteSession {
    guard: OwnedMutexGuard<Option<Connection>>,
    /// Set once the transaction was committed or rolled back
    finished: bool,
}

impl SqliteSession {
    fn connection(&self) -> SqliteAdapterResult<&Connection> {
        self.guard.as_ref().ok_or(SqliteAdapterError::Closed)
    }
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Some(connection) = self.guard.as_ref() {
            log::debug!("Rolling back an unreleased SQLite session");
            if let Err(err) = connection.execute_batch("ROLLBACK") {
                log::warn!("Rollback of an unreleased SQLite session failed: {}", err);
            }
        }
    }
}

fn run_query(connection: &Connection, sql: &str, params: &[Value]) -> SqliteAdapterResult<Vec<Document>> {
    let params = to_sql_values(params)?;
    let mut statement = connection.prepare_cached(sql)?;
    collect_rows(&mut statement, params)
}

fn run_execute(connection: &Connection, sql: &str, params: &[Value]) -> SqliteAdapterResult<u64> {
    let params = to_sql_values(params)?;
    let mut statement = connection.prepare_cached(sql)?;
    let affected = statement.execute(rusqlite::params_from_iter(params))?;
    Ok(affected as u64)
}

impl SqliteAdapterInner {
    /// Runs `work` on the session's connection, or on the shared
    /// connection when there is no session.
    async fn with_connection<T, F>(&self, session: Option<&Session>, work: F) -> DocResult<T>
    where
        F: FnOnce(&Connection) -> SqliteAdapterResult<T>,
    {
        match session {
            Some(session) => {
                session.ensure_active()?;
                let mut slot = session.connection().await;
                let sqlite_session = downcast_connection::<SqliteSession>(&mut slot)?;
                Ok(work(sqlite_session.connection()?)?)
            }
            None => {
                let guard = self.connection.lock().await;
                let connection = guard.as_ref().ok_or(SqliteAdapterError::Closed)?;
                Ok(work(connection)?)
            }
        }
    }

    /// Ends the session's transaction with `statement`.
    async fn finish(&self, session: &Session, statement: &str, state: SessionState) -> DocResult<()> {
        session.ensure_active()?;
        let mut slot = session.connection().await;
        let sqlite_session = downcast_connection::<SqliteSession>(&mut slot)?;
        sqlite_session
            .connection()?
            .execute_batch(statement)
            .map_err(|err| {
                log::error!("{} of session {} failed: {}", statement, session.id(), err);
                SqliteAdapterError::Statement(err)
            })?;
        sqlite_session.finished = true;
        session.set_state(state);
        Ok(())
    }
}

#[async_trait]
impl DocumentStoreAdapter for SqliteAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn query(&self, sql: &str, params: &[Value], session: Option<&Session>) -> DocResult<Vec<Document>> {
        log::debug!("SQLite query: {} {:?}", sql, params);
        self.inner
            .with_connection(session, |connection| run_query(connection, sql, params))
            .await
    }

    async fn execute(&self, sql: &str, params: &[Value], session: Option<&Session>) -> DocResult<u64> {
        log::debug!("SQLite execute: {} {:?}", sql, params);
        self.inner
            .with_connection(session, |connection| run_execute(connection, sql, params))
            .await
    }

    async fn start_session(&self) -> DocResult<Session> {
        let guard = self.inner.connection.clone().lock_owned().await;
        let connection = guard.as_ref().ok_or(SqliteAdapterError::Closed)?;
        connection
            .execute_batch("BEGIN")
            .map_err(SqliteAdapterError::Statement)?;

        let session = Session::new(Box::new(SqliteSession {
            guard,
            finished: false,
        }));
        log::debug!("Started SQLite session {}", session.id());
        Ok(session)
    }

    async fn commit(&self, session: &Session) -> DocResult<()> {
        self.inner.finish(session, "COMMIT", SessionState::Committed).await
    }

    async fn rollback(&self, session: &Session) -> DocResult<()> {
        self.inner
            .finish(session, "ROLLBACK", SessionState::RolledBack)
            .await
    }

    async fn release(&self, session: &Session) -> DocResult<()> {
        // dropping the session connection rolls back an open transaction
        // and unlocks the shared connection
        if let Some(connection) = session.take_connection().await {
            drop(connection);
            log::debug!("Released SQLite session {}", session.id());
        }
        session.set_state(SessionState::Released);
        Ok(())
    }

    async fn close(&self) -> DocResult<()> {
        let mut guard = self.inner.connection.lock().await;
        if let Some(connection) = guard.take() {
            connection.close().map_err(|(_, err)| {
                log::error!("Failed to close SQLite database: {}", err);
                SqliteAdapterError::Statement(err)
            })?;
        }
        Ok(())
    }
}
