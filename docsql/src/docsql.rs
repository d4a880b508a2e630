use crate::collection::DocumentCollection;
use crate::docsql_builder::DocSqlBuilder;
use crate::docsql_config::DocSqlConfig;
use crate::errors::{DocResult, DocSqlError, ErrorKind};
use crate::sql::{ddl, Dialect};
use crate::store::DocumentStoreAdapter;
use crate::transaction::Session;
use crate::validator::DocumentValidator;
use dashmap::{DashMap, DashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The client: entry point for every document operation.
///
/// `DocSql` wraps one [DocumentStoreAdapter] and the client configuration.
/// It hands out [DocumentCollection]s, keeps the per-collection validators,
/// and runs transactional units of work.
///
/// `DocSql` uses the PIMPL pattern; clones share the same adapter, validator
/// registry and closed flag, so a clone can be moved into any task.
///
/// # Examples
///
/// ```rust,ignore
/// use docsql::{doc, DocSql};
/// use docsql::filter::all;
///
/// let db = DocSql::builder().adapter(adapter).open().await?;
///
/// let people = db.collection("people")?;
/// people.insert_one(doc!{ name: "Ada" }).await?;
/// let everyone = people.find(all(), None).await?;
///
/// db.close().await?;
/// ```
#[derive(Clone)]
pub struct DocSql {
    inner: Arc<DocSqlInner>,
}

impl DocSql {
    /// Creates a new [DocSqlBuilder].
    pub fn builder() -> DocSqlBuilder {
        DocSqlBuilder::new()
    }

    pub(crate) fn new(adapter: Arc<dyn DocumentStoreAdapter>, config: DocSqlConfig) -> Self {
        DocSql {
            inner: Arc::new(DocSqlInner {
                adapter,
                config,
                validators: DashMap::new(),
                known_collections: DashSet::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Gets a collection handle. The table is created by the first insert.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is closed or the name is not a valid
    /// table name.
    pub fn collection(&self, name: &str) -> DocResult<DocumentCollection> {
        self.check_opened()?;
        ddl::validate_name("Collection", name)?;
        Ok(DocumentCollection::new(name, self.clone()))
    }

    /// Creates the collection's table now and registers its validator.
    pub async fn create_collection(
        &self,
        name: &str,
        validator: Option<Arc<dyn DocumentValidator>>,
    ) -> DocResult<DocumentCollection> {
        self.check_opened()?;
        self.inner.adapter.create_table(name).await?;
        self.inner.known_collections.insert(name.to_string());
        if let Some(validator) = validator {
            self.inner.validators.insert(name.to_string(), validator);
        }
        Ok(DocumentCollection::new(name, self.clone()))
    }

    /// Drops the collection's table, its documents and its validator.
    pub async fn drop_collection(&self, name: &str) -> DocResult<()> {
        self.check_opened()?;
        self.inner.adapter.drop_table(name).await?;
        self.inner.known_collections.remove(name);
        self.inner.validators.remove(name);
        Ok(())
    }

    pub async fn list_collections(&self) -> DocResult<Vec<String>> {
        self.check_opened()?;
        self.inner.adapter.list_tables().await
    }

    pub async fn has_collection(&self, name: &str) -> DocResult<bool> {
        self.check_opened()?;
        self.inner.adapter.table_exists(name, None).await
    }

    /// Registers or replaces the validator of a collection.
    pub fn set_validator(&self, collection: &str, validator: Arc<dyn DocumentValidator>) {
        self.inner.validators.insert(collection.to_string(), validator);
    }

    /// Removes a collection's validator. Returns whether one was registered.
    pub fn remove_validator(&self, collection: &str) -> bool {
        self.inner.validators.remove(collection).is_some()
    }

    /// Begins a transaction on a dedicated connection.
    ///
    /// The caller owns the session and must commit or roll it back and then
    /// release it; [DocSql::with_transaction] does all of that.
    pub async fn start_session(&self) -> DocResult<Session> {
        self.check_opened()?;
        self.inner.adapter.start_session().await
    }

    pub async fn commit(&self, session: &Session) -> DocResult<()> {
        self.inner.adapter.commit(session).await
    }

    pub async fn rollback(&self, session: &Session) -> DocResult<()> {
        self.inner.adapter.rollback(session).await
    }

    pub async fn release(&self, session: &Session) -> DocResult<()> {
        self.inner.adapter.release(session).await
    }

    /// Runs `work` inside a transaction.
    ///
    /// The transaction commits when `work` succeeds and rolls back when it
    /// fails. The session is released on every path, including after a
    /// failed commit, and the original failure is returned.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let accounts = db.collection("accounts")?;
    /// db.with_transaction(|session| {
    ///     let accounts = accounts.clone();
    ///     async move {
    ///         accounts.update_one_in(&session, doc!{ id: "a" }, doc!{ inc: { balance: (-10) } }).await?;
    ///         accounts.update_one_in(&session, doc!{ id: "b" }, doc!{ inc: { balance: 10 } }).await?;
    ///         Ok(())
    ///     }
    /// })
    /// .await?;
    /// ```
    pub async fn with_transaction<F, Fut, R>(&self, work: F) -> DocResult<R>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = DocResult<R>>,
    {
        let session = self.start_session().await?;
        let adapter = &self.inner.adapter;

        let outcome = match work(session.clone()).await {
            Ok(value) => match adapter.commit(&session).await {
                Ok(()) => Ok(value),
                Err(err) => {
                    log::error!("Commit of session {} failed: {}", session.id(), err);
                    if let Err(rollback_err) = adapter.rollback(&session).await {
                        log::warn!("Rollback after failed commit of session {} failed: {}", session.id(), rollback_err);
                    }
                    Err(err)
                }
            },
            Err(err) => {
                log::debug!("Rolling back session {}: {}", session.id(), err);
                if let Err(rollback_err) = adapter.rollback(&session).await {
                    log::warn!("Rollback of session {} failed: {}", session.id(), rollback_err);
                }
                Err(err)
            }
        };

        match adapter.release(&session).await {
            Ok(()) => outcome,
            Err(release_err) => {
                log::warn!("Release of session {} failed: {}", session.id(), release_err);
                // a work or commit failure takes precedence
                match outcome {
                    Ok(_) => Err(release_err),
                    Err(err) => Err(err),
                }
            }
        }
    }

    /// Checks the engine is reachable. Failures are logged, not raised.
    pub async fn ping(&self) -> bool {
        if self.is_closed() {
            return false;
        }
        match self.inner.adapter.ping().await {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Ping failed: {}", err);
                false
            }
        }
    }

    /// Closes the client and its adapter. Closing twice is a no-op.
    pub async fn close(&self) -> DocResult<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.inner.validators.clear();
        self.inner.known_collections.clear();
        self.inner.adapter.close().await
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> DocSqlConfig {
        self.inner.config.clone()
    }

    /// The adapter's dialect.
    pub fn dialect(&self) -> Dialect {
        self.inner.adapter.dialect()
    }

    pub(crate) fn adapter(&self) -> &Arc<dyn DocumentStoreAdapter> {
        &self.inner.adapter
    }

    pub(crate) fn validator(&self, collection: &str) -> Option<Arc<dyn DocumentValidator>> {
        self.inner
            .validators
            .get(collection)
            .map(|entry| entry.value().clone())
    }

    pub(crate) fn check_opened(&self) -> DocResult<()> {
        if self.is_closed() {
            log::error!("DocSql client is closed");
            return Err(DocSqlError::new("DocSql client is closed", ErrorKind::ClientClosed));
        }
        Ok(())
    }

    /// Makes sure the collection's table exists before a write.
    ///
    /// Inside a session the table is created on the session's connection
    /// and not remembered, since a rollback may undo it.
    pub(crate) async fn ensure_collection(&self, name: &str, session: Option<&Session>) -> DocResult<()> {
        if self.inner.known_collections.contains(name) {
            return Ok(());
        }

        if !self.inner.config.auto_create_collections() {
            if self.inner.adapter.table_exists(name, session).await? {
                // a table seen inside a session may still be rolled back
                if session.is_none() {
                    self.inner.known_collections.insert(name.to_string());
                }
                return Ok(());
            }
            log::error!("Collection '{}' does not exist", name);
            return Err(DocSqlError::new(
                &format!("Collection '{}' does not exist", name),
                ErrorKind::InvalidOperation,
            ));
        }

        match session {
            None => {
                self.inner.adapter.create_table(name).await?;
                self.inner.known_collections.insert(name.to_string());
            }
            Some(session) => {
                let sql = ddl::create_table(self.dialect(), name);
                self.inner.adapter.execute(&sql, &[], Some(session)).await?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for DocSql {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocSql")
            .field("dialect", &self.dialect())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Internal state shared by every clone of a [DocSql].
struct DocSqlInner {
    adapter: Arc<dyn DocumentStoreAdapter>,
    config: DocSqlConfig,
    validators: DashMap<String, Arc<dyn DocumentValidator>>,
    /// Collections whose table is known to exist
    known_collections: DashSet<String>,
    closed: AtomicBool,
}
