use crate::errors::{DocResult, DocSqlError, ErrorKind};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use uuid::Uuid;

/// The adapter-specific connection a [Session] owns.
///
/// Adapters store their own connection type (a pooled transaction, a locked
/// embedded connection) and downcast it back with [downcast_connection].
pub type SessionConnection = Box<dyn Any + Send>;

/// The lifecycle state of a [Session].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The transaction is open and accepts statements.
    Active,
    /// The transaction was committed.
    Committed,
    /// The transaction was rolled back.
    RolledBack,
    /// The connection went back to the pool.
    Released,
}

/// An ownership handle over one reserved connection wrapping an active
/// transaction.
///
/// A session is created by
/// [DocumentStoreAdapter::start_session](crate::store::DocumentStoreAdapter::start_session)
/// and is exclusively owned by one transactional unit of work. Clones share
/// the same connection, so passing a clone into an `async` block is cheap.
/// Statements issued through one session run in issue order.
///
/// Dropping the last clone of a session that was never released rolls the
/// transaction back and returns the connection to the pool; this is what
/// happens when a transactional future is cancelled.
///
/// # Usage
/// ```ignore
/// let session = adapter.start_session().await?;
/// adapter.execute("INSERT ...", &params, Some(&session)).await?;
/// adapter.commit(&session).await?;
/// adapter.release(&session).await?;
/// ```
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Wraps a freshly begun transaction's connection.
    pub fn new(connection: SessionConnection) -> Self {
        Session {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4().to_string(),
                state: Mutex::new(SessionState::Active),
                savepoints: Mutex::new(Vec::new()),
                connection: tokio::sync::Mutex::new(Some(connection)),
            }),
        }
    }

    /// Gets the session ID.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.lock()
    }

    /// Checks if the session's transaction still accepts statements.
    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// Fails with [ErrorKind::SessionClosed] unless the session is active.
    pub fn ensure_active(&self) -> DocResult<()> {
        let state = self.state();
        if state != SessionState::Active {
            log::error!("Session {} is not active ({:?})", self.id(), state);
            return Err(DocSqlError::new(
                &format!("Session {} is not active ({:?})", self.id(), state),
                ErrorKind::SessionClosed,
            ));
        }
        Ok(())
    }

    /// Records a lifecycle transition. A released session stays released.
    pub fn set_state(&self, state: SessionState) {
        let mut current = self.inner.state.lock();
        if *current != SessionState::Released {
            *current = state;
        }
    }

    /// Locks the session's connection slot.
    ///
    /// The slot is empty once the connection went back to the pool.
    pub async fn connection(&self) -> tokio::sync::MutexGuard<'_, Option<SessionConnection>> {
        self.inner.connection.lock().await
    }

    /// Takes the connection out of the session, leaving the slot empty.
    pub async fn take_connection(&self) -> Option<SessionConnection> {
        self.inner.connection.lock().await.take()
    }

    /// Records a created savepoint.
    pub fn push_savepoint(&self, name: &str) {
        self.inner.savepoints.lock().push(name.to_string());
    }

    /// Checks that `name` is a savepoint of this session.
    pub fn ensure_savepoint(&self, name: &str) -> DocResult<()> {
        if self.inner.savepoints.lock().iter().any(|it| it == name) {
            Ok(())
        } else {
            log::error!("Savepoint '{}' does not exist in session {}", name, self.id());
            Err(DocSqlError::new(
                &format!("Savepoint '{}' does not exist", name),
                ErrorKind::InvalidOperation,
            ))
        }
    }

    /// Forgets a released savepoint and every savepoint nested inside it.
    pub fn remove_savepoint(&self, name: &str) {
        let mut savepoints = self.inner.savepoints.lock();
        if let Some(position) = savepoints.iter().position(|it| it == name) {
            savepoints.truncate(position);
        }
    }

    /// Forgets the savepoints nested inside `name`, keeping `name` itself.
    pub fn rewind_to_savepoint(&self, name: &str) {
        let mut savepoints = self.inner.savepoints.lock();
        if let Some(position) = savepoints.iter().position(|it| it == name) {
            savepoints.truncate(position + 1);
        }
    }

    /// The open savepoints, outermost first.
    pub fn savepoints(&self) -> Vec<String> {
        self.inner.savepoints.lock().clone()
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish()
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

struct SessionInner {
    id: String,
    state: Mutex<SessionState>,
    savepoints: Mutex<Vec<String>>,
    connection: tokio::sync::Mutex<Option<SessionConnection>>,
}

/// Downcasts a session's connection slot to the adapter's connection type.
///
/// # Errors
///
/// Returns [ErrorKind::SessionClosed] when the connection was already
/// released and [ErrorKind::InternalError] when the session belongs to a
/// different adapter.
pub fn downcast_connection<T: 'static>(slot: &mut Option<SessionConnection>) -> DocResult<&mut T> {
    match slot {
        None => {
            log::error!("Session connection was already released");
            Err(DocSqlError::new(
                "Session connection was already released",
                ErrorKind::SessionClosed,
            ))
        }
        Some(connection) => match connection.downcast_mut::<T>() {
            Some(connection) => Ok(connection),
            None => {
                log::error!("Session was started by a different adapter");
                Err(DocSqlError::new(
                    "Session was started by a different adapter",
                    ErrorKind::InternalError,
                ))
            }
        },
    }
}
