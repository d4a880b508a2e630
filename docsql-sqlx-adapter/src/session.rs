use docsql::errors::{DocResult, DocSqlError, ErrorKind};
use docsql::transaction::{downcast_connection, Session, SessionState};
use sqlx::{Database, Pool, Transaction};

use crate::error::SqlxAdapterError;

/// The connection a [Session] owns: a pooled connection with an open
/// transaction. The transaction is taken out when it commits or rolls back,
/// which also returns the connection to the pool.
pub(crate) struct SqlxSession<DB: Database> {
    transaction: Option<Transaction<'static, DB>>,
}

impl<DB: Database> SqlxSession<DB> {
    pub(crate) fn transaction_mut(&mut self) -> DocResult<&mut Transaction<'static, DB>> {
        match self.transaction.as_mut() {
            Some(transaction) => Ok(transaction),
            None => {
                log::error!("Session transaction already finished");
                Err(DocSqlError::new(
                    "Session transaction already finished",
                    ErrorKind::SessionClosed,
                ))
            }
        }
    }
}

/// Checks a connection out of `pool` and begins a transaction on it.
pub(crate) async fn begin<DB: Database>(pool: &Pool<DB>) -> DocResult<Session> {
    let transaction = pool.begin().await.map_err(|err| {
        log::error!("Failed to begin transaction: {}", err);
        SqlxAdapterError::Statement(err)
    })?;

    let session = Session::new(Box::new(SqlxSession {
        transaction: Some(transaction),
    }));
    log::debug!("Started session {}", session.id());
    Ok(session)
}

/// Commits or rolls back the session's transaction.
pub(crate) async fn finish<DB: Database>(session: &Session, commit: bool) -> DocResult<()> {
    session.ensure_active()?;
    let mut slot = session.connection().await;
    let sqlx_session = downcast_connection::<SqlxSession<DB>>(&mut slot)?;
    let transaction = match sqlx_session.transaction.take() {
        Some(transaction) => transaction,
        None => {
            log::error!("Session {} has no open transaction", session.id());
            return Err(DocSqlError::new(
                "Session has no open transaction",
                ErrorKind::SessionClosed,
            ));
        }
    };

    let (result, state) = if commit {
        (transaction.commit().await, SessionState::Committed)
    } else {
        (transaction.rollback().await, SessionState::RolledBack)
    };

    match result {
        Ok(()) => {
            session.set_state(state);
            Ok(())
        }
        Err(err) => {
            log::error!("Finishing session {} failed: {}", session.id(), err);
            Err(DocSqlError::from_driver(
                "Failed to finish transaction",
                ErrorKind::TransactionFailed,
                err,
            ))
        }
    }
}

/// Returns the session's connection to the pool, rolling back a
/// transaction that is still open. Releasing twice is a no-op.
pub(crate) async fn release<DB: Database>(session: &Session) -> DocResult<()> {
    if session.state() == SessionState::Released {
        return Ok(());
    }

    if let Some(connection) = session.take_connection().await {
        match connection.downcast::<SqlxSession<DB>>() {
            Ok(mut sqlx_session) => {
                if let Some(transaction) = sqlx_session.transaction.take() {
                    log::debug!("Rolling back open transaction of session {}", session.id());
                    if let Err(err) = transaction.rollback().await {
                        log::warn!("Rollback on release of session {} failed: {}", session.id(), err);
                    }
                }
            }
            Err(_) => {
                log::error!("Session {} was started by a different adapter", session.id());
                return Err(DocSqlError::new(
                    "Session was started by a different adapter",
                    ErrorKind::InternalError,
                ));
            }
        }
    }

    session.set_state(SessionState::Released);
    log::debug!("Released session {}", session.id());
    Ok(())
}
