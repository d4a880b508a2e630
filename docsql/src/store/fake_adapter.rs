use crate::collection::Document;
use crate::common::Value;
use crate::errors::{DocResult, DocSqlError, ErrorKind};
use crate::sql::Dialect;
use crate::store::DocumentStoreAdapter;
use crate::transaction::{Session, SessionState};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Records every call instead of talking to an engine.
pub(crate) struct FakeAdapter {
    dialect: Dialect,
    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) rows: Mutex<Vec<Document>>,
    pub(crate) fail_commit: bool,
    pub(crate) fail_ping: bool,
}

impl FakeAdapter {
    pub(crate) fn new(dialect: Dialect) -> Self {
        FakeAdapter {
            dialect,
            calls: Mutex::new(Vec::new()),
            rows: Mutex::new(Vec::new()),
            fail_commit: false,
            fail_ping: false,
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl DocumentStoreAdapter for FakeAdapter {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn query(&self, sql: &str, _params: &[Value], _session: Option<&Session>) -> DocResult<Vec<Document>> {
        self.record(format!("query {}", sql));
        if self.fail_ping && sql == "SELECT 1" {
            return Err(DocSqlError::new("engine unreachable", ErrorKind::ConnectionFailed));
        }
        Ok(self.rows.lock().clone())
    }

    async fn execute(&self, sql: &str, _params: &[Value], _session: Option<&Session>) -> DocResult<u64> {
        self.record(format!("execute {}", sql));
        Ok(1)
    }

    async fn start_session(&self) -> DocResult<Session> {
        self.record("begin".to_string());
        Ok(Session::new(Box::new(())))
    }

    async fn commit(&self, session: &Session) -> DocResult<()> {
        session.ensure_active()?;
        self.record("commit".to_string());
        if self.fail_commit {
            return Err(DocSqlError::new("serialization failure", ErrorKind::TransactionFailed));
        }
        session.set_state(SessionState::Committed);
        Ok(())
    }

    async fn rollback(&self, session: &Session) -> DocResult<()> {
        session.ensure_active()?;
        self.record("rollback".to_string());
        session.set_state(SessionState::RolledBack);
        Ok(())
    }

    async fn release(&self, session: &Session) -> DocResult<()> {
        if session.take_connection().await.is_some() {
            self.record("release".to_string());
        }
        session.set_state(SessionState::Released);
        Ok(())
    }

    async fn close(&self) -> DocResult<()> {
        self.record("close".to_string());
        Ok(())
    }
}
