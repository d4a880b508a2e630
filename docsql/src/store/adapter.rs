use crate::collection::Document;
use crate::common::Value;
use crate::errors::{DocResult, DocSqlError, ErrorKind};
use crate::index::{IndexInfo, IndexSpec};
use crate::sql::{ddl, Dialect};
use crate::transaction::Session;
use async_trait::async_trait;

/// The driver-facing seam: executes compiled SQL against one relational
/// engine and manages transaction sessions.
///
/// Rows are returned as [Document]s keyed by column name. The document blob
/// column may come back either as a parsed [Value::Document] or as JSON text
/// in a [Value::String]; the façade accepts both.
///
/// Parameters are bound positionally, in slice order. `session`, when given,
/// scopes the statement to that session's connection and transaction;
/// otherwise the adapter runs it on any pooled connection in autocommit mode.
///
/// The DDL and savepoint methods have default implementations built on
/// [DocumentStoreAdapter::execute] and [DocumentStoreAdapter::query] with the
/// adapter's [Dialect]; adapters override them only when their engine needs
/// something else.
///
/// Implementations must be cheap to share behind an `Arc`.
#[async_trait]
pub trait DocumentStoreAdapter: Send + Sync {
    /// The SQL dialect this adapter speaks.
    fn dialect(&self) -> Dialect;

    /// Runs a statement that returns rows.
    async fn query(
        &self,
        sql: &str,
        params: &[Value],
        session: Option<&Session>,
    ) -> DocResult<Vec<Document>>;

    /// Runs a statement and returns the number of affected rows.
    async fn execute(&self, sql: &str, params: &[Value], session: Option<&Session>) -> DocResult<u64>;

    /// Checks out a connection and begins a transaction on it.
    async fn start_session(&self) -> DocResult<Session>;

    /// Commits the session's transaction.
    async fn commit(&self, session: &Session) -> DocResult<()>;

    /// Rolls the session's transaction back.
    async fn rollback(&self, session: &Session) -> DocResult<()>;

    /// Returns the session's connection to the pool, rolling back first if
    /// the transaction is still open. Releasing twice is a no-op.
    async fn release(&self, session: &Session) -> DocResult<()>;

    async fn create_savepoint(&self, session: &Session, name: &str) -> DocResult<()> {
        session.ensure_active()?;
        ddl::validate_name("Savepoint", name)?;
        self.execute(&ddl::create_savepoint(self.dialect(), name), &[], Some(session))
            .await?;
        session.push_savepoint(name);
        Ok(())
    }

    async fn release_savepoint(&self, session: &Session, name: &str) -> DocResult<()> {
        session.ensure_active()?;
        session.ensure_savepoint(name)?;
        self.execute(&ddl::release_savepoint(self.dialect(), name), &[], Some(session))
            .await?;
        session.remove_savepoint(name);
        Ok(())
    }

    async fn rollback_to_savepoint(&self, session: &Session, name: &str) -> DocResult<()> {
        session.ensure_active()?;
        session.ensure_savepoint(name)?;
        self.execute(&ddl::rollback_to_savepoint(self.dialect(), name), &[], Some(session))
            .await?;
        session.rewind_to_savepoint(name);
        Ok(())
    }

    /// Creates the collection table if it does not exist.
    async fn create_table(&self, name: &str) -> DocResult<()> {
        ddl::validate_name("Collection", name)?;
        self.execute(&ddl::create_table(self.dialect(), name), &[], None)
            .await
            .map(|_| ())
    }

    async fn drop_table(&self, name: &str) -> DocResult<()> {
        ddl::validate_name("Collection", name)?;
        self.execute(&ddl::drop_table(self.dialect(), name), &[], None)
            .await
            .map(|_| ())
    }

    async fn list_tables(&self) -> DocResult<Vec<String>> {
        self.list_tables_in(None).await
    }

    /// Lists tables on the session's connection, or on the pool without one.
    async fn list_tables_in(&self, session: Option<&Session>) -> DocResult<Vec<String>> {
        let rows = self
            .query(&ddl::list_tables(self.dialect()), &[], session)
            .await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("name").and_then(|name| name.as_str()).map(String::from))
            .collect())
    }

    /// Checks a table exists. Inside a session the check runs on the
    /// session's connection.
    async fn table_exists(&self, name: &str, session: Option<&Session>) -> DocResult<bool> {
        Ok(self
            .list_tables_in(session)
            .await?
            .iter()
            .any(|table| table == name))
    }

    async fn create_index(&self, collection: &str, spec: &IndexSpec) -> DocResult<()> {
        ddl::validate_name("Collection", collection)?;
        if spec.fields().is_empty() {
            log::error!("Index on '{}' has no fields", collection);
            return Err(DocSqlError::new(
                "An index needs at least one field",
                ErrorKind::InvalidOperation,
            ));
        }
        ddl::validate_name("Index", &spec.index_name(collection))?;
        self.execute(&ddl::create_index(self.dialect(), collection, spec), &[], None)
            .await
            .map(|_| ())
    }

    async fn drop_index(&self, collection: &str, name: &str) -> DocResult<()> {
        ddl::validate_name("Index", name)?;
        self.execute(&ddl::drop_index(self.dialect(), collection, name), &[], None)
            .await
            .map(|_| ())
    }

    async fn list_indexes(&self, collection: &str) -> DocResult<Vec<IndexInfo>> {
        let rows = self
            .query(
                &ddl::list_indexes(self.dialect()),
                &[Value::from(collection)],
                None,
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let name = row.get("name")?.as_str()?.to_string();
                let definition = row
                    .get("definition")
                    .and_then(|it| it.as_str())
                    .map(String::from);
                Some(IndexInfo { name, definition })
            })
            .collect())
    }

    /// Checks the engine answers a trivial statement.
    async fn ping(&self) -> DocResult<()> {
        self.query("SELECT 1", &[], None).await.map(|_| ())
    }

    /// Closes the pool. Later calls fail.
    async fn close(&self) -> DocResult<()>;
}
