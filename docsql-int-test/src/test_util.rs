use async_trait::async_trait;
use docsql::collection::{Document, DocumentCollection};
use docsql::common::Value;
use docsql::doc;
use docsql::errors::{DocResult, DocSqlError, ErrorKind};
use docsql::store::DocumentStoreAdapter;
use docsql::transaction::Session;
use docsql::{DocSql, Dialect};
use docsql_sqlite_adapter::SqliteAdapter;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Runs a test against a fresh context, cleaning up whatever the outcome.
pub async fn run_test<B, BFut, T, TFut, A, AFut>(before: B, test: T, after: A)
where
    B: FnOnce() -> BFut,
    BFut: Future<Output = DocResult<TestContext>>,
    T: FnOnce(TestContext) -> TFut,
    TFut: Future<Output = DocResult<()>>,
    A: FnOnce(TestContext) -> AFut,
    AFut: Future<Output = DocResult<()>>,
{
    let ctx = match before().await {
        Ok(ctx) => ctx,
        Err(e) => panic!("Before run failed: {:?}", e),
    };

    let test_result = test(ctx.clone()).await;
    let after_result = after(ctx).await;

    if let Err(e) = test_result {
        panic!("Test failed: {:?}", e);
    }
    if let Err(e) = after_result {
        panic!("After run failed: {:?}", e);
    }
}

#[derive(Clone)]
pub struct TestContext {
    db: DocSql,
    adapter: Arc<RecordingAdapter>,
}

impl TestContext {
    pub fn new(db: DocSql, adapter: Arc<RecordingAdapter>) -> Self {
        Self { db, adapter }
    }

    pub fn db(&self) -> DocSql {
        self.db.clone()
    }

    pub fn adapter(&self) -> Arc<RecordingAdapter> {
        self.adapter.clone()
    }
}

pub async fn create_test_context() -> DocResult<TestContext> {
    let adapter = Arc::new(RecordingAdapter::new(Arc::new(SqliteAdapter::in_memory()?)));
    let db = DocSql::builder().adapter(adapter.clone()).open().await?;
    Ok(TestContext::new(db, adapter))
}

pub async fn create_strict_test_context() -> DocResult<TestContext> {
    let adapter = Arc::new(RecordingAdapter::new(Arc::new(SqliteAdapter::in_memory()?)));
    let db = DocSql::builder()
        .adapter(adapter.clone())
        .dialect("sqlite")
        .strict_operators()
        .open()
        .await?;
    Ok(TestContext::new(db, adapter))
}

pub async fn cleanup(ctx: TestContext) -> DocResult<()> {
    ctx.db().close().await
}

pub fn create_test_docs() -> Vec<Document> {
    vec![
        doc!{
            id: "p1",
            name: "Ada",
            age: 36,
            city: "London",
            active: true,
            tags: ["math", "engines"],
            address: { city: "London", zip: "N1" },
        },
        doc!{
            id: "p2",
            name: "Grace",
            age: 45,
            city: "New York",
            active: true,
            tags: ["navy", "compilers"],
            visits: 2,
        },
        doc!{
            id: "p3",
            name: "Linus",
            age: 28,
            city: "Helsinki",
            active: false,
            tags: ["kernels"],
        },
        doc!{
            id: "p4",
            name: "Barbara",
            age: 52,
            city: "London",
            active: false,
            tags: [],
        },
        doc!{
            id: "p5",
            name: "Edsger",
            age: 40,
            tags: ["graphs", "semaphores"],
        },
    ]
}

pub async fn insert_test_documents(collection: &DocumentCollection) -> DocResult<()> {
    collection.insert_many(create_test_docs()).await?;
    Ok(())
}

/// The `name` field of each document, in order.
pub fn names(documents: &[Document]) -> Vec<String> {
    documents
        .iter()
        .filter_map(|document| document.get("name").and_then(|name| name.as_str()).map(String::from))
        .collect()
}

/// Wraps an adapter, recording every statement and session call.
///
/// It can also fail the next commit, or run an extra statement right before
/// the next statement with a given prefix, to stage a concurrent writer.
pub struct RecordingAdapter {
    inner: Arc<dyn DocumentStoreAdapter>,
    statements: Mutex<Vec<String>>,
    releases: AtomicUsize,
    rollbacks: AtomicUsize,
    fail_next_commit: AtomicBool,
    interleaved: Mutex<Option<(String, String)>>,
}

impl RecordingAdapter {
    pub fn new(inner: Arc<dyn DocumentStoreAdapter>) -> Self {
        RecordingAdapter {
            inner,
            statements: Mutex::new(Vec::new()),
            releases: AtomicUsize::new(0),
            rollbacks: AtomicUsize::new(0),
            fail_next_commit: AtomicBool::new(false),
            interleaved: Mutex::new(None),
        }
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn rollback_count(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Runs `sql` without a session just before the next statement that
    /// starts with `prefix`.
    pub fn interleave_before(&self, prefix: &str, sql: &str) {
        *self.interleaved.lock() = Some((prefix.to_string(), sql.to_string()));
    }

    fn take_interleaved(&self, sql: &str) -> Option<String> {
        let mut interleaved = self.interleaved.lock();
        let matches = interleaved
            .as_ref()
            .map_or(false, |(prefix, _)| sql.starts_with(prefix.as_str()));
        if matches {
            interleaved.take().map(|(_, statement)| statement)
        } else {
            None
        }
    }
}

#[async_trait]
impl DocumentStoreAdapter for RecordingAdapter {
    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    async fn query(&self, sql: &str, params: &[Value], session: Option<&Session>) -> DocResult<Vec<Document>> {
        self.statements.lock().push(sql.to_string());
        self.inner.query(sql, params, session).await
    }

    async fn execute(&self, sql: &str, params: &[Value], session: Option<&Session>) -> DocResult<u64> {
        if let Some(statement) = self.take_interleaved(sql) {
            self.statements.lock().push(statement.clone());
            self.inner.execute(&statement, &[], None).await?;
        }
        self.statements.lock().push(sql.to_string());
        self.inner.execute(sql, params, session).await
    }

    async fn start_session(&self) -> DocResult<Session> {
        self.inner.start_session().await
    }

    async fn commit(&self, session: &Session) -> DocResult<()> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(DocSqlError::new(
                "Commit failed on purpose",
                ErrorKind::TransactionFailed,
            ));
        }
        self.inner.commit(session).await
    }

    async fn rollback(&self, session: &Session) -> DocResult<()> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.inner.rollback(session).await
    }

    async fn release(&self, session: &Session) -> DocResult<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.inner.release(session).await
    }

    async fn close(&self) -> DocResult<()> {
        self.inner.close().await
    }
}
