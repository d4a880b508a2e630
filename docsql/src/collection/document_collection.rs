use crate::collection::{
    AggregateOptions, DeleteResult, Document, FindOptions, InsertResult, Page, PageOptions,
    UpdateResult,
};
use crate::common::{OperatorPolicy, SortOrder, Value, DOC_COLUMN, DOC_ID, ROW_ID_COLUMN};
use crate::docsql::DocSql;
use crate::errors::{DocResult, DocSqlError, ErrorKind};
use crate::filter::compile_with_policy;
use crate::index::{IndexInfo, IndexSpec};
use crate::pipeline::{self, select_documents};
use crate::sql::Dialect;
use crate::transaction::Session;
use crate::update::{apply_with_policy, has_operators};
use crate::validator::run_validator;
use itertools::Itertools;
use std::sync::Arc;
use uuid::Uuid;

/// A named group of documents stored in one relational table.
///
/// Every verb compiles its filter, update or pipeline into SQL and runs it
/// through the client's adapter. Each verb has an `_in` counterpart that
/// runs inside a [Session]'s transaction.
///
/// `DocumentCollection` is cheap to clone; clones address the same table.
///
/// # Examples
///
/// ```rust,ignore
/// use docsql::doc;
/// use docsql::filter::field;
///
/// let people = db.collection("people")?;
/// people.insert_one(doc!{ name: "Ada", age: 36 }).await?;
///
/// let adults = people.find(field("age").gte(18), None).await?;
/// people.update_many(field("age").lt(18), doc!{ set: { minor: true } }).await?;
/// ```
#[derive(Clone)]
pub struct DocumentCollection {
    inner: Arc<DocumentCollectionInner>,
}

impl DocumentCollection {
    pub(crate) fn new(name: &str, db: DocSql) -> Self {
        DocumentCollection {
            inner: Arc::new(DocumentCollectionInner {
                name: name.to_string(),
                db,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Inserts one document, assigning a UUID `id` when it has none.
    ///
    /// The first insert into a missing collection creates its table unless
    /// auto-creation is disabled.
    pub async fn insert_one(&self, document: Document) -> DocResult<InsertResult> {
        self.inner.insert(vec![document], None).await
    }

    pub async fn insert_one_in(&self, session: &Session, document: Document) -> DocResult<InsertResult> {
        session.ensure_active()?;
        self.inner.insert(vec![document], Some(session)).await
    }

    /// Inserts documents with one statement. Nothing is written when any
    /// document fails validation.
    pub async fn insert_many(&self, documents: Vec<Document>) -> DocResult<InsertResult> {
        self.inner.insert(documents, None).await
    }

    pub async fn insert_many_in(
        &self,
        session: &Session,
        documents: Vec<Document>,
    ) -> DocResult<InsertResult> {
        session.ensure_active()?;
        self.inner.insert(documents, Some(session)).await
    }

    /// Finds the documents matching `filter`.
    ///
    /// Without options, results come in engine order, limited by the
    /// client's default find limit when one is configured.
    pub async fn find(&self, filter: Document, options: Option<FindOptions>) -> DocResult<Vec<Document>> {
        self.inner
            .find(&filter, &options.unwrap_or_default(), None)
            .await
    }

    pub async fn find_in(
        &self,
        session: &Session,
        filter: Document,
        options: Option<FindOptions>,
    ) -> DocResult<Vec<Document>> {
        session.ensure_active()?;
        self.inner
            .find(&filter, &options.unwrap_or_default(), Some(session))
            .await
    }

    pub async fn find_one(&self, filter: Document) -> DocResult<Option<Document>> {
        let options = FindOptions::new().limit(1);
        Ok(self.inner.find(&filter, &options, None).await?.into_iter().next())
    }

    pub async fn find_one_in(&self, session: &Session, filter: Document) -> DocResult<Option<Document>> {
        session.ensure_active()?;
        let options = FindOptions::new().limit(1);
        Ok(self
            .inner
            .find(&filter, &options, Some(session))
            .await?
            .into_iter()
            .next())
    }

    /// Applies `update` to the first matching document.
    pub async fn update_one(&self, filter: Document, update: Document) -> DocResult<UpdateResult> {
        self.inner.update(&filter, &update, Some(1), None).await
    }

    pub async fn update_one_in(
        &self,
        session: &Session,
        filter: Document,
        update: Document,
    ) -> DocResult<UpdateResult> {
        session.ensure_active()?;
        self.inner.update(&filter, &update, Some(1), Some(session)).await
    }

    /// Applies `update` to every matching document.
    ///
    /// Matching rows are read first and then rewritten one statement per
    /// row, so the operation is not atomic: rows inserted after the read are
    /// not touched, and rows deleted after it still count as matched.
    pub async fn update_many(&self, filter: Document, update: Document) -> DocResult<UpdateResult> {
        self.inner.update(&filter, &update, None, None).await
    }

    pub async fn update_many_in(
        &self,
        session: &Session,
        filter: Document,
        update: Document,
    ) -> DocResult<UpdateResult> {
        session.ensure_active()?;
        self.inner.update(&filter, &update, None, Some(session)).await
    }

    pub async fn delete_one(&self, filter: Document) -> DocResult<DeleteResult> {
        self.inner.delete(&filter, Some(1), None).await
    }

    pub async fn delete_one_in(&self, session: &Session, filter: Document) -> DocResult<DeleteResult> {
        session.ensure_active()?;
        self.inner.delete(&filter, Some(1), Some(session)).await
    }

    /// Deletes every matching document, one statement per row read.
    pub async fn delete_many(&self, filter: Document) -> DocResult<DeleteResult> {
        self.inner.delete(&filter, None, None).await
    }

    pub async fn delete_many_in(&self, session: &Session, filter: Document) -> DocResult<DeleteResult> {
        session.ensure_active()?;
        self.inner.delete(&filter, None, Some(session)).await
    }

    pub async fn count_documents(&self, filter: Document) -> DocResult<u64> {
        self.inner.count(&filter, None).await
    }

    pub async fn count_documents_in(&self, session: &Session, filter: Document) -> DocResult<u64> {
        session.ensure_active()?;
        self.inner.count(&filter, Some(session)).await
    }

    /// Runs an aggregation pipeline.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let totals = orders
    ///     .aggregate(
    ///         vec![
    ///             doc!{ match: { status: "paid" } },
    ///             doc!{ group: { _id: "$customer", total: { sum: "$amount" } } },
    ///             doc!{ sort: { total: (-1) } },
    ///         ],
    ///         None,
    ///     )
    ///     .await?;
    /// ```
    pub async fn aggregate(
        &self,
        pipeline: Vec<Document>,
        options: Option<AggregateOptions>,
    ) -> DocResult<Vec<Document>> {
        self.inner
            .aggregate(&pipeline, &options.unwrap_or_default(), None)
            .await
    }

    pub async fn aggregate_in(
        &self,
        session: &Session,
        pipeline: Vec<Document>,
        options: Option<AggregateOptions>,
    ) -> DocResult<Vec<Document>> {
        session.ensure_active()?;
        self.inner
            .aggregate(&pipeline, &options.unwrap_or_default(), Some(session))
            .await
    }

    /// Fetches one page of matching documents ordered on the cursor field.
    pub async fn find_page(&self, filter: Document, options: PageOptions) -> DocResult<Page> {
        self.inner.find_page(filter, &options, None).await
    }

    pub async fn find_page_in(
        &self,
        session: &Session,
        filter: Document,
        options: PageOptions,
    ) -> DocResult<Page> {
        session.ensure_active()?;
        self.inner.find_page(filter, &options, Some(session)).await
    }

    /// Creates an expression index and returns its name.
    pub async fn create_index(&self, spec: IndexSpec) -> DocResult<String> {
        self.inner.db.check_opened()?;
        self.inner.db.adapter().create_index(self.name(), &spec).await?;
        Ok(spec.index_name(self.name()))
    }

    pub async fn drop_index(&self, index_name: &str) -> DocResult<()> {
        self.inner.db.check_opened()?;
        self.inner.db.adapter().drop_index(self.name(), index_name).await
    }

    pub async fn list_indexes(&self) -> DocResult<Vec<IndexInfo>> {
        self.inner.db.check_opened()?;
        self.inner.db.adapter().list_indexes(self.name()).await
    }

    /// Runs a raw DDL statement against the collection's table, as written.
    pub async fn alter_collection(&self, ddl: &str) -> DocResult<()> {
        self.inner.alter(ddl, None).await
    }

    pub async fn alter_collection_in(&self, session: &Session, ddl: &str) -> DocResult<()> {
        session.ensure_active()?;
        self.inner.alter(ddl, Some(session)).await
    }
}

impl std::fmt::Debug for DocumentCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCollection")
            .field("name", &self.inner.name)
            .finish()
    }
}

struct DocumentCollectionInner {
    name: String,
    db: DocSql,
}

/// A stored row: the engine row id and the decoded document.
struct StoredRow {
    row_id: Value,
    document: Document,
}

impl DocumentCollectionInner {
    fn dialect(&self) -> Dialect {
        self.db.dialect()
    }

    fn policy(&self) -> OperatorPolicy {
        self.db.config().operator_policy()
    }

    fn validate(&self, document: &Document) -> DocResult<()> {
        match self.db.validator(&self.name) {
            Some(validator) => run_validator(&self.name, validator.as_ref(), document),
            None => Ok(()),
        }
    }

    async fn insert(&self, documents: Vec<Document>, session: Option<&Session>) -> DocResult<InsertResult> {
        self.db.check_opened()?;
        if documents.is_empty() {
            return Ok(InsertResult::new(vec![]));
        }

        let mut inserted_ids = Vec::with_capacity(documents.len());
        let mut params = Vec::with_capacity(documents.len());
        for mut document in documents {
            if !document.has_id() {
                document.insert(DOC_ID, Uuid::new_v4().to_string());
            }
            self.validate(&document)?;
            inserted_ids.push(document.id().cloned().unwrap_or(Value::Null));
            params.push(Value::Document(document));
        }

        self.db.ensure_collection(&self.name, session).await?;

        let dialect = self.dialect();
        let values = (1..=params.len())
            .map(|index| format!("({})", dialect.placeholder(index)))
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            dialect.quote_ident(&self.name),
            DOC_COLUMN,
            values
        );

        log::debug!("Inserting {} document(s) into '{}'", params.len(), self.name);
        self.db.adapter().execute(&sql, &params, session).await?;
        Ok(InsertResult::new(inserted_ids))
    }

    async fn find(
        &self,
        filter: &Document,
        options: &FindOptions,
        session: Option<&Session>,
    ) -> DocResult<Vec<Document>> {
        self.db.check_opened()?;
        let limit = options.limit.or(self.db.config().default_find_limit());
        let rows = self
            .select(filter, &options.sort_by, limit, options.skip, session)
            .await?;

        let documents = rows.into_iter().map(|row| row.document);
        if options.projection.is_empty() {
            Ok(documents.collect())
        } else {
            documents
                .map(|document| pipeline::project(&document, &options.projection))
                .collect()
        }
    }

    async fn update(
        &self,
        filter: &Document,
        update: &Document,
        limit: Option<u64>,
        session: Option<&Session>,
    ) -> DocResult<UpdateResult> {
        self.db.check_opened()?;
        if !has_operators(update) {
            log::error!("Update on '{}' has no update operators: {}", self.name, update);
            return Err(DocSqlError::new(
                "An update needs at least one of set, inc, push, pull or unset",
                ErrorKind::InvalidOperation,
            ));
        }

        let policy = self.policy();
        let rows = self.select(filter, &[], limit, None, session).await?;

        // compute every replacement before the first write
        let mut replacements = Vec::with_capacity(rows.len());
        for row in rows {
            let updated = apply_with_policy(&row.document, update, policy)?;
            self.validate(&updated)?;
            replacements.push((row.row_id, updated));
        }

        let dialect = self.dialect();
        let sql = format!(
            "UPDATE {} SET {} = {} WHERE {} = {}",
            dialect.quote_ident(&self.name),
            DOC_COLUMN,
            dialect.placeholder(1),
            ROW_ID_COLUMN,
            dialect.placeholder(2)
        );

        let mut result = UpdateResult {
            matched_count: replacements.len() as u64,
            modified_count: 0,
        };
        for (row_id, updated) in replacements {
            let affected = self
                .db
                .adapter()
                .execute(&sql, &[Value::Document(updated), row_id], session)
                .await?;
            result.modified_count += affected;
        }

        log::debug!(
            "Updated '{}': {} matched, {} modified",
            self.name,
            result.matched_count,
            result.modified_count
        );
        Ok(result)
    }

    async fn delete(
        &self,
        filter: &Document,
        limit: Option<u64>,
        session: Option<&Session>,
    ) -> DocResult<DeleteResult> {
        self.db.check_opened()?;
        let rows = self.select(filter, &[], limit, None, session).await?;

        let dialect = self.dialect();
        let sql = format!(
            "DELETE FROM {} WHERE {} = {}",
            dialect.quote_ident(&self.name),
            ROW_ID_COLUMN,
            dialect.placeholder(1)
        );

        let mut result = DeleteResult::default();
        for row in rows {
            result.deleted_count += self
                .db
                .adapter()
                .execute(&sql, &[row.row_id], session)
                .await?;
        }

        log::debug!("Deleted {} document(s) from '{}'", result.deleted_count, self.name);
        Ok(result)
    }

    async fn count(&self, filter: &Document, session: Option<&Session>) -> DocResult<u64> {
        self.db.check_opened()?;
        let dialect = self.dialect();
        let predicate = compile_with_policy(filter, dialect, self.policy())?;
        let sql = format!(
            "SELECT COUNT(*) AS count FROM {}{}",
            dialect.quote_ident(&self.name),
            predicate.where_clause()
        );

        let rows = self.db.adapter().query(&sql, &predicate.params, session).await?;
        let count = rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(count_value);

        match count {
            Some(count) => Ok(count),
            None => {
                log::error!("Count on '{}' returned no usable row", self.name);
                Err(DocSqlError::new(
                    &format!("Count on '{}' returned no usable row", self.name),
                    ErrorKind::QueryFailed,
                ))
            }
        }
    }

    async fn aggregate(
        &self,
        pipeline: &[Document],
        options: &AggregateOptions,
        session: Option<&Session>,
    ) -> DocResult<Vec<Document>> {
        self.db.check_opened()?;
        let policy = options.operator_policy.unwrap_or_else(|| self.policy());
        let plan = pipeline::compile_with_policy(&self.name, pipeline, self.dialect(), policy)?;

        let rows = self.db.adapter().query(&plan.sql, &plan.params, session).await?;
        let documents = rows
            .iter()
            .map(|row| decode_blob(&self.name, row))
            .collect::<DocResult<Vec<_>>>()?;

        plan.apply_post_stages(documents)
    }

    async fn find_page(
        &self,
        filter: Document,
        options: &PageOptions,
        session: Option<&Session>,
    ) -> DocResult<Page> {
        self.db.check_opened()?;
        if options.limit == 0 {
            log::error!("Page size must be positive");
            return Err(DocSqlError::new(
                "Page size must be positive",
                ErrorKind::InvalidOperation,
            ));
        }

        let filter = options.cursor_filter(filter);

        let order = if options.ascending {
            SortOrder::Ascending
        } else {
            SortOrder::Descending
        };
        let rows = self
            .select(
                &filter,
                &[(options.cursor_field.clone(), order)],
                Some(options.limit.saturating_add(1)),
                None,
                session,
            )
            .await?;

        let documents = rows.into_iter().map(|row| row.document).collect();
        Ok(Page::from_lookahead(documents, options))
    }

    async fn alter(&self, ddl: &str, session: Option<&Session>) -> DocResult<()> {
        self.db.check_opened()?;
        if ddl.trim().is_empty() {
            log::error!("Empty DDL statement for '{}'", self.name);
            return Err(DocSqlError::new("DDL statement is empty", ErrorKind::InvalidOperation));
        }
        log::debug!("Altering '{}': {}", self.name, ddl);
        self.db.adapter().execute(ddl, &[], session).await.map(|_| ())
    }

    /// Reads the matching rows with their row ids.
    async fn select(
        &self,
        filter: &Document,
        order: &[(String, SortOrder)],
        limit: Option<u64>,
        skip: Option<u64>,
        session: Option<&Session>,
    ) -> DocResult<Vec<StoredRow>> {
        let dialect = self.dialect();
        let predicate = compile_with_policy(filter, dialect, self.policy())?;
        let sql = select_documents(dialect, &self.name, &predicate.clause, order, limit, skip);

        let rows = self.db.adapter().query(&sql, &predicate.params, session).await?;
        rows.iter()
            .map(|row| {
                Ok(StoredRow {
                    row_id: row.get(ROW_ID_COLUMN).cloned().unwrap_or(Value::Null),
                    document: decode_blob(&self.name, row)?,
                })
            })
            .collect()
    }
}

/// Decodes the `doc` column of a row, which adapters return either parsed
/// or as JSON text.
pub(crate) fn decode_blob(collection: &str, row: &Document) -> DocResult<Document> {
    match row.get(DOC_COLUMN) {
        Some(Value::Document(document)) => Ok(document.clone()),
        Some(Value::String(json)) => Document::from_json_str(json),
        other => {
            log::error!("Malformed document blob in '{}': {:?}", collection, other);
            Err(DocSqlError::new(
                &format!("Malformed document blob in '{}'", collection),
                ErrorKind::EncodingError,
            ))
        }
    }
}

fn count_value(value: &Value) -> Option<u64> {
    match value {
        Value::I64(count) => u64::try_from(*count).ok(),
        Value::F64(count) if *count >= 0.0 => Some(*count as u64),
        Value::String(count) => count.parse().ok(),
        _ => None,
    }
}
