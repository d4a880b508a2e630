use docsql::collection::Document;
use docsql::doc;
use docsql::errors::{DocResult, DocSqlError, ErrorKind};
use docsql::filter::{all, by_id};
use docsql::validator::RequiredFields;
use docsql::DocSql;
use docsql_int_test::test_util::{cleanup, create_test_context, run_test, RecordingAdapter};
use docsql_sqlite_adapter::SqliteAdapter;
use std::sync::Arc;

#[tokio::test]
async fn test_validator_rejects_inserts() {
    run_test(
        create_test_context,
        |ctx| async move {
            let db = ctx.db();
            let coll = db
                .create_collection("people", Some(Arc::new(RequiredFields::new(&["name"]))))
                .await?;

            let err = coll.insert_one(doc!{ age: 3 }).await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);

            // one bad document rejects the whole batch
            let err = coll
                .insert_many(vec![doc!{ name: "Ada" }, doc!{ age: 3 }])
                .await
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);
            assert_eq!(coll.count_documents(all()).await?, 0);

            coll.insert_one(doc!{ name: "Ada" }).await?;
            assert_eq!(coll.count_documents(all()).await?, 1);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_validator_checks_updated_documents() {
    run_test(
        create_test_context,
        |ctx| async move {
            let db = ctx.db();
            let coll = db.collection("people")?;
            coll.insert_one(doc!{ id: "a", name: "Ada", age: 36 }).await?;

            db.set_validator(
                "people",
                Arc::new(|document: &Document| -> DocResult<()> {
                    match document.get("age").and_then(|age| age.as_i64()) {
                        Some(age) if *age < 150 => Ok(()),
                        _ => Err(DocSqlError::new("implausible age", ErrorKind::ValidationError)),
                    }
                }),
            );

            let err = coll
                .update_one(by_id("a"), doc!{ inc: { age: 200 } })
                .await
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);

            let ada = coll.find_one(by_id("a")).await?.unwrap();
            assert_eq!(ada, doc!{ id: "a", name: "Ada", age: 36 });

            assert!(db.remove_validator("people"));
            assert!(!db.remove_validator("people"));
            coll.update_one(by_id("a"), doc!{ inc: { age: 200 } }).await?;

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_validators_belong_to_one_client() {
    run_test(
        create_test_context,
        |ctx| async move {
            ctx.db().set_validator("people", Arc::new(RequiredFields::new(&["name"])));

            let adapter = Arc::new(RecordingAdapter::new(Arc::new(SqliteAdapter::in_memory()?)));
            let other = DocSql::builder().adapter(adapter).open().await?;
            other.collection("people")?.insert_one(doc!{ age: 3 }).await?;

            let err = ctx
                .db()
                .collection("people")?
                .insert_one(doc!{ age: 3 })
                .await
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);

            other.close().await?;
            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}
