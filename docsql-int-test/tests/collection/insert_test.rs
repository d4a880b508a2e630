use docsql::common::Value;
use docsql::doc;
use docsql::errors::{DocResult, ErrorKind};
use docsql::filter::{all, by_id};
use docsql_int_test::test_util::{cleanup, create_test_context, create_test_docs, run_test};

#[tokio::test]
async fn test_insert_one_assigns_id() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            let result = coll.insert_one(doc!{ name: "Ada" }).await?;
            assert!(result.acknowledged());
            assert_eq!(result.inserted_count(), 1);

            let id = result.inserted_ids()[0].clone();
            assert_eq!(id.as_str().map(|it| it.len()), Some(36));

            let stored = coll.find_one(by_id(id.clone())).await?.unwrap();
            assert_eq!(stored.get("name"), Some(&Value::from("Ada")));
            assert_eq!(stored.id(), Some(&id));

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_insert_keeps_given_id() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            let result = coll.insert_one(doc!{ id: 42, name: "Grace" }).await?;
            assert_eq!(result.inserted_ids(), &[Value::from(42)]);

            let stored = coll.find_one(by_id(42)).await?.unwrap();
            assert_eq!(stored, doc!{ id: 42, name: "Grace" });

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_insert_many() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            let result = coll.insert_many(create_test_docs()).await?;
            assert_eq!(result.inserted_count(), 5);
            assert_eq!(
                result.inserted_ids(),
                &[
                    Value::from("p1"),
                    Value::from("p2"),
                    Value::from("p3"),
                    Value::from("p4"),
                    Value::from("p5")
                ]
            );
            assert_eq!(coll.count_documents(all()).await?, 5);

            // one multi-row statement
            let inserts = ctx
                .adapter()
                .statements()
                .into_iter()
                .filter(|sql| sql.starts_with("INSERT"))
                .count();
            assert_eq!(inserts, 1);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_insert_empty_batch() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            let result = coll.insert_many(vec![]).await?;
            assert!(result.acknowledged());
            assert_eq!(result.inserted_count(), 0);
            assert!(!ctx.db().has_collection("people").await?);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_insert_round_trip() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("samples")?;
            let document = doc!{
                id: "s1",
                score: 2.5,
                count: (-3),
                flags: [true, false],
                note: null,
                meta: {
                    source: "sensor",
                    position: { x: 1, y: 2.25 },
                    readings: [1, 2, 3],
                },
            };
            coll.insert_one(document.clone()).await?;

            let stored = coll.find_one(by_id("s1")).await?.unwrap();
            assert_eq!(stored, document);
            assert_eq!(stored.get("meta.position.y"), Some(&Value::F64(2.25)));
            assert_eq!(stored.get("note"), Some(&Value::Null));

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_collection_lifecycle() {
    run_test(
        create_test_context,
        |ctx| async move {
            let db = ctx.db();
            assert!(db.list_collections().await?.is_empty());

            db.collection("people")?.insert_one(doc!{ name: "Ada" }).await?;
            db.create_collection("orders", None).await?;
            assert_eq!(db.list_collections().await?, vec!["orders", "people"]);
            assert!(db.has_collection("orders").await?);

            db.drop_collection("orders").await?;
            assert!(!db.has_collection("orders").await?);
            assert_eq!(db.list_collections().await?, vec!["people"]);

            // inserting again recreates the dropped table
            db.collection("orders")?.insert_one(doc!{ total: 10 }).await?;
            assert!(db.has_collection("orders").await?);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_invalid_collection_name() {
    run_test(
        create_test_context,
        |ctx| async move {
            let err = ctx.db().collection("").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidName);

            let err = ctx.db().collection("bad\nname").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidName);

            let err = ctx.db().collection(&"x".repeat(64)).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidName);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}
