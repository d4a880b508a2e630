use docsql::common::Value;
use docsql::doc;
use docsql::errors::{DocResult, ErrorKind};
use docsql::filter::{all, by_id, field};
use docsql_int_test::test_util::{cleanup, create_test_context, insert_test_documents, run_test};

#[tokio::test]
async fn test_update_one() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            let result = coll
                .update_one(field("name").eq("Ada"), doc!{ set: { city: "Cambridge" }, inc: { age: 1 } })
                .await?;
            assert_eq!(result.matched_count, 1);
            assert_eq!(result.modified_count, 1);

            let ada = coll.find_one(by_id("p1")).await?.unwrap();
            assert_eq!(ada.get("city"), Some(&Value::from("Cambridge")));
            assert_eq!(ada.get("age"), Some(&Value::from(37)));
            // untouched fields survive the rewrite
            assert_eq!(ada.get("address.zip"), Some(&Value::from("N1")));

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_update_one_touches_a_single_match() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            let result = coll
                .update_one(field("city").eq("London"), doc!{ set: { flagged: true } })
                .await?;
            assert_eq!(result.matched_count, 1);
            assert_eq!(coll.count_documents(field("flagged").eq(true)).await?, 1);

            let result = coll
                .update_one(field("city").eq("Paris"), doc!{ set: { flagged: true } })
                .await?;
            assert_eq!(result.matched_count, 0);
            assert_eq!(result.modified_count, 0);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_update_many_is_not_idempotent() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            for _ in 0..2 {
                let result = coll
                    .update_many(field("city").eq("London"), doc!{ "$inc": { visits: 1 } })
                    .await?;
                assert_eq!(result.matched_count, 2);
                assert_eq!(result.modified_count, 2);
            }

            let london = coll.find(field("city").eq("London"), None).await?;
            for person in london {
                assert_eq!(person.get("visits"), Some(&Value::from(2)));
            }

            let grace = coll.find_one(by_id("p2")).await?.unwrap();
            assert_eq!(grace.get("visits"), Some(&Value::from(2)));

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_update_sequences_and_unset() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            coll.update_one(by_id("p3"), doc!{ push: { tags: "rust" } }).await?;
            let linus = coll.find_one(by_id("p3")).await?.unwrap();
            assert_eq!(linus.get("tags"), Some(&Value::from_vec(vec!["kernels", "rust"])));

            coll.update_one(by_id("p3"), doc!{ pull: { tags: "kernels" } }).await?;
            let linus = coll.find_one(by_id("p3")).await?.unwrap();
            assert_eq!(linus.get("tags"), Some(&Value::from_vec(vec!["rust"])));

            coll.update_one(by_id("p2"), doc!{ unset: { city: "" } }).await?;
            let grace = coll.find_one(by_id("p2")).await?.unwrap();
            assert!(!grace.contains_key("city"));
            assert_eq!(coll.count_documents(field("city").exists(false)).await?, 2);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_update_without_operators() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            let err = coll.update_many(all(), doc!{ city: "Paris" }).await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
            assert_eq!(coll.count_documents(field("city").eq("Paris")).await?, 0);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_update_races_with_concurrent_delete() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            // another writer removes Grace between the read and the writes
            ctx.adapter().interleave_before(
                "UPDATE",
                "DELETE FROM \"people\" WHERE json_extract(doc, '$.name') = 'Grace'",
            );
            let result = coll.update_many(all(), doc!{ inc: { visits: 1 } }).await?;
            assert_eq!(result.matched_count, 5);
            assert_eq!(result.modified_count, 4);

            assert_eq!(coll.count_documents(all()).await?, 4);
            assert_eq!(coll.count_documents(field("visits").eq(1)).await?, 4);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_update_ignores_late_insert() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            // another writer adds a match after the rows were selected
            ctx.adapter().interleave_before(
                "UPDATE",
                "INSERT INTO \"people\" (doc) VALUES ('{\"name\":\"Late\",\"visits\":0}')",
            );
            let result = coll.update_many(all(), doc!{ inc: { visits: 1 } }).await?;
            assert_eq!(result.matched_count, 5);
            assert_eq!(result.modified_count, 5);

            assert_eq!(coll.count_documents(all()).await?, 6);
            let late = coll.find_one(field("name").eq("Late")).await?;
            assert_eq!(late.and_then(|d| d.get("visits").cloned()), Some(Value::from(0)));

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}
