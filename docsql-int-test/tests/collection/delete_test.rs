use docsql::errors::DocResult;
use docsql::filter::{all, field};
use docsql_int_test::test_util::{cleanup, create_test_context, insert_test_documents, names, run_test};

#[tokio::test]
async fn test_delete_one() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            let result = coll.delete_one(field("city").eq("London")).await?;
            assert_eq!(result.deleted_count, 1);
            assert_eq!(coll.count_documents(all()).await?, 4);
            assert_eq!(names(&coll.find(field("city").eq("London"), None).await?), vec!["Barbara"]);

            let result = coll.delete_one(field("city").eq("Paris")).await?;
            assert_eq!(result.deleted_count, 0);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_delete_many() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            let result = coll.delete_many(field("active").eq(false)).await?;
            assert_eq!(result.deleted_count, 2);
            assert_eq!(names(&coll.find(all(), None).await?), vec!["Ada", "Grace", "Edsger"]);

            let result = coll.delete_many(all()).await?;
            assert_eq!(result.deleted_count, 3);
            assert_eq!(coll.count_documents(all()).await?, 0);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_delete_races_with_concurrent_delete() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            // another writer removes Barbara after the matching rows were read
            ctx.adapter().interleave_before(
                "DELETE",
                "DELETE FROM \"people\" WHERE json_extract(doc, '$.name') = 'Barbara'",
            );
            let result = coll.delete_many(field("city").eq("London")).await?;
            assert_eq!(result.deleted_count, 1);
            assert_eq!(coll.count_documents(field("city").eq("London")).await?, 0);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_delete_ignores_late_insert() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            ctx.adapter().interleave_before(
                "DELETE",
                "INSERT INTO \"people\" (doc) VALUES ('{\"name\":\"Late\"}')",
            );
            let result = coll.delete_many(all()).await?;
            assert_eq!(result.deleted_count, 5);

            let remaining = coll.find(all(), None).await?;
            assert_eq!(names(&remaining), vec!["Late"]);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}
