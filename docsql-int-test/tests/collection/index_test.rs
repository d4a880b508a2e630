use docsql::common::SortOrder;
use docsql::doc;
use docsql::errors::{DocResult, ErrorKind};
use docsql::filter::field;
use docsql::index::IndexSpec;
use docsql_int_test::test_util::{cleanup, create_test_context, insert_test_documents, names, run_test};

#[tokio::test]
async fn test_create_and_drop_index() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            let name = coll.create_index(IndexSpec::on("city")).await?;
            assert_eq!(name, "idx_people_city");

            let compound = coll
                .create_index(
                    IndexSpec::on("city")
                        .and_field("age", SortOrder::Descending)
                        .named("people_by_city_age"),
                )
                .await?;
            assert_eq!(compound, "people_by_city_age");

            let indexes = coll.list_indexes().await?;
            let index_names: Vec<&str> = indexes.iter().map(|index| index.name.as_str()).collect();
            assert_eq!(index_names, vec!["idx_people_city", "people_by_city_age"]);
            assert!(indexes[0]
                .definition
                .as_deref()
                .is_some_and(|sql| sql.contains("json_extract")));

            // queries keep working on indexed fields
            let documents = coll.find(field("city").eq("London"), None).await?;
            assert_eq!(names(&documents), vec!["Ada", "Barbara"]);

            coll.drop_index("idx_people_city").await?;
            let indexes = coll.list_indexes().await?;
            assert_eq!(indexes.len(), 1);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_unique_index_rejects_duplicates() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;
            coll.create_index(IndexSpec::on("name").unique()).await?;

            let err = coll.insert_one(doc!{ name: "Ada" }).await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::QueryFailed);
            assert!(err.driver_error().is_some());
            assert_eq!(coll.count_documents(field("name").eq("Ada")).await?, 1);

            coll.insert_one(doc!{ name: "Alan" }).await?;

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_index_without_fields() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            let err = coll.create_index(IndexSpec::with_fields(vec![])).await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_alter_collection() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            coll.alter_collection("ALTER TABLE \"people\" ADD COLUMN note TEXT").await?;
            assert_eq!(coll.find(field("city").eq("London"), None).await?.len(), 2);

            let err = coll.alter_collection("  ").await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);

            let err = coll.alter_collection("ALTER TABLE \"nope\" ADD COLUMN x TEXT").await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::QueryFailed);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}
