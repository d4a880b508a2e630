use docsql::collection::{limit_to, order_by, FindOptions};
use docsql::common::{SortOrder, Value};
use docsql::doc;
use docsql::errors::{DocResult, ErrorKind};
use docsql::filter::{all, and, by_id, field, nor, not, or};
use docsql_int_test::test_util::{cleanup, create_test_context, insert_test_documents, names, run_test};

#[tokio::test]
async fn test_find_all() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            let documents = coll.find(all(), None).await?;
            assert_eq!(documents.len(), 5);
            assert_eq!(names(&documents), vec!["Ada", "Grace", "Linus", "Barbara", "Edsger"]);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_find_with_comparisons() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            assert_eq!(coll.find(field("age").gte(36), None).await?.len(), 4);
            assert_eq!(coll.find(field("age").lte(36), None).await?.len(), 2);
            assert_eq!(coll.find(field("age").gt(52), None).await?.len(), 0);
            assert_eq!(coll.find(field("age").lt(30), None).await?.len(), 1);
            assert_eq!(coll.find(field("age").between(30, 45), None).await?.len(), 3);
            assert_eq!(coll.find(doc!{ age: { gte: 30, lt: 45 } }, None).await?.len(), 2);
            assert_eq!(coll.find(doc!{ age: { "$gt": 40 } }, None).await?.len(), 2);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_find_with_equality() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            let documents = coll.find(field("city").eq("London"), None).await?;
            assert_eq!(names(&documents), vec!["Ada", "Barbara"]);

            let documents = coll.find(doc!{ active: true }, None).await?;
            assert_eq!(names(&documents), vec!["Ada", "Grace"]);

            let documents = coll.find(field("address.city").eq("London"), None).await?;
            assert_eq!(names(&documents), vec!["Ada"]);

            let documents = coll.find(field("city").eq(Value::Null), None).await?;
            assert_eq!(names(&documents), vec!["Edsger"]);

            let documents = coll.find(by_id("p3"), None).await?;
            assert_eq!(names(&documents), vec!["Linus"]);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_find_with_missing_fields() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            // a missing field is not equal to anything
            let documents = coll.find(field("city").ne("London"), None).await?;
            assert_eq!(names(&documents), vec!["Grace", "Linus", "Edsger"]);

            let documents = coll.find(field("city").not_in_array(vec!["London", "Helsinki"]), None).await?;
            assert_eq!(names(&documents), vec!["Grace", "Edsger"]);

            assert_eq!(coll.find(field("city").exists(true), None).await?.len(), 4);
            let documents = coll.find(field("city").exists(false), None).await?;
            assert_eq!(names(&documents), vec!["Edsger"]);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_find_with_sets() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            let documents = coll.find(field("city").in_array(vec!["London", "Helsinki"]), None).await?;
            assert_eq!(names(&documents), vec!["Ada", "Linus", "Barbara"]);

            let documents = coll.find(field("age").in_array(vec![28, 40, 99]), None).await?;
            assert_eq!(names(&documents), vec!["Linus", "Edsger"]);

            // empty sets
            assert!(coll.find(field("city").in_array(Vec::<String>::new()), None).await?.is_empty());
            assert_eq!(coll.find(field("city").not_in_array(Vec::<String>::new()), None).await?.len(), 5);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_find_with_combinators() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            let documents = coll
                .find(and(vec![field("city").eq("London"), field("active").eq(true)]), None)
                .await?;
            assert_eq!(names(&documents), vec!["Ada"]);

            let documents = coll
                .find(or(vec![field("city").eq("Helsinki"), field("age").gt(50)]), None)
                .await?;
            assert_eq!(names(&documents), vec!["Linus", "Barbara"]);

            let documents = coll
                .find(doc!{ "$or": [ { city: "Helsinki" }, { age: { "$gt": 50 } } ] }, None)
                .await?;
            assert_eq!(names(&documents), vec!["Linus", "Barbara"]);

            let documents = coll
                .find(nor(vec![field("age").lt(30), field("age").gt(50)]), None)
                .await?;
            assert_eq!(names(&documents), vec!["Ada", "Grace", "Edsger"]);

            let documents = coll.find(not(field("age").gt(40)), None).await?;
            assert_eq!(names(&documents), vec!["Ada", "Linus", "Edsger"]);

            let documents = coll
                .find(
                    and(vec![
                        or(vec![field("age").lt(30), field("city").eq("London")]),
                        field("active").eq(false),
                    ]),
                    None,
                )
                .await?;
            assert_eq!(names(&documents), vec!["Linus", "Barbara"]);

            // sibling keys are AND-ed
            let documents = coll.find(doc!{ city: "London", age: { gt: 40 } }, None).await?;
            assert_eq!(names(&documents), vec!["Barbara"]);

            // empty combinators
            assert!(coll.find(or(vec![]), None).await?.is_empty());
            assert_eq!(coll.find(and(vec![]), None).await?.len(), 5);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_find_with_options() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            let documents = coll
                .find(all(), Some(order_by("age", SortOrder::Descending)))
                .await?;
            assert_eq!(names(&documents), vec!["Barbara", "Grace", "Edsger", "Ada", "Linus"]);

            let documents = coll
                .find(all(), Some(order_by("age", SortOrder::Ascending).skip(1).limit(2)))
                .await?;
            assert_eq!(names(&documents), vec!["Ada", "Edsger"]);

            let documents = coll.find(all(), Some(limit_to(2))).await?;
            assert_eq!(documents.len(), 2);

            let documents = coll
                .find(
                    field("city").eq("London"),
                    Some(FindOptions::new().sort_by("name", SortOrder::Ascending).project(&["name", "age"])),
                )
                .await?;
            assert_eq!(documents, vec![doc!{ name: "Ada", age: 36 }, doc!{ name: "Barbara", age: 52 }]);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_find_one_and_count() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            let grace = coll.find_one(field("name").eq("Grace")).await?;
            assert_eq!(grace.and_then(|doc| doc.get("age").cloned()), Some(Value::from(45)));
            assert!(coll.find_one(field("name").eq("Alan")).await?.is_none());

            assert_eq!(coll.count_documents(all()).await?, 5);
            assert_eq!(coll.count_documents(field("active").eq(true)).await?, 2);
            assert_eq!(coll.count_documents(field("age").gt(100)).await?, 0);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_find_on_missing_collection() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("ghosts")?;
            let err = coll.find(all(), None).await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::QueryFailed);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}
