use docsql::collection::AggregateOptions;
use docsql::common::{OperatorPolicy, Value};
use docsql::doc;
use docsql::errors::{DocResult, ErrorKind};
use docsql_int_test::test_util::{cleanup, create_test_context, insert_test_documents, names, run_test};

#[tokio::test]
async fn test_match_sort_limit() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            let documents = coll
                .aggregate(
                    vec![
                        doc!{ match: { age: { gt: 40 } } },
                        doc!{ sort: { age: (-1) } },
                        doc!{ limit: 2 },
                    ],
                    None,
                )
                .await?;
            assert_eq!(names(&documents), vec!["Barbara", "Grace"]);

            // match stages are AND-ed and the last skip wins
            let documents = coll
                .aggregate(
                    vec![
                        doc!{ "$match": { age: { gt: 30 } } },
                        doc!{ "$match": { city: "London" } },
                        doc!{ "$sort": { name: 1 } },
                        doc!{ skip: 5 },
                        doc!{ skip: 1 },
                    ],
                    None,
                )
                .await?;
            assert_eq!(names(&documents), vec!["Barbara"]);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_group_by_field() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            let groups = coll
                .aggregate(
                    vec![
                        doc!{ group: { _id: "$city", count: { sum: 1 }, total_age: { sum: "$age" } } },
                        doc!{ sort: { _id: 1 } },
                    ],
                    None,
                )
                .await?;
            assert_eq!(groups.len(), 4);

            // people without a city share the null group, which sorts first
            assert_eq!(groups[0].get("_id"), Some(&Value::Null));
            assert_eq!(groups[0].get("count"), Some(&Value::from(1)));

            let london = groups
                .iter()
                .find(|group| group.get("_id") == Some(&Value::from("London")))
                .unwrap();
            assert_eq!(london.get("count"), Some(&Value::from(2)));
            assert_eq!(london.get("total_age"), Some(&Value::from(88)));

            // sorting on an accumulator
            let groups = coll
                .aggregate(
                    vec![
                        doc!{ match: { city: { exists: true } } },
                        doc!{ group: { _id: "$city", count: { sum: 1 } } },
                        doc!{ sort: { count: (-1) } },
                        doc!{ limit: 1 },
                    ],
                    None,
                )
                .await?;
            assert_eq!(groups, vec![doc!{ _id: "London", count: 2 }]);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_group_everything() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            let groups = coll
                .aggregate(
                    vec![doc!{
                        group: {
                            _id: null,
                            average: { avg: "$age" },
                            youngest: { min: "$age" },
                            oldest: { max: "$age" },
                            doubled: { sum: 2 },
                        }
                    }],
                    None,
                )
                .await?;
            assert_eq!(groups.len(), 1);

            let group = &groups[0];
            assert_eq!(group.get("_id"), Some(&Value::Null));
            assert_eq!(group.get("average"), Some(&Value::from(40.2)));
            assert_eq!(group.get("youngest"), Some(&Value::from(28)));
            assert_eq!(group.get("oldest"), Some(&Value::from(52)));
            assert_eq!(group.get("doubled"), Some(&Value::from(10)));

            let sql = ctx.adapter().statements().last().cloned().unwrap_or_default();
            assert!(sql.contains("COUNT(*) * 2"));

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_unwind_and_project() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            let documents = coll
                .aggregate(
                    vec![
                        doc!{ match: { name: { in: ["Ada", "Grace"] } } },
                        doc!{ unwind: "$tags" },
                        doc!{ project: { name: 1, tags: 1 } },
                    ],
                    None,
                )
                .await?;
            assert_eq!(
                documents,
                vec![
                    doc!{ name: "Ada", tags: "math" },
                    doc!{ name: "Ada", tags: "engines" },
                    doc!{ name: "Grace", tags: "navy" },
                    doc!{ name: "Grace", tags: "compilers" },
                ]
            );

            // an empty sequence unwinds to nothing
            let documents = coll
                .aggregate(vec![doc!{ match: { name: "Barbara" } }, doc!{ unwind: "tags" }], None)
                .await?;
            assert!(documents.is_empty());

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_unknown_stage() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            let pipeline = vec![doc!{ lookup: { from: "orders" } }];
            let documents = coll.aggregate(pipeline.clone(), None).await?;
            assert_eq!(documents.len(), 5);

            let err = coll
                .aggregate(
                    pipeline,
                    Some(AggregateOptions::new().operator_policy(OperatorPolicy::Strict)),
                )
                .await
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::UnsupportedOperator);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}
