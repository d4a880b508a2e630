use docsql::collection::PageOptions;
use docsql::common::Value;
use docsql::doc;
use docsql::errors::{DocResult, ErrorKind};
use docsql::filter::{all, field};
use docsql_int_test::test_util::{cleanup, create_test_context, insert_test_documents, names, run_test};

#[tokio::test]
async fn test_pages_in_ascending_order() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            let page = coll.find_page(all(), PageOptions::new("age").limit(2)).await?;
            assert_eq!(names(&page.documents), vec!["Linus", "Ada"]);
            assert!(page.has_next);
            assert_eq!(page.next_cursor, Some(Value::from(36)));

            let page = coll
                .find_page(all(), PageOptions::new("age").limit(2).after(36))
                .await?;
            assert_eq!(names(&page.documents), vec!["Edsger", "Grace"]);
            assert_eq!(page.next_cursor, Some(Value::from(45)));

            let page = coll
                .find_page(all(), PageOptions::new("age").limit(2).after(45))
                .await?;
            assert_eq!(names(&page.documents), vec!["Barbara"]);
            assert!(!page.has_next);
            assert_eq!(page.next_cursor, None);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_pages_in_descending_order_with_filter() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            // four people have a city, so the second page is exactly full
            let filter = field("city").exists(true);
            let page = coll
                .find_page(filter.clone(), PageOptions::new("age").descending().limit(2))
                .await?;
            assert_eq!(names(&page.documents), vec!["Barbara", "Grace"]);
            assert!(page.has_next);

            let cursor = page.next_cursor.unwrap();
            let page = coll
                .find_page(filter, PageOptions::new("age").descending().limit(2).after(cursor))
                .await?;
            assert_eq!(names(&page.documents), vec!["Ada", "Linus"]);
            assert!(!page.has_next);
            assert_eq!(page.next_cursor, None);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_pages_cross_multi_digit_cursors() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("tickets")?;
            let tickets = (1..=12).map(|seq: i64| doc!{ seq: (seq) }).collect();
            coll.insert_many(tickets).await?;

            let mut seen = Vec::new();
            let mut options = PageOptions::new("seq").limit(4);
            loop {
                let page = coll.find_page(all(), options.clone()).await?;
                for document in &page.documents {
                    seen.push(document.get("seq").and_then(|v| v.as_i64()).copied().unwrap_or(-1));
                }
                match page.next_cursor {
                    Some(cursor) => options = options.after(cursor),
                    None => break,
                }
            }
            assert_eq!(seen, (1..=12).collect::<Vec<i64>>());

            // 9 < 10 numerically even though "10" < "9" as text
            let page = coll
                .find_page(all(), PageOptions::new("seq").limit(2).after(9))
                .await?;
            assert_eq!(page.len(), 2);
            assert_eq!(page.documents[0].get("seq").and_then(|v| v.as_i64()), Some(&10));

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_page_size_must_be_positive() {
    run_test(
        create_test_context,
        |ctx| async move {
            let coll = ctx.db().collection("people")?;
            insert_test_documents(&coll).await?;

            let err = coll
                .find_page(all(), PageOptions::new("age").limit(0))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);

            let page = coll.find_page(all(), PageOptions::new("age")).await?;
            assert_eq!(page.len(), 5);
            assert!(!page.has_next);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}
