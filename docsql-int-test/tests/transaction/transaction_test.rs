use docsql::common::Value;
use docsql::doc;
use docsql::errors::{DocResult, DocSqlError, ErrorKind};
use docsql::filter::{all, by_id, field};
use docsql::store::DocumentStoreAdapter;
use docsql::transaction::SessionState;
use docsql::DocSql;
use docsql_int_test::test_util::{
    cleanup, create_strict_test_context, create_test_context, insert_test_documents, names, run_test,
};
use docsql_sqlite_adapter::SqliteAdapter;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_with_transaction_commits() {
    run_test(
        create_test_context,
        |ctx| async move {
            let db = ctx.db();
            let accounts = db.create_collection("accounts", None).await?;
            accounts
                .insert_many(vec![doc!{ id: "a", balance: 100 }, doc!{ id: "b", balance: 0 }])
                .await?;

            let moved = db
                .with_transaction(|session| {
                    let accounts = accounts.clone();
                    async move {
                        accounts
                            .update_one_in(&session, by_id("a"), doc!{ inc: { balance: (-30) } })
                            .await?;
                        accounts
                            .update_one_in(&session, by_id("b"), doc!{ inc: { balance: 30 } })
                            .await?;
                        accounts.count_documents_in(&session, field("balance").gt(0)).await
                    }
                })
                .await?;
            assert_eq!(moved, 2);
            assert_eq!(ctx.adapter().release_count(), 1);
            assert_eq!(ctx.adapter().rollback_count(), 0);

            let a = accounts.find_one(by_id("a")).await?.unwrap();
            assert_eq!(a.get("balance"), Some(&Value::from(70)));
            let b = accounts.find_one(by_id("b")).await?.unwrap();
            assert_eq!(b.get("balance"), Some(&Value::from(30)));

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_with_transaction_rolls_back_on_error() {
    run_test(
        create_test_context,
        |ctx| async move {
            let db = ctx.db();
            let people = db.create_collection("people", None).await?;

            let err = db
                .with_transaction(|session| {
                    let people = people.clone();
                    async move {
                        people.insert_one_in(&session, doc!{ name: "Ada" }).await?;
                        Err::<(), _>(DocSqlError::new("work failed", ErrorKind::InvalidOperation))
                    }
                })
                .await
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
            assert_eq!(ctx.adapter().rollback_count(), 1);
            assert_eq!(ctx.adapter().release_count(), 1);
            assert_eq!(people.count_documents(all()).await?, 0);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_failed_commit_is_reported() {
    run_test(
        create_test_context,
        |ctx| async move {
            let db = ctx.db();
            let people = db.create_collection("people", None).await?;

            ctx.adapter().fail_next_commit();
            let err = db
                .with_transaction(|session| {
                    let people = people.clone();
                    async move {
                        people.insert_one_in(&session, doc!{ name: "Ada" }).await?;
                        DocResult::Ok(())
                    }
                })
                .await
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::TransactionFailed);
            assert_eq!(ctx.adapter().rollback_count(), 1);
            assert_eq!(ctx.adapter().release_count(), 1);
            assert_eq!(people.count_documents(all()).await?, 0);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_manual_session() {
    run_test(
        create_test_context,
        |ctx| async move {
            let db = ctx.db();
            let people = db.create_collection("people", None).await?;
            insert_test_documents(&people).await?;

            let session = db.start_session().await?;
            assert_eq!(session.state(), SessionState::Active);
            people.insert_one_in(&session, doc!{ name: "Alan" }).await?;
            people.delete_many_in(&session, field("city").eq("London")).await?;
            assert_eq!(people.count_documents_in(&session, all()).await?, 4);
            let visible = people.find_in(&session, all(), None).await?;
            assert_eq!(names(&visible), vec!["Grace", "Linus", "Edsger", "Alan"]);

            db.rollback(&session).await?;
            assert_eq!(session.state(), SessionState::RolledBack);
            db.release(&session).await?;
            assert_eq!(session.state(), SessionState::Released);
            // releasing twice is a no-op
            db.release(&session).await?;

            assert_eq!(people.count_documents(all()).await?, 5);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_finished_session_rejects_statements() {
    run_test(
        create_test_context,
        |ctx| async move {
            let db = ctx.db();
            let people = db.create_collection("people", None).await?;

            let session = db.start_session().await?;
            people.insert_one_in(&session, doc!{ name: "Ada" }).await?;
            db.commit(&session).await?;
            assert_eq!(session.state(), SessionState::Committed);

            let err = people.insert_one_in(&session, doc!{ name: "Alan" }).await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::SessionClosed);
            let err = db.commit(&session).await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::SessionClosed);

            db.release(&session).await?;
            assert_eq!(people.count_documents(all()).await?, 1);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_session_insert_without_auto_create() {
    run_test(
        create_test_context,
        |ctx| async move {
            ctx.db().create_collection("people", None).await?;

            // a second client that has not seen the table yet
            let db = DocSql::builder()
                .adapter(ctx.adapter())
                .auto_create_collections(false)
                .open()
                .await?;
            let people = db.collection("people")?;
            let ghosts = db.collection("ghosts")?;

            let inserted = tokio::time::timeout(
                Duration::from_secs(5),
                db.with_transaction(|session| {
                    let people = people.clone();
                    async move { people.insert_one_in(&session, doc!{ name: "Ada" }).await }
                }),
            )
            .await
            .map_err(|_| DocSqlError::new("session insert did not finish", ErrorKind::InternalError))??;
            assert_eq!(inserted.inserted_count(), 1);
            assert_eq!(people.count_documents(all()).await?, 1);

            let err = tokio::time::timeout(
                Duration::from_secs(5),
                db.with_transaction(|session| {
                    let ghosts = ghosts.clone();
                    async move { ghosts.insert_one_in(&session, doc!{ name: "Casper" }).await }
                }),
            )
            .await
            .map_err(|_| DocSqlError::new("session insert did not finish", ErrorKind::InternalError))?
            .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
            assert!(!ctx.db().has_collection("ghosts").await?);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_savepoints() {
    run_test(
        create_test_context,
        |ctx| async move {
            let db = ctx.db();
            let adapter = ctx.adapter();
            let people = db.create_collection("people", None).await?;

            let session = db.start_session().await?;
            people.insert_one_in(&session, doc!{ name: "Ada" }).await?;
            adapter.create_savepoint(&session, "before_grace").await?;
            people.insert_one_in(&session, doc!{ name: "Grace" }).await?;
            adapter.create_savepoint(&session, "before_linus").await?;
            people.insert_one_in(&session, doc!{ name: "Linus" }).await?;

            adapter.rollback_to_savepoint(&session, "before_grace").await?;
            assert_eq!(session.savepoints(), vec!["before_grace"]);

            let err = adapter
                .release_savepoint(&session, "before_linus")
                .await
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);

            adapter.release_savepoint(&session, "before_grace").await?;
            assert!(session.savepoints().is_empty());

            db.commit(&session).await?;
            db.release(&session).await?;

            assert_eq!(names(&people.find(all(), None).await?), vec!["Ada"]);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_strict_operators() {
    run_test(
        create_strict_test_context,
        |ctx| async move {
            let people = ctx.db().collection("people")?;
            insert_test_documents(&people).await?;

            let err = people
                .find(doc!{ age: { near: 40 } }, None)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::UnsupportedOperator);

            let err = people
                .update_many(all(), doc!{ set: { seen: true }, rename: { name: "title" } })
                .await
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::UnsupportedOperator);
            assert_eq!(people.count_documents(field("seen").eq(true)).await?, 0);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_ping_and_close() {
    run_test(
        create_test_context,
        |ctx| async move {
            let db = ctx.db();
            assert!(db.ping().await);

            ctx.adapter().close().await?;
            assert!(!db.ping().await);

            db.close().await?;
            db.close().await?;
            assert!(db.is_closed());

            let err = db.collection("people").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ClientClosed);

            DocResult::Ok(())
        },
        cleanup,
    )
    .await
}

#[tokio::test]
async fn test_open_configuration() {
    let err = DocSql::builder()
        .adapter(Arc::new(SqliteAdapter::in_memory().unwrap()))
        .dialect("postgres")
        .open()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InvalidConfiguration);

    let err = DocSql::builder()
        .adapter(Arc::new(SqliteAdapter::in_memory().unwrap()))
        .dialect("oracle")
        .open()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InvalidConfiguration);

    let err = DocSql::builder().open().await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InvalidConfiguration);
}

#[tokio::test]
async fn test_default_find_limit() {
    let db = DocSql::builder()
        .adapter(Arc::new(SqliteAdapter::in_memory().unwrap()))
        .default_find_limit(2)
        .open()
        .await
        .unwrap();

    let people = db.collection("people").unwrap();
    insert_test_documents(&people).await.unwrap();
    assert_eq!(people.find(all(), None).await.unwrap().len(), 2);
    assert_eq!(people.count_documents(all()).await.unwrap(), 5);

    db.close().await.unwrap();
}
