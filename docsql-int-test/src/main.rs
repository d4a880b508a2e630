use docsql::common::SortOrder;
use docsql::doc;
use docsql::errors::DocResult;
use docsql::filter::{all, field};
use docsql::collection::{order_by, Document};
use docsql::DocSql;
use docsql_sqlite_adapter::{JournalMode, SqliteAdapter, SqliteConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> DocResult<()> {
    colog::init();
    println!("Starting stress test...");

    let path = std::env::temp_dir().join(format!("{}.db", uuid::Uuid::new_v4()));
    let path = path.to_string_lossy().to_string();
    let adapter = SqliteAdapter::open(
        SqliteConfig::new()
            .db_path(&path)
            .journal_mode(JournalMode::Wal),
    )?;
    let db = DocSql::builder().adapter(Arc::new(adapter)).open().await?;
    let records = db.collection("stress_records")?;

    let count = 100_000;
    let batch = 1_000;
    let start = std::time::Instant::now();
    for offset in (0..count).step_by(batch) {
        let documents: Vec<Document> = (offset..offset + batch)
            .map(|n| {
                doc!{
                    first_name: (uuid::Uuid::new_v4().to_string()),
                    last_name: (uuid::Uuid::new_v4().to_string()),
                    sequence: n,
                    processed: false,
                    failed: false,
                }
            })
            .collect();
        records.insert_many(documents).await?;
    }
    println!("Inserted {} records in {:?}", count, start.elapsed());

    let start = std::time::Instant::now();
    let pending = records.count_documents(field("processed").eq(false)).await?;
    println!("Counted {} pending records in {:?}", pending, start.elapsed());

    let start = std::time::Instant::now();
    let result = records
        .update_many(
            field("sequence").lt(1_000),
            doc!{ set: { processed: true } },
        )
        .await?;
    println!("Updated {} records in {:?}", result.modified_count, start.elapsed());

    let start = std::time::Instant::now();
    let latest = records
        .find(all(), Some(order_by("sequence", SortOrder::Descending).limit(10)))
        .await?;
    println!("Fetched {} latest records in {:?}", latest.len(), start.elapsed());

    db.close().await?;
    if let Err(e) = std::fs::remove_file(&path) {
        eprintln!("Warning: Failed to remove {}: {:?}", path, e);
    }
    Ok(())
}
