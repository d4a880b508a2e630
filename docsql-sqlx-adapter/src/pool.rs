use crate::config::SqlxConfig;
use crate::error::SqlxAdapterError;
use docsql::errors::DocResult;
use std::future::Future;

/// Opens a pool with `connect`, retrying failed attempts as configured.
pub(crate) async fn connect_with_retries<P, F, Fut>(config: &SqlxConfig, connect: F) -> DocResult<P>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<P, sqlx::Error>>,
{
    let url = config.database_url()?;
    let retries = config.retries();
    let mut attempt = 0;
    loop {
        match connect(url.clone()).await {
            Ok(pool) => {
                log::debug!("Connected to {}", config.redacted_url());
                return Ok(pool);
            }
            Err(err) if attempt < retries => {
                attempt += 1;
                log::warn!(
                    "Connecting to {} failed (attempt {} of {}): {}",
                    config.redacted_url(),
                    attempt,
                    retries + 1,
                    err
                );
                tokio::time::sleep(config.delay()).await;
            }
            Err(err) => {
                log::error!("Could not connect to {}: {}", config.redacted_url(), err);
                return Err(SqlxAdapterError::Connect(err).into());
            }
        }
    }
}
