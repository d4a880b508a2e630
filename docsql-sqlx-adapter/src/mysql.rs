use crate::config::SqlxConfig;
use crate::convert::{bool_text, decimal_value, unsigned_value};
use crate::error::{SqlxAdapterError, SqlxAdapterResult};
use crate::pool::connect_with_retries;
use crate::session::{self, SqlxSession};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use docsql::common::Value;
use docsql::errors::DocResult;
use docsql::store::DocumentStoreAdapter;
use docsql::transaction::{downcast_connection, Session};
use docsql::{Dialect, Document};
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{Column, MySql, Row, TypeInfo};
use std::sync::Arc;

type MySqlQuery<'q> = Query<'q, MySql, MySqlArguments>;

/// A pooled MySQL [DocumentStoreAdapter].
///
/// Collections are tables with an `AUTO_INCREMENT` row id and a `JSON`
/// document column. Extracted fields are unquoted text, so booleans are
/// bound as the text `true`/`false` to compare equal to them.
///
/// DDL statements commit implicitly on MySQL, including the lazy table
/// creation a first write inside a session may trigger.
#[derive(Clone)]
pub struct MySqlAdapter {
    inner: Arc<MySqlAdapterInner>,
}

struct MySqlAdapterInner {
    pool: MySqlPool,
}

impl MySqlAdapter {
    /// Opens a connection pool, retrying the first connection as configured.
    pub async fn connect(config: SqlxConfig) -> DocResult<MySqlAdapter> {
        let options = MySqlPoolOptions::new()
            .max_connections(config.pool_size())
            .acquire_timeout(config.acquire_wait());

        let pool = connect_with_retries(&config, |url| {
            let options = options.clone();
            async move { options.connect(&url).await }
        })
        .await?;
        Ok(MySqlAdapter::with_pool(pool))
    }

    /// Wraps a pool the application already manages.
    pub fn with_pool(pool: MySqlPool) -> MySqlAdapter {
        MySqlAdapter {
            inner: Arc::new(MySqlAdapterInner { pool }),
        }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.inner.pool
    }
}

fn bind_params<'q>(sql: &'q str, params: &[Value]) -> MySqlQuery<'q> {
    params
        .iter()
        .fold(sqlx::query(sql), |query, value| bind_value(query, value))
}

fn bind_value<'q>(query: MySqlQuery<'q>, value: &Value) -> MySqlQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(flag) => query.bind(bool_text(*flag)),
        Value::I64(number) => query.bind(*number),
        Value::F64(number) => query.bind(*number),
        Value::String(text) => query.bind(text.clone()),
        Value::Array(_) | Value::Document(_) => query.bind(Json(value.to_json())),
    }
}

fn decode_row(row: &MySqlRow) -> SqlxAdapterResult<Document> {
    let mut document = Document::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.type_info().name()).map_err(|err| {
            SqlxAdapterError::Decode {
                column: column.name().to_string(),
                reason: err.to_string(),
            }
        })?;
        document.insert(column.name(), value);
    }
    Ok(document)
}

fn decode_column(row: &MySqlRow, index: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    Ok(match type_name {
        "NULL" => Value::Null,
        "BOOLEAN" => Value::from_option(row.try_get::<Option<bool>, _>(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            Value::from_option(row.try_get::<Option<i64>, _>(index)?)
        }
        name if name.ends_with("UNSIGNED") => row
            .try_get::<Option<u64>, _>(index)?
            .map(unsigned_value)
            .unwrap_or(Value::Null),
        "FLOAT" => Value::from_option(row.try_get::<Option<f32>, _>(index)?),
        "DOUBLE" => Value::from_option(row.try_get::<Option<f64>, _>(index)?),
        "DECIMAL" => row
            .try_get::<Option<BigDecimal>, _>(index)?
            .map(|decimal| decimal_value(&decimal))
            .unwrap_or(Value::Null),
        "JSON" => row
            .try_get::<Option<Json<serde_json::Value>>, _>(index)?
            .map(|json| Value::from(json.0))
            .unwrap_or(Value::Null),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)?
            .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            .unwrap_or(Value::Null),
        _ => Value::from_option(row.try_get::<Option<String>, _>(index)?),
    })
}

#[async_trait]
impl DocumentStoreAdapter for MySqlAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn query(&self, sql: &str, params: &[Value], session: Option<&Session>) -> DocResult<Vec<Document>> {
        log::debug!("MySQL query: {} {:?}", sql, params);
        let query = bind_params(sql, params);
        let rows = match session {
            Some(session) => {
                session.ensure_active()?;
                let mut slot = session.connection().await;
                let transaction = downcast_connection::<SqlxSession<MySql>>(&mut slot)?.transaction_mut()?;
                query
                    .fetch_all(&mut **transaction)
                    .await
                    .map_err(SqlxAdapterError::Statement)?
            }
            None => query
                .fetch_all(&self.inner.pool)
                .await
                .map_err(SqlxAdapterError::Statement)?,
        };

        Ok(rows.iter().map(decode_row).collect::<SqlxAdapterResult<Vec<_>>>()?)
    }

    async fn execute(&self, sql: &str, params: &[Value], session: Option<&Session>) -> DocResult<u64> {
        log::debug!("MySQL execute: {} {:?}", sql, params);
        let query = bind_params(sql, params);
        let result = match session {
            Some(session) => {
                session.ensure_active()?;
                let mut slot = session.connection().await;
                let transaction = downcast_connection::<SqlxSession<MySql>>(&mut slot)?.transaction_mut()?;
                query
                    .execute(&mut **transaction)
                    .await
                    .map_err(SqlxAdapterError::Statement)?
            }
            None => query
                .execute(&self.inner.pool)
                .await
                .map_err(SqlxAdapterError::Statement)?,
        };
        Ok(result.rows_affected())
    }

    async fn start_session(&self) -> DocResult<Session> {
        session::begin(&self.inner.pool).await
    }

    async fn commit(&self, session: &Session) -> DocResult<()> {
        session::finish::<MySql>(session, true).await
    }

    async fn rollback(&self, session: &Session) -> DocResult<()> {
        session::finish::<MySql>(session, false).await
    }

    async fn release(&self, session: &Session) -> DocResult<()> {
        session::release::<MySql>(session).await
    }

    async fn close(&self) -> DocResult<()> {
        if !self.inner.pool.is_closed() {
            log::debug!("Closing MySQL pool");
            self.inner.pool.close().await;
        }
        Ok(())
    }
}
