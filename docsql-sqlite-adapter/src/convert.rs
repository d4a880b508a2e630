use crate::error::{SqliteAdapterError, SqliteAdapterResult};
use docsql::common::Value;
use docsql::Document;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Statement;

/// Converts bound parameters to SQLite values.
///
/// Booleans become integers, matching what `json_extract` yields for JSON
/// `true`/`false`. Sequences and documents are bound as JSON text.
pub(crate) fn to_sql_values(params: &[Value]) -> SqliteAdapterResult<Vec<SqlValue>> {
    params
        .iter()
        .enumerate()
        .map(|(index, value)| to_sql_value(index + 1, value))
        .collect()
}

fn to_sql_value(index: usize, value: &Value) -> SqliteAdapterResult<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::I64(number) => SqlValue::Integer(*number),
        Value::F64(number) => SqlValue::Real(*number),
        Value::String(text) => SqlValue::Text(text.clone()),
        Value::Array(_) => SqlValue::Text(value.to_json().to_string()),
        Value::Document(document) => {
            let json = document
                .to_json_string()
                .map_err(|err| SqliteAdapterError::Encoding {
                    index,
                    reason: err.to_string(),
                })?;
            SqlValue::Text(json)
        }
    })
}

/// Converts one column of a result row.
pub(crate) fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(number) => Value::I64(number),
        ValueRef::Real(number) => Value::F64(number),
        ValueRef::Text(text) | ValueRef::Blob(text) => {
            Value::String(String::from_utf8_lossy(text).into_owned())
        }
    }
}

/// Runs a prepared statement and collects its rows as documents keyed by
/// column name.
pub(crate) fn collect_rows(statement: &mut Statement<'_>, params: Vec<SqlValue>) -> SqliteAdapterResult<Vec<Document>> {
    let names: Vec<String> = statement
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    let mut rows = statement.query(rusqlite::params_from_iter(params))?;
    let mut documents = Vec::new();
    while let Some(row) = rows.next()? {
        let mut document = Document::new();
        for (index, name) in names.iter().enumerate() {
            document.insert(name.as_str(), from_value_ref(row.get_ref(index)?));
        }
        documents.push(document);
    }
    Ok(documents)
}
