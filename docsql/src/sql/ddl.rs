//! DDL statement builders for collection tables and their indexes.

use crate::common::{DOC_COLUMN, ROW_ID_COLUMN};
use crate::errors::{DocResult, DocSqlError, ErrorKind};
use crate::index::IndexSpec;
use crate::sql::Dialect;

/// Checks a collection or index name before it is quoted into DDL.
///
/// # Errors
///
/// Returns [ErrorKind::InvalidName] for empty names, names with control
/// characters and names longer than 63 bytes (the shortest identifier limit
/// among the supported engines).
pub fn validate_name(kind: &str, name: &str) -> DocResult<()> {
    if name.trim().is_empty() {
        log::error!("{} name cannot be empty", kind);
        return Err(DocSqlError::new(
            &format!("{} name cannot be empty", kind),
            ErrorKind::InvalidName,
        ));
    }

    if name.chars().any(|c| c.is_control()) {
        log::error!("{} name '{}' contains control characters", kind, name.escape_debug());
        return Err(DocSqlError::new(
            &format!("{} name contains control characters", kind),
            ErrorKind::InvalidName,
        ));
    }

    if name.len() > 63 {
        log::error!("{} name '{}' is longer than 63 bytes", kind, name);
        return Err(DocSqlError::new(
            &format!("{} name '{}' is longer than 63 bytes", kind, name),
            ErrorKind::InvalidName,
        ));
    }
    Ok(())
}

/// `CREATE TABLE IF NOT EXISTS` with the two-column collection layout.
pub fn create_table(dialect: Dialect, table: &str) -> String {
    let table = dialect.quote_ident(table);
    match dialect {
        Dialect::Postgres => format!(
            "CREATE TABLE IF NOT EXISTS {} ({} BIGSERIAL PRIMARY KEY, {} JSONB NOT NULL)",
            table, ROW_ID_COLUMN, DOC_COLUMN
        ),
        Dialect::MySql => format!(
            "CREATE TABLE IF NOT EXISTS {} ({} BIGINT AUTO_INCREMENT PRIMARY KEY, {} JSON NOT NULL)",
            table, ROW_ID_COLUMN, DOC_COLUMN
        ),
        Dialect::Sqlite => format!(
            "CREATE TABLE IF NOT EXISTS {} ({} INTEGER PRIMARY KEY AUTOINCREMENT, {} TEXT NOT NULL)",
            table, ROW_ID_COLUMN, DOC_COLUMN
        ),
    }
}

pub fn drop_table(dialect: Dialect, table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", dialect.quote_ident(table))
}

/// Lists the user tables, one `name` column per row.
pub fn list_tables(dialect: Dialect) -> String {
    match dialect {
        Dialect::Postgres => "SELECT tablename AS name FROM pg_catalog.pg_tables \
             WHERE schemaname = current_schema() ORDER BY tablename"
            .to_string(),
        Dialect::MySql => "SELECT table_name AS name FROM information_schema.tables \
             WHERE table_schema = DATABASE() ORDER BY table_name"
            .to_string(),
        Dialect::Sqlite => "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
            .to_string(),
    }
}

/// Builds the expression index statement for `spec` on `table`.
///
/// MySQL cannot index unbounded text, so its key parts cast the extracted
/// value to a bounded `CHAR`.
pub fn create_index(dialect: Dialect, table: &str, spec: &IndexSpec) -> String {
    let index_name = dialect.quote_ident(&spec.index_name(table));
    let unique = if spec.is_unique() { "UNIQUE " } else { "" };
    let key_parts: Vec<String> = spec
        .fields()
        .iter()
        .map(|(field, order)| match dialect {
            Dialect::MySql => format!(
                "(CAST({} AS CHAR(255)) COLLATE utf8mb4_bin) {}",
                dialect.extract(field),
                order.as_sql()
            ),
            _ => format!("({}) {}", dialect.extract(field), order.as_sql()),
        })
        .collect();

    match dialect {
        Dialect::MySql => format!(
            "CREATE {}INDEX {} ON {} ({})",
            unique,
            index_name,
            dialect.quote_ident(table),
            key_parts.join(", ")
        ),
        Dialect::Postgres | Dialect::Sqlite => format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            unique,
            index_name,
            dialect.quote_ident(table),
            key_parts.join(", ")
        ),
    }
}

pub fn drop_index(dialect: Dialect, table: &str, index_name: &str) -> String {
    match dialect {
        Dialect::MySql => format!(
            "DROP INDEX {} ON {}",
            dialect.quote_ident(index_name),
            dialect.quote_ident(table)
        ),
        Dialect::Postgres | Dialect::Sqlite => {
            format!("DROP INDEX IF EXISTS {}", dialect.quote_ident(index_name))
        }
    }
}

/// Lists the indexes of the table bound to the first parameter, as
/// `name` and `definition` columns.
pub fn list_indexes(dialect: Dialect) -> String {
    match dialect {
        Dialect::Postgres => "SELECT indexname AS name, indexdef AS definition FROM pg_indexes \
             WHERE schemaname = current_schema() AND tablename = $1 ORDER BY indexname"
            .to_string(),
        Dialect::MySql => "SELECT index_name AS name, \
             GROUP_CONCAT(COALESCE(column_name, expression) ORDER BY seq_in_index) AS definition \
             FROM information_schema.statistics \
             WHERE table_schema = DATABASE() AND table_name = ? \
             GROUP BY index_name ORDER BY index_name"
            .to_string(),
        Dialect::Sqlite => "SELECT name, sql AS definition FROM sqlite_master \
             WHERE type = 'index' AND tbl_name = ? ORDER BY name"
            .to_string(),
    }
}

pub fn create_savepoint(dialect: Dialect, name: &str) -> String {
    format!("SAVEPOINT {}", dialect.quote_ident(name))
}

pub fn release_savepoint(dialect: Dialect, name: &str) -> String {
    format!("RELEASE SAVEPOINT {}", dialect.quote_ident(name))
}

pub fn rollback_to_savepoint(dialect: Dialect, name: &str) -> String {
    format!("ROLLBACK TO SAVEPOINT {}", dialect.quote_ident(name))
}
