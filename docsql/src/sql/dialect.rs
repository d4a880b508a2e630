use crate::common::{Value, DOC_COLUMN, FIELD_SEPARATOR};
use crate::errors::{DocResult, DocSqlError, ErrorKind};
use itertools::Itertools;
use std::fmt::Display;

/// The SQL syntax variant of the relational engine behind an adapter.
///
/// Every piece of dialect-specific text the compilers and DDL builders emit
/// goes through the methods on this type: JSON path extraction, placeholder
/// numbering, identifier quoting and JSON object construction.
///
/// | dialect    | extraction                          | placeholders |
/// |------------|-------------------------------------|--------------|
/// | `Postgres` | `doc->>'f'`, `doc #>> '{a,b}'`       | `$1`, `$2`   |
/// | `MySql`    | `JSON_UNQUOTE(JSON_EXTRACT(doc, '$.f'))` | `?`      |
/// | `Sqlite`   | `json_extract(doc, '$.f')`          | `?`          |
///
/// Postgres and MySQL extraction yields the field's textual representation,
/// so comparisons there are textual or implicitly numeric inside the engine.
/// Postgres ordering comparisons against numbers go through `jsonb` instead,
/// so they agree with ORDER BY. SQLite returns the native JSON scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    MySql,
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Maps a dialect name to a [Dialect].
    ///
    /// Unrecognized names default to [Dialect::MySql], the form without
    /// relational path operators. Use [Dialect::parse] to reject them instead.
    pub fn from_name(name: &str) -> Dialect {
        match name.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Dialect::Postgres,
            "sqlite" | "sqlite3" => Dialect::Sqlite,
            _ => Dialect::MySql,
        }
    }

    /// Strictly parses a dialect name.
    ///
    /// # Errors
    ///
    /// Returns [ErrorKind::UnsupportedDialect] for any name other than the
    /// known spellings of `mysql`, `postgres` and `sqlite`.
    pub fn parse(name: &str) -> DocResult<Dialect> {
        match name.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            _ => {
                log::error!("Unsupported dialect '{}'", name);
                Err(DocSqlError::new(
                    &format!("Unsupported dialect '{}'", name),
                    ErrorKind::UnsupportedDialect,
                ))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Quotes an identifier (table, index or column name).
    pub fn quote_ident(&self, ident: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", ident.replace('`', "``")),
            Dialect::Postgres | Dialect::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// The placeholder for the 1-based positional parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", index),
            Dialect::MySql | Dialect::Sqlite => "?".to_string(),
        }
    }

    /// The placeholder used on the right-hand side of a comparison against
    /// [Dialect::extract].
    ///
    /// Postgres extraction yields `text`, so the parameter is cast to `text`
    /// to let typed parameters compare against it.
    pub fn comparison_placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}::text", index),
            Dialect::MySql | Dialect::Sqlite => "?".to_string(),
        }
    }

    /// Whether an ordering comparison (`<`, `<=`, `>`, `>=`) against
    /// `operand` must compare [Dialect::extract_json] with
    /// [Dialect::json_placeholder] rather than the text extraction.
    ///
    /// Postgres text extraction orders numbers lexically (`'10' < '9'`)
    /// while ORDER BY on `jsonb` orders them numerically.
    pub fn compares_as_json(&self, operand: &Value) -> bool {
        matches!(self, Dialect::Postgres) && operand.is_number()
    }

    /// The placeholder for a typed comparison against [Dialect::extract_json].
    pub fn json_placeholder(&self, index: usize, operand: &Value) -> String {
        match self {
            Dialect::Postgres => match operand {
                Value::I64(_) => format!("to_jsonb(${}::bigint)", index),
                Value::F64(_) => format!("to_jsonb(${}::float8)", index),
                Value::Bool(_) => format!("to_jsonb(${}::boolean)", index),
                _ => format!("to_jsonb(${}::text)", index),
            },
            Dialect::MySql | Dialect::Sqlite => self.placeholder(index),
        }
    }

    /// The expression projecting `field` (a dotted path) out of the blob as
    /// the value used in comparisons.
    pub fn extract(&self, field: &str) -> String {
        match self {
            Dialect::Postgres => {
                let segments = path_segments(field);
                if segments.len() == 1 {
                    format!("{}->>{}", DOC_COLUMN, sql_literal(segments[0]))
                } else {
                    format!("{} #>> {}", DOC_COLUMN, pg_path_literal(&segments))
                }
            }
            Dialect::MySql => format!(
                "JSON_UNQUOTE(JSON_EXTRACT({}, {}))",
                DOC_COLUMN,
                sql_literal(&json_path(field))
            ),
            Dialect::Sqlite => format!(
                "json_extract({}, {})",
                DOC_COLUMN,
                sql_literal(&json_path(field))
            ),
        }
    }

    /// The expression projecting `field` as a number, for aggregates.
    pub fn extract_numeric(&self, field: &str) -> String {
        match self {
            Dialect::Postgres => format!("({})::numeric", self.extract(field)),
            Dialect::MySql => format!(
                "CAST(JSON_EXTRACT({}, {}) AS DOUBLE)",
                DOC_COLUMN,
                sql_literal(&json_path(field))
            ),
            Dialect::Sqlite => self.extract(field),
        }
    }

    /// The expression projecting `field` as a typed JSON value.
    ///
    /// Used for ordering and grouping, where the engine's JSON comparison
    /// rules order numbers numerically.
    pub fn extract_json(&self, field: &str) -> String {
        match self {
            Dialect::Postgres => {
                let segments = path_segments(field);
                if segments.len() == 1 {
                    format!("{}->{}", DOC_COLUMN, sql_literal(segments[0]))
                } else {
                    format!("{} #> {}", DOC_COLUMN, pg_path_literal(&segments))
                }
            }
            Dialect::MySql => format!(
                "JSON_EXTRACT({}, {})",
                DOC_COLUMN,
                sql_literal(&json_path(field))
            ),
            Dialect::Sqlite => self.extract(field),
        }
    }

    /// Builds a JSON object expression from `(key, sql expression)` pairs.
    pub fn json_object(&self, pairs: &[(String, String)]) -> String {
        let function = match self {
            Dialect::Postgres => "jsonb_build_object",
            Dialect::MySql => "JSON_OBJECT",
            Dialect::Sqlite => "json_object",
        };

        let args = pairs
            .iter()
            .map(|(key, expr)| format!("{}, {}", sql_literal(key), expr))
            .join(", ");
        format!("{}({})", function, args)
    }

    /// The LIMIT/OFFSET tail of a statement, with both values inlined.
    ///
    /// MySQL and SQLite cannot express an OFFSET without a LIMIT, so an
    /// unbounded limit is spelled out for them. Values are capped at
    /// `i64::MAX`, the largest count Postgres and SQLite accept.
    pub fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        let cap = |count: u64| count.min(i64::MAX as u64);
        match (limit.map(cap), offset.map(cap)) {
            (None, None) => String::new(),
            (Some(limit), None) => format!(" LIMIT {}", limit),
            (Some(limit), Some(offset)) => format!(" LIMIT {} OFFSET {}", limit, offset),
            (None, Some(offset)) => match self {
                Dialect::Postgres => format!(" OFFSET {}", offset),
                Dialect::MySql => format!(" LIMIT 18446744073709551615 OFFSET {}", offset),
                Dialect::Sqlite => format!(" LIMIT -1 OFFSET {}", offset),
            },
        }
    }
}

impl Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Renders a string as a single-quoted SQL literal.
pub(crate) fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn path_segments(field: &str) -> Vec<&str> {
    field.split(FIELD_SEPARATOR).collect()
}

fn is_plain_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_index_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit())
}

/// A MySQL/SQLite JSON path (`$.a.b`, `$."odd key"`, `$.items[0]`).
pub(crate) fn json_path(field: &str) -> String {
    let mut path = String::from("$");
    for segment in path_segments(field) {
        if is_index_segment(segment) {
            path.push_str(&format!("[{}]", segment));
        } else if is_plain_segment(segment) {
            path.push('.');
            path.push_str(segment);
        } else {
            path.push_str(&format!(
                ".\"{}\"",
                segment.replace('\\', "\\\\").replace('"', "\\\"")
            ));
        }
    }
    path
}

/// A Postgres text-array path literal (`'{a,b}'`).
fn pg_path_literal(segments: &[&str]) -> String {
    let elements: Vec<String> = segments
        .iter()
        .map(|segment| {
            if is_plain_segment(segment) || is_index_segment(segment) {
                segment.to_string()
            } else {
                format!("\"{}\"", segment.replace('\\', "\\\\").replace('"', "\\\""))
            }
        })
        .collect();
    sql_literal(&format!("{{{}}}", elements.join(",")))
}
