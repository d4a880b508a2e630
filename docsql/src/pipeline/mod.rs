//! Aggregation pipelines.
//!
//! A pipeline is an ordered list of stage documents. `match`, `sort`,
//! `limit` and `skip` compile into the clauses of a single SQL statement; a
//! `group` stage replaces the statement's projection with one JSON object per
//! group; `project` and `unwind` run in memory over the decoded rows, in
//! pipeline order, whether or not the pipeline groups.
//!
//! ```rust
//! use docsql::doc;
//! use docsql::pipeline::compile;
//! use docsql::sql::Dialect;
//!
//! let plan = compile(
//!     "people",
//!     &[doc!{ match: { age: { gt: 20 } } }, doc!{ sort: { age: (-1) } }, doc!{ limit: 2 }],
//!     Dialect::Sqlite,
//! );
//! assert_eq!(
//!     plan.sql,
//!     "SELECT id, doc FROM \"people\" WHERE (json_extract(doc, '$.age') > ?) \
//!      ORDER BY json_extract(doc, '$.age') DESC LIMIT 2"
//! );
//! ```

mod plan;
mod stage;

pub use plan::*;
pub use stage::*;

use crate::collection::Document;
use crate::common::{OperatorPolicy, SortOrder, Value, DOC_COLUMN, GROUP_ID, ROW_ID_COLUMN};
use crate::errors::DocResult;
use crate::filter::PredicateCompiler;
use crate::sql::Dialect;
use itertools::Itertools;

/// Compiles a pipeline leniently.
pub fn compile(collection: &str, pipeline: &[Document], dialect: Dialect) -> ExecutionPlan {
    match compile_with_policy(collection, pipeline, dialect, OperatorPolicy::Lenient) {
        Ok(plan) => plan,
        // the lenient policy never raises
        Err(_) => ExecutionPlan {
            sql: select_documents(dialect, collection, "", &[], None, None),
            params: vec![],
            shape: ResultShape::Documents,
            post_stages: vec![],
        },
    }
}

/// Compiles a pipeline into an [ExecutionPlan] in a single pass over the
/// stages.
///
/// Match stages are AND-ed, sort stages accumulate ORDER BY keys, the last
/// limit and skip win, and only the first group stage is honored.
pub fn compile_with_policy(
    collection: &str,
    pipeline: &[Document],
    dialect: Dialect,
    policy: OperatorPolicy,
) -> DocResult<ExecutionPlan> {
    let mut predicates = PredicateCompiler::new(dialect, policy);
    let mut where_clauses = Vec::new();
    let mut order = Vec::new();
    let mut limit = None;
    let mut skip = None;
    let mut group: Option<GroupSpec> = None;
    let mut post_stages = Vec::new();

    for stage_document in pipeline {
        for stage in Stage::parse(stage_document, policy)? {
            match stage {
                Stage::Match(filter) => {
                    let clause = predicates.compile_filter(&filter)?;
                    if !clause.is_empty() {
                        where_clauses.push(clause);
                    }
                }
                Stage::Sort(fields) => order.extend(fields),
                Stage::Limit(value) => limit = Some(value),
                Stage::Skip(value) => skip = Some(value),
                Stage::Group(spec) => {
                    if group.is_none() {
                        group = Some(spec);
                    } else {
                        log::debug!("Ignoring additional group stage in pipeline on '{}'", collection);
                    }
                }
                Stage::Project(fields) => post_stages.push(PostStage::Project(fields)),
                Stage::Unwind(path) => post_stages.push(PostStage::Unwind(path)),
            }
        }
    }

    let where_clause = match where_clauses.len() {
        0 => String::new(),
        1 => where_clauses.remove(0),
        _ => where_clauses
            .iter()
            .map(|clause| format!("({})", clause))
            .join(" AND "),
    };

    let (sql, shape) = match &group {
        None => (
            select_documents(dialect, collection, &where_clause, &order, limit, skip),
            ResultShape::Documents,
        ),
        Some(spec) => (
            select_groups(dialect, collection, &where_clause, spec, &order, limit, skip),
            ResultShape::Grouped,
        ),
    };

    log::debug!("Compiled pipeline on '{}' into {}", collection, sql);
    Ok(ExecutionPlan {
        sql,
        params: predicates.into_params(),
        shape,
        post_stages,
    })
}

/// Builds the raw-document SELECT shared by pipelines and finds.
pub(crate) fn select_documents(
    dialect: Dialect,
    collection: &str,
    where_clause: &str,
    order: &[(String, SortOrder)],
    limit: Option<u64>,
    skip: Option<u64>,
) -> String {
    let mut sql = format!(
        "SELECT {}, {} FROM {}",
        ROW_ID_COLUMN,
        DOC_COLUMN,
        dialect.quote_ident(collection)
    );

    if !where_clause.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(where_clause);
    }

    if !order.is_empty() {
        let keys: Vec<String> = order
            .iter()
            .map(|(field, direction)| format!("{} {}", dialect.extract_json(field), direction.as_sql()))
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&keys.join(", "));
    }

    sql.push_str(&dialect.limit_offset(limit, skip));
    sql
}

fn accumulator_sql(dialect: Dialect, accumulator: &Accumulator) -> String {
    match accumulator {
        Accumulator::Sum(field) => format!("SUM({})", dialect.extract_numeric(field)),
        Accumulator::SumLiteral(literal) => match literal {
            Value::I64(1) => "COUNT(*)".to_string(),
            other => format!("COUNT(*) * {}", other),
        },
        Accumulator::Avg(field) => format!("AVG({})", dialect.extract_numeric(field)),
        Accumulator::Min(field) => format!("MIN({})", dialect.extract_numeric(field)),
        Accumulator::Max(field) => format!("MAX({})", dialect.extract_numeric(field)),
        Accumulator::Count => "COUNT(*)".to_string(),
    }
}

/// Builds the grouped SELECT. Sort keys address the grouped output: `_id` or
/// an accumulator name.
fn select_groups(
    dialect: Dialect,
    collection: &str,
    where_clause: &str,
    spec: &GroupSpec,
    order: &[(String, SortOrder)],
    limit: Option<u64>,
    skip: Option<u64>,
) -> String {
    let key_expression = match &spec.key {
        Some(field) => dialect.extract_json(field),
        None => "NULL".to_string(),
    };

    let mut pairs = vec![(GROUP_ID.to_string(), key_expression.clone())];
    for (name, accumulator) in &spec.accumulators {
        pairs.push((name.clone(), accumulator_sql(dialect, accumulator)));
    }

    let mut sql = format!(
        "SELECT {} AS {} FROM {}",
        dialect.json_object(&pairs),
        DOC_COLUMN,
        dialect.quote_ident(collection)
    );

    if !where_clause.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(where_clause);
    }

    if spec.key.is_some() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&key_expression);
    }

    let keys: Vec<String> = order
        .iter()
        .filter_map(|(field, direction)| {
            let expression = if field == GROUP_ID {
                Some(key_expression.clone())
            } else {
                spec.accumulators
                    .iter()
                    .find(|(name, _)| name == field)
                    .map(|(_, accumulator)| accumulator_sql(dialect, accumulator))
            };

            match expression {
                Some(expression) => Some(format!("{} {}", expression, direction.as_sql())),
                None => {
                    log::debug!("Ignoring sort on '{}' which is not part of the grouped output", field);
                    None
                }
            }
        })
        .collect();

    if !keys.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&keys.join(", "));
    }

    sql.push_str(&dialect.limit_offset(limit, skip));
    sql
}
