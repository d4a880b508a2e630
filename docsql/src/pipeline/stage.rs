use crate::collection::Document;
use crate::common::{operator_name, OperatorPolicy, SortOrder, Value, GROUP_ID, OPERATOR_PREFIX};
use crate::errors::{DocResult, DocSqlError, ErrorKind};

/// One parsed pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Filters documents; compiled into the WHERE clause.
    Match(Document),
    /// Orders documents; compiled into ORDER BY.
    Sort(Vec<(String, SortOrder)>),
    /// Groups documents; re-targets the statement's projection.
    Group(GroupSpec),
    /// Keeps only the listed fields; applied in memory.
    Project(Vec<String>),
    /// Caps the number of results; inlined as LIMIT.
    Limit(u64),
    /// Skips leading results; inlined as OFFSET.
    Skip(u64),
    /// Flat-maps a sequence field into one document per element; applied in
    /// memory.
    Unwind(String),
}

/// The grouping key and accumulators of a `group` stage.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    /// The field whose value identifies a group, or `None` for a single
    /// group over every matched document.
    pub key: Option<String>,
    /// Named accumulators, in stage order.
    pub accumulators: Vec<(String, Accumulator)>,
}

/// An aggregate computed per group.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Sum(String),
    /// `sum` over a numeric literal: the group size times the literal.
    SumLiteral(Value),
    Avg(String),
    Min(String),
    Max(String),
    Count,
}

impl Stage {
    /// Parses one stage document.
    ///
    /// A stage document carries exactly one stage name. Under the lenient
    /// policy a document with several recognized names yields one stage per
    /// name in order, and unknown names are skipped.
    pub fn parse(stage: &Document, policy: OperatorPolicy) -> DocResult<Vec<Stage>> {
        if policy.is_strict() && stage.size() != 1 {
            log::error!("Pipeline stage must have exactly one key, found {}", stage);
            return Err(DocSqlError::new(
                &format!("Pipeline stage must have exactly one key, found {}", stage.size()),
                ErrorKind::InvalidOperation,
            ));
        }

        let mut stages = Vec::with_capacity(1);
        for (key, operand) in stage.iter() {
            let parsed = match operator_name(key) {
                "match" => parse_match(operand, policy)?,
                "sort" => parse_sort(operand, policy)?,
                "group" => parse_group(operand, policy)?,
                "project" => parse_project(operand, policy)?,
                "limit" => parse_count(key, operand, policy)?.map(Stage::Limit),
                "skip" => parse_count(key, operand, policy)?.map(Stage::Skip),
                "unwind" => parse_unwind(operand, policy)?,
                _ => {
                    policy.unknown("pipeline stage", key)?;
                    None
                }
            };

            if let Some(parsed) = parsed {
                stages.push(parsed);
            }
        }
        Ok(stages)
    }
}

fn malformed(policy: OperatorPolicy, stage: &str, operand: &Value) -> DocResult<()> {
    if policy.is_strict() {
        log::error!("Malformed '{}' stage operand {}", stage, operand);
        return Err(DocSqlError::new(
            &format!("Malformed '{}' stage operand", stage),
            ErrorKind::InvalidOperation,
        ));
    }
    log::debug!("Skipping malformed '{}' stage operand {}", stage, operand);
    Ok(())
}

/// Strips the `$` of a field reference like `"$amount"`.
fn field_ref(value: &str) -> String {
    value.strip_prefix(OPERATOR_PREFIX).unwrap_or(value).to_string()
}

fn parse_match(operand: &Value, policy: OperatorPolicy) -> DocResult<Option<Stage>> {
    match operand {
        Value::Document(filter) => Ok(Some(Stage::Match(filter.clone()))),
        other => malformed(policy, "match", other).map(|_| None),
    }
}

fn parse_sort(operand: &Value, policy: OperatorPolicy) -> DocResult<Option<Stage>> {
    let spec = match operand {
        Value::Document(spec) => spec,
        other => return malformed(policy, "sort", other).map(|_| None),
    };

    let mut fields = Vec::with_capacity(spec.size());
    for (field, direction) in spec.iter() {
        let order = match direction {
            Value::String(text) if text.eq_ignore_ascii_case("desc")
                || text.eq_ignore_ascii_case("descending") =>
            {
                SortOrder::Descending
            }
            other => match other.as_number() {
                Some(number) => SortOrder::from_direction(number),
                None => SortOrder::Ascending,
            },
        };
        fields.push((field.clone(), order));
    }
    Ok(Some(Stage::Sort(fields)))
}

fn parse_group(operand: &Value, policy: OperatorPolicy) -> DocResult<Option<Stage>> {
    let spec = match operand {
        Value::Document(spec) => spec,
        other => return malformed(policy, "group", other).map(|_| None),
    };

    let key = match spec.get(GROUP_ID) {
        Some(Value::String(field)) => Some(field_ref(field)),
        Some(Value::Null) | None => None,
        Some(other) => {
            malformed(policy, "group", other)?;
            None
        }
    };

    let mut accumulators = Vec::new();
    for (name, expression) in spec.iter().filter(|(name, _)| name.as_str() != GROUP_ID) {
        let expression = match expression {
            Value::Document(expression) => expression,
            other => {
                malformed(policy, "group", other)?;
                continue;
            }
        };

        for (op, argument) in expression.iter() {
            let accumulator = match (operator_name(op), argument) {
                ("sum", Value::String(field)) => Accumulator::Sum(field_ref(field)),
                ("sum", literal) if literal.is_number() => Accumulator::SumLiteral(literal.clone()),
                ("avg", Value::String(field)) => Accumulator::Avg(field_ref(field)),
                ("min", Value::String(field)) => Accumulator::Min(field_ref(field)),
                ("max", Value::String(field)) => Accumulator::Max(field_ref(field)),
                ("count", _) => Accumulator::Count,
                ("sum" | "avg" | "min" | "max", other) => {
                    malformed(policy, "group", other)?;
                    continue;
                }
                _ => {
                    policy.unknown("accumulator", op)?;
                    continue;
                }
            };
            accumulators.push((name.clone(), accumulator));
        }
    }

    Ok(Some(Stage::Group(GroupSpec { key, accumulators })))
}

fn parse_project(operand: &Value, policy: OperatorPolicy) -> DocResult<Option<Stage>> {
    match operand {
        Value::Document(spec) => {
            let fields = spec
                .iter()
                .filter(|(_, flag)| flag.is_truthy())
                .map(|(field, _)| field.clone())
                .collect();
            Ok(Some(Stage::Project(fields)))
        }
        other => malformed(policy, "project", other).map(|_| None),
    }
}

fn parse_count(stage: &str, operand: &Value, policy: OperatorPolicy) -> DocResult<Option<u64>> {
    let count = match operand {
        Value::I64(value) if *value >= 0 => Some(*value as u64),
        // 2^63 and above would not fit a signed BIGINT limit
        Value::F64(value) if *value >= 0.0 && value.fract() == 0.0 && *value < i64::MAX as f64 => {
            Some(*value as u64)
        }
        _ => None,
    };

    if count.is_none() {
        malformed(policy, operator_name(stage), operand)?;
    }
    Ok(count)
}

fn parse_unwind(operand: &Value, policy: OperatorPolicy) -> DocResult<Option<Stage>> {
    match operand {
        Value::String(path) => Ok(Some(Stage::Unwind(field_ref(path)))),
        Value::Document(spec) => match spec.get("path") {
            Some(Value::String(path)) => Ok(Some(Stage::Unwind(field_ref(path)))),
            _ => malformed(policy, "unwind", operand).map(|_| None),
        },
        other => malformed(policy, "unwind", other).map(|_| None),
    }
}
