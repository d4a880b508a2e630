//! Update specifications and their application to document snapshots.
//!
//! An update specification maps mutation operators to per-field operands:
//!
//! ```rust
//! use docsql::doc;
//! use docsql::update::apply;
//!
//! let snapshot = doc!{ name: "Alice", visits: 1, tags: ["a"] };
//! let updated = apply(&snapshot, &doc!{
//!     "$inc": { visits: 1 },
//!     push: { tags: "b" },
//!     set: { name: "Alicia" }
//! });
//! assert_eq!(updated, doc!{ name: "Alicia", visits: 2, tags: ["a", "b"] });
//! ```
//!
//! Operators always run in the order `set`, `inc`, `push`, `pull`, `unset`,
//! whatever their order in the specification. Field names are literal
//! top-level keys. Applying an update is not idempotent: applying an `inc`
//! twice increments twice.

use crate::collection::Document;
use crate::common::{operator_name, OperatorPolicy, Value};
use crate::errors::{DocResult, DocSqlError, ErrorKind};

const SET: &str = "set";
const INC: &str = "inc";
const PUSH: &str = "push";
const PULL: &str = "pull";
const UNSET: &str = "unset";

/// The fixed application order.
const OPERATOR_ORDER: [&str; 5] = [SET, INC, PUSH, PULL, UNSET];

/// Applies an update specification leniently: unknown operators and
/// malformed operands are skipped.
pub fn apply(document: &Document, update: &Document) -> Document {
    match apply_with_policy(document, update, OperatorPolicy::Lenient) {
        Ok(updated) => updated,
        // the lenient policy never raises
        Err(_) => document.clone(),
    }
}

/// Applies an update specification to a snapshot, producing the full
/// replacement document.
///
/// # Errors
///
/// Under [OperatorPolicy::Strict], returns [ErrorKind::UnsupportedOperator]
/// for unknown operators and [ErrorKind::InvalidOperation] for operands that
/// are not mappings or increments that are not numbers.
pub fn apply_with_policy(
    document: &Document,
    update: &Document,
    policy: OperatorPolicy,
) -> DocResult<Document> {
    let mut operands: [Option<Document>; 5] = Default::default();

    for (key, operand) in update.iter() {
        let name = operator_name(key);
        let position = match OPERATOR_ORDER.iter().position(|op| *op == name) {
            Some(position) => position,
            None => {
                policy.unknown("update operator", key)?;
                continue;
            }
        };

        match operand {
            Value::Document(fields) => operands[position] = Some(fields.clone()),
            Value::Array(names) if name == UNSET => {
                // unset also accepts a list of field names
                let mut fields = Document::new();
                for field in names.iter().filter_map(|it| it.as_str()) {
                    fields.insert(field, Value::Bool(true));
                }
                operands[position] = Some(fields);
            }
            other => invalid_operand(policy, key, other)?,
        }
    }

    let mut updated = document.clone();
    for (position, operand) in operands.iter().enumerate() {
        if let Some(fields) = operand {
            match OPERATOR_ORDER[position] {
                SET => apply_set(&mut updated, fields),
                INC => apply_inc(&mut updated, fields, policy)?,
                PUSH => apply_push(&mut updated, fields),
                PULL => apply_pull(&mut updated, fields),
                _ => apply_unset(&mut updated, fields),
            }
        }
    }
    Ok(updated)
}

/// Checks whether a document contains at least one update operator.
pub fn has_operators(update: &Document) -> bool {
    update
        .keys()
        .any(|key| OPERATOR_ORDER.contains(&operator_name(key)))
}

fn invalid_operand(policy: OperatorPolicy, key: &str, operand: &Value) -> DocResult<()> {
    if policy.is_strict() {
        log::error!("Update operator '{}' expects a mapping, found {}", key, operand);
        return Err(DocSqlError::new(
            &format!("Update operator '{}' expects a mapping of fields", key),
            ErrorKind::InvalidOperation,
        ));
    }
    log::debug!("Skipping update operator '{}' with non-mapping operand {}", key, operand);
    Ok(())
}

fn apply_set(document: &mut Document, fields: &Document) {
    document.merge(fields);
}

fn apply_inc(document: &mut Document, fields: &Document, policy: OperatorPolicy) -> DocResult<()> {
    for (field, amount) in fields.iter() {
        if !amount.is_number() {
            if policy.is_strict() {
                log::error!("Cannot increment '{}' by non-numeric {}", field, amount);
                return Err(DocSqlError::new(
                    &format!("Cannot increment '{}' by a non-numeric value", field),
                    ErrorKind::InvalidOperation,
                ));
            }
            log::warn!("Skipping increment of '{}' by non-numeric {}", field, amount);
            continue;
        }

        let current = match document.get_mut(field) {
            Some(existing) if existing.is_number() => existing.take(),
            Some(existing) => {
                log::warn!("Field '{}' holds non-numeric {}, incrementing from 0", field, existing);
                Value::I64(0)
            }
            None => Value::I64(0),
        };

        let sum = current.checked_add(amount).unwrap_or_else(|| amount.clone());
        document.insert(field.clone(), sum);
    }
    Ok(())
}

fn apply_push(document: &mut Document, fields: &Document) {
    for (field, element) in fields.iter() {
        match document.get_mut(field) {
            Some(Value::Array(items)) => items.push(element.clone()),
            _ => {
                document.insert(field.clone(), Value::Array(vec![element.clone()]));
            }
        }
    }
}

fn apply_pull(document: &mut Document, fields: &Document) {
    for (field, element) in fields.iter() {
        if let Some(Value::Array(items)) = document.get_mut(field) {
            items.retain(|item| item != element);
        }
    }
}

// top-level like every other operator, so "a.b" names a literal key
fn apply_unset(document: &mut Document, fields: &Document) {
    for field in fields.keys() {
        document.remove_key(field);
    }
}
