use crate::collection::Document;
use crate::common::{operator_name, OperatorPolicy, Value};
use crate::errors::DocResult;
use crate::sql::Dialect;

const ALWAYS_TRUE: &str = "(1 = 1)";
const ALWAYS_FALSE: &str = "(1 = 0)";

/// A compiled filter: a WHERE clause fragment and its positional parameters.
///
/// The parameters are in exactly the order their placeholders appear in
/// `clause`. An empty `clause` means the filter matches every row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledPredicate {
    pub clause: String,
    pub params: Vec<Value>,
}

impl CompiledPredicate {
    pub fn is_empty(&self) -> bool {
        self.clause.is_empty()
    }

    /// The clause prefixed with ` WHERE `, or nothing for an empty filter.
    pub fn where_clause(&self) -> String {
        if self.clause.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clause)
        }
    }
}

/// Compiles a filter leniently: unknown operators and combinators are
/// skipped, so this never fails.
///
/// # Examples
///
/// ```rust
/// use docsql::doc;
/// use docsql::filter::compile;
/// use docsql::sql::Dialect;
///
/// let compiled = compile(&doc!{ age: { gte: 18, lte: 65 } }, Dialect::Postgres);
/// assert_eq!(
///     compiled.clause,
///     "(doc->'age' >= to_jsonb($1::bigint)) AND (doc->'age' <= to_jsonb($2::bigint))"
/// );
/// assert_eq!(compiled.params.len(), 2);
/// ```
pub fn compile(filter: &Document, dialect: Dialect) -> CompiledPredicate {
    let mut compiler = PredicateCompiler::new(dialect, OperatorPolicy::Lenient);
    match compiler.compile_filter(filter) {
        Ok(clause) => CompiledPredicate {
            clause,
            params: compiler.into_params(),
        },
        // the lenient policy never raises
        Err(_) => CompiledPredicate::default(),
    }
}

/// Compiles a filter under the given operator policy.
///
/// # Errors
///
/// Under [OperatorPolicy::Strict], returns
/// [ErrorKind::UnsupportedOperator](crate::errors::ErrorKind::UnsupportedOperator)
/// for the first unknown operator or combinator.
pub fn compile_with_policy(
    filter: &Document,
    dialect: Dialect,
    policy: OperatorPolicy,
) -> DocResult<CompiledPredicate> {
    let mut compiler = PredicateCompiler::new(dialect, policy);
    let clause = compiler.compile_filter(filter)?;
    Ok(CompiledPredicate {
        clause,
        params: compiler.into_params(),
    })
}

/// Walks filter documents depth-first, appending parameters in placeholder
/// order.
///
/// Several filters can be compiled through one compiler; their parameters
/// share one numbering, which is how the pipeline compiler AND-s match
/// stages together.
pub(crate) struct PredicateCompiler {
    dialect: Dialect,
    policy: OperatorPolicy,
    params: Vec<Value>,
}

impl PredicateCompiler {
    pub(crate) fn new(dialect: Dialect, policy: OperatorPolicy) -> Self {
        PredicateCompiler {
            dialect,
            policy,
            params: Vec::new(),
        }
    }

    pub(crate) fn into_params(self) -> Vec<Value> {
        self.params
    }

    /// Compiles one filter document. Entries are AND-ed.
    pub(crate) fn compile_filter(&mut self, filter: &Document) -> DocResult<String> {
        let mut clauses = Vec::new();
        for (key, value) in filter.iter() {
            let clause = match (operator_name(key), value) {
                ("and", Value::Array(items)) => self.compile_junction(items, "AND")?,
                ("or", Value::Array(items)) => self.compile_junction(items, "OR")?,
                ("nor", Value::Array(items)) => {
                    let clause = self.compile_junction(items, "OR")?;
                    if clause.is_empty() {
                        clause
                    } else {
                        format!("NOT ({})", clause)
                    }
                }
                ("not", Value::Document(nested)) => {
                    let clause = self.compile_filter(nested)?;
                    format!("NOT ({})", or_true(clause))
                }
                ("not", Value::Array(items)) => {
                    let clause = self.compile_junction(items, "AND")?;
                    format!("NOT ({})", or_true(clause))
                }
                (_, _) if key.starts_with('$') => {
                    self.policy.unknown("combinator", key)?;
                    String::new()
                }
                (_, Value::Document(operators)) => self.compile_operators(key, operators)?,
                (_, scalar) => self.compile_equality(key, scalar),
            };

            if !clause.is_empty() {
                clauses.push(clause);
            }
        }
        Ok(clauses.join(" AND "))
    }

    fn compile_junction(&mut self, items: &[Value], joiner: &str) -> DocResult<String> {
        if items.is_empty() {
            // an empty disjunction matches nothing, an empty conjunction everything
            return Ok(if joiner == "OR" {
                ALWAYS_FALSE.to_string()
            } else {
                String::new()
            });
        }

        let mut clauses = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::Document(nested) => {
                    let clause = self.compile_filter(nested)?;
                    clauses.push(format!("({})", or_true(clause)));
                }
                other => {
                    self.policy
                        .unknown("combinator operand", &other.to_string())?;
                }
            }
        }

        if clauses.is_empty() {
            return Ok(String::new());
        }
        Ok(clauses.join(&format!(" {} ", joiner)))
    }

    fn compile_operators(&mut self, field: &str, operators: &Document) -> DocResult<String> {
        let mut clauses = Vec::new();
        for (op, operand) in operators.iter() {
            let clause = match operator_name(op) {
                "eq" => self.compile_equality(field, operand),
                "ne" => self.compile_not_equal(field, operand),
                "gt" => self.compile_comparison(field, ">", operand),
                "gte" => self.compile_comparison(field, ">=", operand),
                "lt" => self.compile_comparison(field, "<", operand),
                "lte" => self.compile_comparison(field, "<=", operand),
                "in" => self.compile_in(field, operand),
                "nin" => self.compile_not_in(field, operand),
                "exists" => self.compile_exists(field, operand),
                "not" => {
                    let inner = match operand {
                        Value::Document(nested) => self.compile_operators(field, nested)?,
                        scalar => self.compile_equality(field, scalar),
                    };
                    format!("NOT ({})", or_true(inner))
                }
                _ => {
                    self.policy.unknown("operator", op)?;
                    String::new()
                }
            };

            if !clause.is_empty() {
                clauses.push(clause);
            }
        }
        Ok(clauses.join(" AND "))
    }

    fn compile_equality(&mut self, field: &str, operand: &Value) -> String {
        if operand.is_null() {
            return format!("({} IS NULL)", self.dialect.extract(field));
        }
        self.compile_comparison(field, "=", operand)
    }

    fn compile_not_equal(&mut self, field: &str, operand: &Value) -> String {
        let expr = self.dialect.extract(field);
        if operand.is_null() {
            return format!("({} IS NOT NULL)", expr);
        }

        let placeholder = self.push_param(operand.clone());
        format!("({} IS NULL OR {} <> {})", expr, expr, placeholder)
    }

    fn compile_comparison(&mut self, field: &str, op: &str, operand: &Value) -> String {
        if op != "=" && self.dialect.compares_as_json(operand) {
            let expr = self.dialect.extract_json(field);
            self.params.push(operand.clone());
            let placeholder = self.dialect.json_placeholder(self.params.len(), operand);
            return format!("({} {} {})", expr, op, placeholder);
        }

        let expr = self.dialect.extract(field);
        let placeholder = self.push_param(operand.clone());
        format!("({} {} {})", expr, op, placeholder)
    }

    fn compile_in(&mut self, field: &str, operand: &Value) -> String {
        let (values, has_null) = split_null(operand);
        let expr = self.dialect.extract(field);
        match (values.is_empty(), has_null) {
            (true, false) => ALWAYS_FALSE.to_string(),
            (true, true) => format!("({} IS NULL)", expr),
            (false, has_null) => {
                let placeholders = self.push_params(values);
                if has_null {
                    format!("({} IS NULL OR {} IN ({}))", expr, expr, placeholders)
                } else {
                    format!("({} IN ({}))", expr, placeholders)
                }
            }
        }
    }

    fn compile_not_in(&mut self, field: &str, operand: &Value) -> String {
        let (values, has_null) = split_null(operand);
        let expr = self.dialect.extract(field);
        match (values.is_empty(), has_null) {
            (true, false) => ALWAYS_TRUE.to_string(),
            (true, true) => format!("({} IS NOT NULL)", expr),
            (false, has_null) => {
                let placeholders = self.push_params(values);
                if has_null {
                    format!("({} IS NOT NULL AND {} NOT IN ({}))", expr, expr, placeholders)
                } else {
                    format!("({} IS NULL OR {} NOT IN ({}))", expr, expr, placeholders)
                }
            }
        }
    }

    fn compile_exists(&mut self, field: &str, operand: &Value) -> String {
        let expr = self.dialect.extract(field);
        if operand.is_truthy() {
            format!("({} IS NOT NULL)", expr)
        } else {
            format!("({} IS NULL)", expr)
        }
    }

    fn push_param(&mut self, value: Value) -> String {
        self.params.push(value);
        self.dialect.comparison_placeholder(self.params.len())
    }

    fn push_params(&mut self, values: Vec<Value>) -> String {
        let placeholders: Vec<String> = values
            .into_iter()
            .map(|value| self.push_param(value))
            .collect();
        placeholders.join(", ")
    }
}

/// Splits a membership operand into its non-null elements and whether it
/// listed null. A scalar operand is a one-element list.
fn split_null(operand: &Value) -> (Vec<Value>, bool) {
    let items = match operand {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    };
    let has_null = items.iter().any(|item| item.is_null());
    let values = items.into_iter().filter(|item| !item.is_null()).collect();
    (values, has_null)
}

fn or_true(clause: String) -> String {
    if clause.is_empty() {
        ALWAYS_TRUE.to_string()
    } else {
        clause
    }
}
