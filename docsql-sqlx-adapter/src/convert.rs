use bigdecimal::BigDecimal;
use docsql::common::Value;

/// Maps an exact numeric column (`NUMERIC`, `DECIMAL`) to an integer when it
/// has no fractional part, and to a float otherwise.
pub(crate) fn decimal_value(decimal: &BigDecimal) -> Value {
    if decimal.is_integer() {
        if let Ok(number) = decimal.with_scale(0).to_string().parse::<i64>() {
            return Value::I64(number);
        }
    }
    match decimal.to_string().parse::<f64>() {
        Ok(number) => Value::F64(number),
        Err(_) => Value::String(decimal.to_string()),
    }
}

/// Maps an unsigned integer column, falling back to a float past `i64::MAX`.
pub(crate) fn unsigned_value(number: u64) -> Value {
    match i64::try_from(number) {
        Ok(number) => Value::I64(number),
        Err(_) => Value::F64(number as f64),
    }
}

/// The JSON text of a boolean, which is what MySQL's unquoted extraction
/// yields for `true`/`false`.
pub(crate) fn bool_text(flag: bool) -> &'static str {
    if flag {
        "true"
    } else {
        "false"
    }
}
