//! Field coercion from loosely typed JSON into column values

use serde_json::Value;

use super::RawRecord;
use super::error::ExtractError;

/// Largest absolute score a `NUMERIC(3,1)` column accepts
const MAX_SCORE: f64 = 99.9;

/// True when the record carries a non-null identity
pub fn has_identity(record: &RawRecord) -> bool {
    matches!(record.get("id"), Some(value) if !value.is_null())
}

/// The `id` field as a 32-bit range integer
pub fn identity(record: &RawRecord) -> Result<i64, ExtractError> {
    match record.get("id") {
        None | Some(Value::Null) => Err(ExtractError::MissingField("id")),
        Some(value) => strict_integer("id", value),
    }
}

/// A non-negative counter; missing, null, `false` and `""` mean zero
pub fn count(record: &RawRecord, field: &'static str) -> Result<i64, ExtractError> {
    let value = match record.get(field) {
        None | Some(Value::Null) => return Ok(0),
        Some(value) => value,
    };

    let number = match value {
        Value::Bool(flag) => i64::from(*flag),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() => f.trunc() as i64,
                    _ => return Err(ExtractError::invalid(field, value, "not a finite number")),
                }
            }
        }
        Value::String(s) if s.trim().is_empty() => 0,
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ExtractError::invalid(field, value, "not an integer string"))?,
        _ => return Err(ExtractError::invalid(field, value, "not a number")),
    };

    if number < 0 {
        return Err(ExtractError::invalid(field, value, "negative count"));
    }
    fit_integer(field, value, number)
}

/// An optional integer column such as `rank`
pub fn optional_integer(
    record: &RawRecord,
    field: &'static str,
) -> Result<Option<i64>, ExtractError> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => strict_integer(field, value).map(Some),
    }
}

/// An optional decimal column such as `score`
pub fn optional_decimal(
    record: &RawRecord,
    field: &'static str,
) -> Result<Option<f64>, ExtractError> {
    let value = match record.get(field) {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };

    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
    .ok_or_else(|| ExtractError::invalid(field, value, "not a decimal number"))?;

    if number.abs() > MAX_SCORE {
        return Err(ExtractError::invalid(field, value, "out of range for NUMERIC(3,1)"));
    }
    Ok(Some(number))
}

/// An optional JSON object serialised to canonical compact text
///
/// Keys come out sorted, so equal objects always produce equal text.
pub fn optional_object(
    record: &RawRecord,
    field: &'static str,
) -> Result<Option<String>, ExtractError> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value @ Value::Object(_)) => Ok(Some(value.to_string())),
        Some(value) => Err(ExtractError::invalid(field, value, "not a JSON object")),
    }
}

/// Render the record id for log lines
pub fn display_id(record: &RawRecord) -> String {
    match record.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

fn strict_integer(field: &'static str, value: &Value) -> Result<i64, ExtractError> {
    let number = match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| ExtractError::invalid(field, value, "not an integer"))?,
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ExtractError::invalid(field, value, "not an integer string"))?,
        _ => return Err(ExtractError::invalid(field, value, "not an integer")),
    };
    fit_integer(field, value, number)
}

fn fit_integer(field: &'static str, value: &Value, number: i64) -> Result<i64, ExtractError> {
    if i32::try_from(number).is_err() {
        return Err(ExtractError::invalid(field, value, "out of range for INTEGER"));
    }
    Ok(number)
}
