use super::error::TransformError;
use bigdecimal::{BigDecimal, ToPrimitive};
use expression_engine::dates::{parse_date, parse_datetime};
use model::{core::data_type::DataType, Value};
use std::str::FromStr;

/// Converts a chain's textual output into the column's declared type.
///
/// Blank input yields `Ok(None)`. Text is trimmed and cut to `data_length`
/// characters.
pub fn coerce(
    raw: &str,
    data_type: DataType,
    data_length: Option<usize>,
) -> Result<Option<Value>, TransformError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let invalid = || TransformError::Coercion {
        value: raw.to_string(),
        data_type,
    };

    let value = match data_type {
        DataType::VarChar | DataType::NVarChar | DataType::Char => {
            Value::String(truncate(raw, data_length))
        }
        DataType::TinyInt | DataType::SmallInt | DataType::Int | DataType::BigInt => {
            let n = parse_integer(raw).ok_or_else(invalid)?;
            if let Some((min, max)) = data_type.integer_bounds() {
                if n < min || n > max {
                    return Err(TransformError::OutOfRange {
                        value: raw.to_string(),
                        data_type,
                    });
                }
            }
            Value::Int(n)
        }
        DataType::Bit => Value::Boolean(parse_bit(raw).ok_or_else(invalid)?),
        DataType::Decimal | DataType::Money => {
            Value::Decimal(BigDecimal::from_str(&strip_money(raw)).map_err(|_| invalid())?)
        }
        DataType::Float => Value::Float(strip_money(raw).parse().map_err(|_| invalid())?),
        DataType::Date => Value::Date(parse_date(raw).ok_or_else(invalid)?),
        DataType::DateTime => Value::Timestamp(parse_datetime(raw).ok_or_else(invalid)?),
    };

    Ok(Some(value))
}

fn truncate(raw: &str, data_length: Option<usize>) -> String {
    match data_length {
        Some(len) if raw.chars().count() > len => raw.chars().take(len).collect(),
        _ => raw.to_string(),
    }
}

/// Integers, or decimals without a fractional part (`"12.00"`).
fn parse_integer(raw: &str) -> Option<i64> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    let decimal = BigDecimal::from_str(raw).ok()?;
    if decimal.is_integer() {
        decimal.to_i64()
    } else {
        None
    }
}

fn parse_bit(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "y" | "yes" => Some(true),
        "0" | "false" | "n" | "no" => Some(false),
        _ => None,
    }
}

fn strip_money(raw: &str) -> String {
    raw.chars().filter(|c| *c != '$' && *c != ',').collect()
}
