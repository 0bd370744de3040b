use crate::{
    ast::{ArithmeticOp, CompareOp},
    dates,
    error::{ExpressionError, Result},
};
use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use chrono::NaiveDateTime;
use model::core::value::Value;
use std::{cmp::Ordering, str::FromStr};
use tracing::trace;

/// Comparison of two evaluated operands.
///
/// Blank operands and operands that cannot be brought to a common type make
/// every operator false.
pub(crate) struct ComparisonEvaluator<'a> {
    left: &'a Value,
    right: &'a Value,
    op: CompareOp,
}

impl<'a> ComparisonEvaluator<'a> {
    pub fn new(left: &'a Value, right: &'a Value, op: CompareOp) -> Self {
        Self { left, right, op }
    }

    pub fn evaluate(&self) -> bool {
        if self.left.is_blank() || self.right.is_blank() {
            return false;
        }

        match self.ordering() {
            Some(ord) => match self.op {
                CompareOp::Equal => ord == Ordering::Equal,
                CompareOp::NotEqual => ord != Ordering::Equal,
                CompareOp::Less => ord == Ordering::Less,
                CompareOp::LessOrEqual => ord != Ordering::Greater,
                CompareOp::Greater => ord == Ordering::Greater,
                CompareOp::GreaterOrEqual => ord != Ordering::Less,
            },
            None => {
                trace!(
                    left = %self.left,
                    right = %self.right,
                    op = %self.op,
                    "Operands not comparable"
                );
                false
            }
        }
    }

    fn ordering(&self) -> Option<Ordering> {
        use Value::*;

        match (self.left, self.right) {
            (Date(_) | Timestamp(_), _) | (_, Date(_) | Timestamp(_)) => {
                let l = as_datetime(self.left)?;
                let r = as_datetime(self.right)?;
                Some(l.cmp(&r))
            }
            (String(l), String(r)) => match (numeric(l), numeric(r)) {
                (Some(l), Some(r)) => Some(l.cmp(&r)),
                _ => Some(l.as_str().cmp(r.as_str())),
            },
            (String(_), Int(_) | Float(_) | Decimal(_))
            | (Int(_) | Float(_) | Decimal(_), String(_))
            | (Int(_) | Float(_) | Decimal(_), Int(_) | Float(_) | Decimal(_)) => {
                let l = self.left.as_decimal()?;
                let r = self.right.as_decimal()?;
                Some(l.cmp(&r))
            }
            _ => self.left.compare(self.right),
        }
    }
}

fn numeric(raw: &str) -> Option<BigDecimal> {
    BigDecimal::from_str(raw.trim()).ok()
}

pub(crate) fn as_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Timestamp(ts) => Some(*ts),
        Value::Date(d) => d.and_hms_opt(0, 0, 0),
        Value::String(s) => dates::parse_datetime(s),
        _ => None,
    }
}

/// `+ - * /` over operands coerced to decimals. Blank operands yield `Null`;
/// whole results come back as `Int`.
pub(crate) fn arithmetic(left: &Value, op: ArithmeticOp, right: &Value) -> Result<Value> {
    if left.is_blank() || right.is_blank() {
        return Ok(Value::Null);
    }

    let l = to_number(left)?;
    let r = to_number(right)?;

    let result = match op {
        ArithmeticOp::Add => l + r,
        ArithmeticOp::Subtract => l - r,
        ArithmeticOp::Multiply => l * r,
        ArithmeticOp::Divide => {
            if r.is_zero() {
                return Err(ExpressionError::DivisionByZero);
            }
            (l / r).round(10)
        }
    };

    let result = result.normalized();
    if result.is_integer() {
        if let Some(i) = result.to_i64() {
            return Ok(Value::Int(i));
        }
    }
    Ok(Value::Decimal(result))
}

fn to_number(value: &Value) -> Result<BigDecimal> {
    value
        .as_decimal()
        .ok_or_else(|| ExpressionError::TypeMismatch {
            expected: "number".to_string(),
            actual: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(l: Value, op: CompareOp, r: Value) -> bool {
        ComparisonEvaluator::new(&l, &r, op).evaluate()
    }

    #[test]
    fn missing_operands_never_compare() {
        for op in [
            CompareOp::Equal,
            CompareOp::NotEqual,
            CompareOp::Less,
            CompareOp::GreaterOrEqual,
        ] {
            assert!(!cmp(Value::Null, op, Value::from("x")));
            assert!(!cmp(Value::from("  "), op, Value::Int(1)));
        }
    }

    #[test]
    fn numeric_strings_compare_as_numbers() {
        assert!(cmp(Value::from("10"), CompareOp::Greater, Value::from("9")));
        assert!(cmp(Value::from("10"), CompareOp::Equal, Value::Int(10)));
        assert!(cmp(Value::from("10.50"), CompareOp::Equal, Value::from("10.5")));
        assert!(!cmp(Value::from("abc"), CompareOp::Equal, Value::Int(10)));
    }

    #[test]
    fn text_comparison_is_case_sensitive() {
        assert!(cmp(Value::from("PR"), CompareOp::Equal, Value::from("PR")));
        assert!(!cmp(Value::from("pr"), CompareOp::Equal, Value::from("PR")));
        assert!(cmp(Value::from("pr"), CompareOp::NotEqual, Value::from("PR")));
    }

    #[test]
    fn dates_parse_before_comparing() {
        let cutoff = Value::Timestamp(dates::parse_datetime("2023-10-11").unwrap());
        assert!(cmp(Value::from("2023-10-12 08:00:00"), CompareOp::Greater, cutoff.clone()));
        assert!(!cmp(Value::from("garbage"), CompareOp::Greater, cutoff.clone()));
        assert!(!cmp(Value::from("garbage"), CompareOp::NotEqual, cutoff));
    }

    #[test]
    fn arithmetic_results() {
        let r = arithmetic(&Value::from("2"), ArithmeticOp::Multiply, &Value::Int(12)).unwrap();
        assert_eq!(r, Value::Int(24));
        let r = arithmetic(&Value::Int(1), ArithmeticOp::Divide, &Value::Int(4)).unwrap();
        assert_eq!(r, Value::Decimal(BigDecimal::from_str("0.25").unwrap()));
        assert_eq!(
            arithmetic(&Value::Null, ArithmeticOp::Add, &Value::Int(1)).unwrap(),
            Value::Null
        );
        assert_eq!(
            arithmetic(&Value::Int(1), ArithmeticOp::Divide, &Value::from("0")),
            Err(ExpressionError::DivisionByZero)
        );
        assert!(matches!(
            arithmetic(&Value::from("x"), ArithmeticOp::Add, &Value::Int(1)),
            Err(ExpressionError::TypeMismatch { .. })
        ));
    }
}
