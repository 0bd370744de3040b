use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{NaiveDate, NaiveDateTime};
use model::core::value::Value;
use std::borrow::Cow;
use tiberius::{ColumnData, ToSql, numeric::Numeric};

/// Largest scale a SQL Server `decimal` accepts.
const MAX_SCALE: i64 = 37;

#[derive(Debug, Clone, PartialEq)]
pub enum MssqlParam {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Numeric),
    String(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl MssqlParam {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => MssqlParam::Null,
            Value::Boolean(v) => MssqlParam::Bool(*v),
            Value::Int(v) => MssqlParam::Int(*v),
            Value::Float(v) => MssqlParam::Float(*v),
            Value::Decimal(v) => decimal_param(v),
            Value::String(v) => MssqlParam::String(v.clone()),
            Value::Date(v) => MssqlParam::Date(*v),
            Value::Timestamp(v) => MssqlParam::Timestamp(*v),
        }
    }
}

fn decimal_param(value: &BigDecimal) -> MssqlParam {
    let (_, exponent) = value.as_bigint_and_exponent();
    let scaled = value.with_scale(exponent.clamp(0, MAX_SCALE));
    let (digits, scale) = scaled.as_bigint_and_exponent();

    match (digits.to_i128(), u8::try_from(scale)) {
        (Some(digits), Ok(scale)) => MssqlParam::Decimal(Numeric::new_with_scale(digits, scale)),
        // Out of range for decimal(38); let the server convert the float.
        _ => MssqlParam::Float(value.to_f64().unwrap_or_default()),
    }
}

impl ToSql for MssqlParam {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            MssqlParam::Null => ColumnData::I32(None),
            MssqlParam::Bool(v) => ColumnData::Bit(Some(*v)),
            MssqlParam::Int(v) => ColumnData::I64(Some(*v)),
            MssqlParam::Float(v) => ColumnData::F64(Some(*v)),
            MssqlParam::Decimal(v) => ColumnData::Numeric(Some(*v)),
            MssqlParam::String(v) => ColumnData::String(Some(Cow::Borrowed(v.as_str()))),
            MssqlParam::Date(v) => v.to_sql(),
            MssqlParam::Timestamp(v) => v.to_sql(),
        }
    }
}

/// Owns the parameters of one statement.
pub struct MssqlParamStore {
    pub params: Vec<MssqlParam>,
}

impl MssqlParamStore {
    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        Self {
            params: values.into_iter().map(MssqlParam::from_value).collect(),
        }
    }

    pub fn as_refs(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p as &dyn ToSql).collect()
    }
}
