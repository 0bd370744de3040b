use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Destination column types a contract can declare.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    VarChar,
    NVarChar,
    Char,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Bit,
    Decimal,
    Money,
    Float,
    Date,
    DateTime,
}

impl DataType {
    pub fn is_text(&self) -> bool {
        matches!(self, DataType::VarChar | DataType::NVarChar | DataType::Char)
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::TinyInt | DataType::SmallInt | DataType::Int | DataType::BigInt
        )
    }

    /// Inclusive range accepted by the integer family.
    pub fn integer_bounds(&self) -> Option<(i64, i64)> {
        match self {
            DataType::TinyInt => Some((0, 255)),
            DataType::SmallInt => Some((i16::MIN as i64, i16::MAX as i64)),
            DataType::Int => Some((i32::MIN as i64, i32::MAX as i64)),
            DataType::BigInt => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    pub fn sql_name(&self) -> &'static str {
        match self {
            DataType::VarChar => "varchar",
            DataType::NVarChar => "nvarchar",
            DataType::Char => "char",
            DataType::TinyInt => "tinyint",
            DataType::SmallInt => "smallint",
            DataType::Int => "int",
            DataType::BigInt => "bigint",
            DataType::Bit => "bit",
            DataType::Decimal => "decimal",
            DataType::Money => "money",
            DataType::Float => "float",
            DataType::Date => "date",
            DataType::DateTime => "datetime",
        }
    }
}

impl FromStr for DataType {
    type Err = String;

    /// Accepts SQL-ish spellings, ignoring any `(length)` or `(p,s)` suffix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let base = s
            .split('(')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match base.as_str() {
            "varchar" | "text" => Ok(DataType::VarChar),
            "nvarchar" | "string" | "ntext" => Ok(DataType::NVarChar),
            "char" | "nchar" => Ok(DataType::Char),
            "tinyint" => Ok(DataType::TinyInt),
            "smallint" => Ok(DataType::SmallInt),
            "int" | "integer" => Ok(DataType::Int),
            "bigint" => Ok(DataType::BigInt),
            "bit" | "boolean" | "bool" => Ok(DataType::Bit),
            "decimal" | "numeric" => Ok(DataType::Decimal),
            "money" | "smallmoney" => Ok(DataType::Money),
            "float" | "real" => Ok(DataType::Float),
            "date" => Ok(DataType::Date),
            "datetime" | "datetime2" | "smalldatetime" | "timestamp" => Ok(DataType::DateTime),
            _ => Err(format!("Unknown data type: {s}")),
        }
    }
}

impl TryFrom<String> for DataType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.sql_name().to_string()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}
