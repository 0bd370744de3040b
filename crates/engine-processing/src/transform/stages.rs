use super::{
    error::TransformError,
    pipeline::{StageContext, Transform},
};
use model::contract::lookup::{BitConversions, BitKind, EnumTable};
use std::sync::Arc;

/// Source string to integer code. A miss falls back to the table's declared
/// default; a critical enum with nothing to fall back to fails the row.
pub struct EnumTransform {
    enum_type: String,
    table: EnumTable,
    critical: bool,
}

impl EnumTransform {
    pub fn new(enum_type: impl Into<String>, table: EnumTable, critical: bool) -> Self {
        Self {
            enum_type: enum_type.into(),
            table,
            critical,
        }
    }
}

impl Transform for EnumTransform {
    fn name(&self) -> &'static str {
        "enum"
    }

    fn apply(
        &self,
        value: Option<String>,
        _ctx: &StageContext<'_>,
    ) -> Result<Option<String>, TransformError> {
        match self.table.lookup(value.as_deref()) {
            Some(code) => Ok(Some(code.to_string())),
            None if self.critical => Err(TransformError::CriticalEnumMissing {
                enum_type: self.enum_type.clone(),
                value,
            }),
            None => Ok(None),
        }
    }
}

pub struct BitTransform {
    kind: BitKind,
    conversions: Arc<BitConversions>,
}

impl BitTransform {
    pub fn new(kind: BitKind, conversions: Arc<BitConversions>) -> Self {
        Self { kind, conversions }
    }
}

impl Transform for BitTransform {
    fn name(&self) -> &'static str {
        match self.kind {
            BitKind::Char => "char_to_bit",
            BitKind::Boolean => "boolean_to_bit",
        }
    }

    fn apply(
        &self,
        value: Option<String>,
        _ctx: &StageContext<'_>,
    ) -> Result<Option<String>, TransformError> {
        let bit = self.conversions.convert(self.kind, value.as_deref());
        Ok(Some(bit.to_string()))
    }
}

/// `numbers_only` keeps digits; `extract_numeric` also keeps the first
/// decimal point and a leading minus sign.
pub struct DigitsTransform {
    keep_sign_and_point: bool,
}

impl DigitsTransform {
    pub fn numbers_only() -> Self {
        Self {
            keep_sign_and_point: false,
        }
    }

    pub fn extract_numeric() -> Self {
        Self {
            keep_sign_and_point: true,
        }
    }
}

impl Transform for DigitsTransform {
    fn name(&self) -> &'static str {
        if self.keep_sign_and_point {
            "extract_numeric"
        } else {
            "numbers_only"
        }
    }

    fn apply(
        &self,
        value: Option<String>,
        _ctx: &StageContext<'_>,
    ) -> Result<Option<String>, TransformError> {
        let Some(raw) = value else {
            return Ok(None);
        };
        let raw = raw.trim();

        let mut out = String::with_capacity(raw.len());
        if self.keep_sign_and_point && raw.starts_with('-') {
            out.push('-');
        }
        let mut seen_point = false;
        for ch in raw.chars() {
            if ch.is_ascii_digit() {
                out.push(ch);
            } else if ch == '.' && self.keep_sign_and_point && !seen_point {
                seen_point = true;
                out.push(ch);
            }
        }

        if !out.chars().any(|c| c.is_ascii_digit()) {
            return Ok(None);
        }
        Ok(Some(out))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseOp {
    Trim,
    Upper,
    Lower,
}

pub struct CaseTransform(pub CaseOp);

impl Transform for CaseTransform {
    fn name(&self) -> &'static str {
        match self.0 {
            CaseOp::Trim => "trim",
            CaseOp::Upper => "upper",
            CaseOp::Lower => "lower",
        }
    }

    fn apply(
        &self,
        value: Option<String>,
        _ctx: &StageContext<'_>,
    ) -> Result<Option<String>, TransformError> {
        Ok(value.map(|v| match self.0 {
            CaseOp::Trim => v.trim().to_string(),
            CaseOp::Upper => v.to_uppercase(),
            CaseOp::Lower => v.to_lowercase(),
        }))
    }
}

/// Fills a missing or blank value with the document's UTC timestamp.
pub struct UtcNowDefault;

impl Transform for UtcNowDefault {
    fn name(&self) -> &'static str {
        "default_getutcdate_if_null"
    }

    fn apply(
        &self,
        value: Option<String>,
        ctx: &StageContext<'_>,
    ) -> Result<Option<String>, TransformError> {
        match value {
            Some(v) if !v.trim().is_empty() => Ok(Some(v)),
            _ => Ok(Some(
                ctx.eval.now().format("%Y-%m-%d %H:%M:%S").to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use expression_engine::{EvalContext, FunctionRegistry};

    fn run(stage: &dyn Transform, value: Option<&str>) -> Result<Option<String>, TransformError> {
        let eval = EvalContext::new(
            NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap(),
        );
        let functions = FunctionRegistry::default();
        let ctx = StageContext {
            eval: &eval,
            functions: &functions,
        };
        stage.apply(value.map(String::from), &ctx)
    }

    fn table(entries: &[(&str, i64)]) -> EnumTable {
        EnumTable(entries.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }

    #[test]
    fn test_enum_hit_default_and_miss() {
        let plain = EnumTransform::new("app_type_enum", table(&[("PRODB", 30)]), false);
        assert_eq!(run(&plain, Some("PRODB")).unwrap().as_deref(), Some("30"));
        assert_eq!(run(&plain, Some("XX")).unwrap(), None);

        let with_default =
            EnumTransform::new("decision_enum", table(&[("APPR", 1), ("", 9)]), false);
        assert_eq!(run(&with_default, Some("XX")).unwrap().as_deref(), Some("9"));
        assert_eq!(run(&with_default, None).unwrap().as_deref(), Some("9"));
    }

    #[test]
    fn test_critical_enum_miss_is_a_row_error() {
        let stage = EnumTransform::new("contact_type_enum", table(&[("PR", 281)]), true);
        let err = run(&stage, Some("SEC")).unwrap_err();
        assert_eq!(err.error_type(), crate::transform::error::ErrorType::Row);
        assert_eq!(run(&stage, Some("PR")).unwrap().as_deref(), Some("281"));
    }

    #[test]
    fn test_char_to_bit_never_yields_none() {
        let stage = BitTransform::new(BitKind::Char, Arc::new(BitConversions::default()));
        for raw in ["Y", "N", "", "null", " "] {
            let out = run(&stage, Some(raw)).unwrap();
            assert!(matches!(out.as_deref(), Some("0") | Some("1")), "{raw:?}");
        }
        assert_eq!(run(&stage, Some("Y")).unwrap().as_deref(), Some("1"));
        assert_eq!(run(&stage, None).unwrap().as_deref(), Some("0"));
    }

    #[test]
    fn test_digit_extraction() {
        let numbers = DigitsTransform::numbers_only();
        assert_eq!(run(&numbers, Some("(555) 123-4567")).unwrap().as_deref(), Some("5551234567"));
        assert_eq!(run(&numbers, Some("n/a")).unwrap(), None);

        let numeric = DigitsTransform::extract_numeric();
        assert_eq!(run(&numeric, Some("-$1,234.50")).unwrap().as_deref(), Some("-1234.50"));
        assert_eq!(run(&numeric, Some("1.2.3")).unwrap().as_deref(), Some("1.23"));
        assert_eq!(run(&numeric, Some("-")).unwrap(), None);
        assert_eq!(run(&numeric, None).unwrap(), None);
    }

    #[test]
    fn test_case_stages() {
        assert_eq!(run(&CaseTransform(CaseOp::Trim), Some("  a ")).unwrap().as_deref(), Some("a"));
        assert_eq!(run(&CaseTransform(CaseOp::Upper), Some("ab")).unwrap().as_deref(), Some("AB"));
        assert_eq!(run(&CaseTransform(CaseOp::Lower), None).unwrap(), None);
    }

    #[test]
    fn test_utc_default_only_fills_blanks() {
        assert_eq!(
            run(&UtcNowDefault, None).unwrap().as_deref(),
            Some("2024-05-01 08:30:00")
        );
        assert_eq!(
            run(&UtcNowDefault, Some(" ")).unwrap().as_deref(),
            Some("2024-05-01 08:30:00")
        );
        assert_eq!(
            run(&UtcNowDefault, Some("2020-01-01")).unwrap().as_deref(),
            Some("2020-01-01")
        );
    }
}
