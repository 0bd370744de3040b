use super::{
    error::TransformError,
    pipeline::{StageContext, Transform},
};
use expression_engine::CompiledExpression;

/// Replaces the incoming value with the result of a calculated-field
/// expression evaluated against the element context.
pub struct CalculatedTransform {
    expression: CompiledExpression,
}

impl CalculatedTransform {
    pub fn new(expression: CompiledExpression) -> Self {
        Self { expression }
    }
}

impl Transform for CalculatedTransform {
    fn name(&self) -> &'static str {
        "calculated_field"
    }

    fn apply(
        &self,
        _value: Option<String>,
        ctx: &StageContext<'_>,
    ) -> Result<Option<String>, TransformError> {
        let value = self.expression.evaluate(ctx.eval, ctx.functions)?;
        Ok(value.as_text())
    }

    fn needs_context(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expression_engine::{EvalContext, ExpressionError, FunctionRegistry};

    fn calculated(src: &str) -> CalculatedTransform {
        CalculatedTransform::new(CompiledExpression::compile(src).unwrap())
    }

    #[test]
    fn test_expression_result_replaces_value() {
        let mut eval = EvalContext::default();
        eval.insert("b_months_at_job", "10");
        eval.insert("b_years_at_job", "2");
        let functions = FunctionRegistry::default();
        let ctx = StageContext {
            eval: &eval,
            functions: &functions,
        };

        let stage = calculated("b_years_at_job * 12 + b_months_at_job");
        assert_eq!(
            stage.apply(Some("ignored".into()), &ctx).unwrap().as_deref(),
            Some("34")
        );

        let unmatched = calculated("CASE WHEN b_years_at_job = '9' THEN 'x' END");
        assert_eq!(unmatched.apply(None, &ctx).unwrap(), None);
    }

    #[test]
    fn test_evaluation_error_is_reported() {
        let mut eval = EvalContext::default();
        eval.insert("a", "1");
        eval.insert("b", "0");
        let functions = FunctionRegistry::default();
        let ctx = StageContext {
            eval: &eval,
            functions: &functions,
        };

        let err = calculated("a / b").apply(None, &ctx).unwrap_err();
        assert_eq!(err, TransformError::Expression(ExpressionError::DivisionByZero));
    }
}
