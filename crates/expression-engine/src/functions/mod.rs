pub mod string;

use crate::{
    context::EvalContext,
    error::{ExpressionError, Result},
};
use model::core::value::Value;
use std::collections::HashMap;

/// Type alias for function implementations
pub type FunctionImpl = fn(&[Value], &EvalContext) -> Result<Value>;

/// Registry of scalar functions callable from expressions
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionImpl>,
}

impl FunctionRegistry {
    /// Create a new function registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };

        registry.register("lower", string::eval_lower);
        registry.register("upper", string::eval_upper);
        registry.register("trim", string::eval_trim);
        registry.register("len", string::eval_len);
        registry.register("concat", string::eval_concat);
        registry.register("coalesce", eval_coalesce);
        registry.register("getdate", eval_now);
        registry.register("getutcdate", eval_now);

        registry
    }

    pub fn register(&mut self, name: &str, func: FunctionImpl) {
        self.functions.insert(name.to_lowercase(), func);
    }

    pub fn call(&self, name: &str, args: &[Value], ctx: &EvalContext) -> Result<Value> {
        let func = self
            .functions
            .get(&name.to_lowercase())
            .ok_or_else(|| ExpressionError::UnknownFunction(name.to_string()))?;

        func(args, ctx)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_lowercase())
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// First argument that is not blank.
fn eval_coalesce(args: &[Value], _ctx: &EvalContext) -> Result<Value> {
    Ok(args
        .iter()
        .find(|v| !v.is_blank())
        .cloned()
        .unwrap_or(Value::Null))
}

fn eval_now(args: &[Value], ctx: &EvalContext) -> Result<Value> {
    if !args.is_empty() {
        return Err(ExpressionError::InvalidFunctionArgs {
            function: "getdate".to_string(),
            message: format!("Expected 0 arguments, got {}", args.len()),
        });
    }
    Ok(Value::Timestamp(ctx.now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_registry_case_insensitive() {
        let registry = FunctionRegistry::new();
        assert!(registry.has_function("GETUTCDATE"));
        assert!(registry.has_function("Lower"));
        assert!(!registry.has_function("env"));
    }

    #[test]
    fn test_now_uses_context_clock() {
        let now = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let ctx = EvalContext::new(now);
        let registry = FunctionRegistry::new();
        assert_eq!(registry.call("getdate", &[], &ctx).unwrap(), Value::Timestamp(now));
        assert!(registry.call("getdate", &[Value::Int(1)], &ctx).is_err());
    }

    #[test]
    fn test_coalesce_skips_blanks() {
        let ctx = EvalContext::default();
        let registry = FunctionRegistry::new();
        let args = [Value::Null, Value::from("  "), Value::from("x")];
        assert_eq!(registry.call("coalesce", &args, &ctx).unwrap(), Value::from("x"));
    }

    #[test]
    fn test_unknown_function() {
        let registry = FunctionRegistry::new();
        let result = registry.call("unknown_func", &[], &EvalContext::default());
        assert!(matches!(result, Err(ExpressionError::UnknownFunction(_))));
    }
}
