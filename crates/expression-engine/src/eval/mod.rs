pub(crate) mod binary;

use crate::{
    ast::Expr,
    context::EvalContext,
    dates,
    error::{ExpressionError, Result},
    functions::FunctionRegistry,
};
use binary::{ComparisonEvaluator, arithmetic, as_datetime};
use model::core::value::Value;

/// Evaluates an expression tree against an attribute context.
pub trait Evaluator {
    fn evaluate(&self, ctx: &EvalContext, functions: &FunctionRegistry) -> Result<Value>;

    /// Evaluates as a predicate; `Null` and non-boolean text are false.
    fn evaluate_condition(&self, ctx: &EvalContext, functions: &FunctionRegistry) -> Result<bool> {
        Ok(truthy(&self.evaluate(ctx, functions)?))
    }
}

impl Evaluator for Expr {
    fn evaluate(&self, ctx: &EvalContext, functions: &FunctionRegistry) -> Result<Value> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),

            Expr::Field(name) => Ok(match ctx.get(name) {
                Some(raw) if !raw.trim().is_empty() => Value::String(raw.to_string()),
                _ => Value::Null,
            }),

            Expr::Case {
                branches,
                else_expr,
            } => {
                for branch in branches {
                    if branch.condition.evaluate_condition(ctx, functions)? {
                        return branch.value.evaluate(ctx, functions);
                    }
                }
                match else_expr {
                    Some(e) => e.evaluate(ctx, functions),
                    None => Ok(Value::Null),
                }
            }

            Expr::DateAdd { unit, amount, date } => {
                let amount = amount.evaluate(ctx, functions)?;
                let date = date.evaluate(ctx, functions)?;
                let (Some(n), Some(base)) = (amount.as_i64(), as_datetime(&date)) else {
                    return Ok(Value::Null);
                };
                dates::add(base, *unit, n)
                    .map(Value::Timestamp)
                    .ok_or_else(|| ExpressionError::Overflow("DATEADD".to_string()))
            }

            Expr::FunctionCall { name, args } => {
                let args = args
                    .iter()
                    .map(|a| a.evaluate(ctx, functions))
                    .collect::<Result<Vec<_>>>()?;
                functions.call(name, &args, ctx)
            }

            Expr::Arithmetic { left, op, right } => {
                let l = left.evaluate(ctx, functions)?;
                let r = right.evaluate(ctx, functions)?;
                arithmetic(&l, *op, &r)
            }

            Expr::Compare { left, op, right } => {
                let l = left.evaluate(ctx, functions)?;
                let r = right.evaluate(ctx, functions)?;
                Ok(Value::Boolean(ComparisonEvaluator::new(&l, &r, *op).evaluate()))
            }

            Expr::IsEmpty { expr, negated } => {
                let blank = expr.evaluate(ctx, functions)?.is_blank();
                Ok(Value::Boolean(blank != *negated))
            }

            Expr::Like {
                expr,
                pattern,
                negated,
            } => {
                let value = expr.evaluate(ctx, functions)?;
                let matched = match value.as_text() {
                    Some(text) if !value.is_blank() => pattern.is_match(&text) != *negated,
                    _ => false,
                };
                Ok(Value::Boolean(matched))
            }

            Expr::Not(inner) => Ok(Value::Boolean(!inner.evaluate_condition(ctx, functions)?)),

            Expr::And(parts) => {
                for p in parts {
                    if !p.evaluate_condition(ctx, functions)? {
                        return Ok(Value::Boolean(false));
                    }
                }
                Ok(Value::Boolean(true))
            }

            Expr::Or(parts) => {
                for p in parts {
                    if p.evaluate_condition(ctx, functions)? {
                        return Ok(Value::Boolean(true));
                    }
                }
                Ok(Value::Boolean(false))
            }
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Boolean(b) => *b,
        Value::Null => false,
        other => other.as_bool().unwrap_or(false),
    }
}
