use crate::{
    context::EvalContext,
    error::{ExpressionError, Result},
};
use model::core::value::Value;

fn single_text(function: &str, args: &[Value]) -> Result<Option<String>> {
    match args {
        [v] => Ok(v.as_text()),
        _ => Err(ExpressionError::InvalidFunctionArgs {
            function: function.to_string(),
            message: format!("Expected 1 argument, got {}", args.len()),
        }),
    }
}

/// Convert string to lowercase
pub fn eval_lower(args: &[Value], _ctx: &EvalContext) -> Result<Value> {
    Ok(single_text("lower", args)?
        .map(|s| Value::String(s.to_lowercase()))
        .unwrap_or(Value::Null))
}

/// Convert string to uppercase
pub fn eval_upper(args: &[Value], _ctx: &EvalContext) -> Result<Value> {
    Ok(single_text("upper", args)?
        .map(|s| Value::String(s.to_uppercase()))
        .unwrap_or(Value::Null))
}

pub fn eval_trim(args: &[Value], _ctx: &EvalContext) -> Result<Value> {
    Ok(single_text("trim", args)?
        .map(|s| Value::String(s.trim().to_string()))
        .unwrap_or(Value::Null))
}

/// Character count, ignoring trailing spaces as SQL Server does.
pub fn eval_len(args: &[Value], _ctx: &EvalContext) -> Result<Value> {
    Ok(single_text("len", args)?
        .map(|s| Value::Int(s.trim_end().chars().count() as i64))
        .unwrap_or(Value::Null))
}

/// Concatenate values into a string; nulls contribute nothing.
pub fn eval_concat(args: &[Value], _ctx: &EvalContext) -> Result<Value> {
    Ok(Value::String(
        args.iter().filter_map(Value::as_text).collect::<Vec<_>>().join(""),
    ))
}
