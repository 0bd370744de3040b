use crate::{
    ast::Expr,
    builder,
    context::EvalContext,
    error::{ExpressionError, Result},
    eval::Evaluator,
    functions::FunctionRegistry,
};
use model::core::value::Value;

/// A parsed, checked expression ready to evaluate many times.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    source: String,
    ast: Expr,
}

impl CompiledExpression {
    /// Parses `source` and verifies every called function exists.
    pub fn compile(source: &str) -> Result<Self> {
        let ast = builder::parse(source)?;

        let registry = FunctionRegistry::default();
        if let Some(unknown) = ast.functions().into_iter().find(|f| !registry.has_function(f)) {
            return Err(ExpressionError::UnknownFunction(unknown.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    pub fn evaluate(&self, ctx: &EvalContext, functions: &FunctionRegistry) -> Result<Value> {
        self.ast.evaluate(ctx, functions)
    }
}
