pub mod ast;
pub mod builder;
pub mod compiled;
pub mod context;
pub mod dates;
pub mod error;
pub mod eval;
pub mod functions;
pub mod parser;

pub use compiled::CompiledExpression;
pub use context::EvalContext;
pub use error::{BuildError, ExpressionError, Result};
pub use eval::Evaluator;
pub use functions::FunctionRegistry;
