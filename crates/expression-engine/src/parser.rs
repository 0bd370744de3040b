use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "grammar/expr.pest"]
pub struct ExprParser;
