use crate::{
    ast::{ArithmeticOp, CompareOp, DateUnit, Expr, WhenBranch, like::LikePattern},
    dates,
    error::BuildError,
    parser::{ExprParser, Rule},
};
use bigdecimal::BigDecimal;
use model::core::value::Value;
use pest::{Parser, error::LineColLocation, iterators::Pair};
use std::str::FromStr;

pub type BuildResult<T> = Result<T, BuildError>;

/// Parse expression text into a typed AST.
pub fn parse(input: &str) -> BuildResult<Expr> {
    let mut pairs = ExprParser::parse(Rule::program, input).map_err(|e| {
        let (line, column) = match e.line_col {
            LineColLocation::Pos(pos) => pos,
            LineColLocation::Span(start, _) => start,
        };
        BuildError {
            message: format!("Syntax error: {}", e.variant.message()),
            line,
            column,
        }
    })?;

    let program = pairs.next().ok_or_else(|| BuildError {
        message: "Empty input".to_string(),
        line: 1,
        column: 1,
    })?;

    let expression = program
        .into_inner()
        .find(|p| p.as_rule() == Rule::expression)
        .ok_or_else(|| BuildError {
            message: "Empty input".to_string(),
            line: 1,
            column: 1,
        })?;

    build_expression(expression)
}

fn build_expression(pair: Pair<Rule>) -> BuildResult<Expr> {
    match pair.as_rule() {
        Rule::expression => build_expression(first_inner(pair)?),
        Rule::or_expr => build_logical(pair, Expr::Or),
        Rule::and_expr => build_logical(pair, Expr::And),
        Rule::negation => {
            let operand = pair
                .into_inner()
                .find(|p| p.as_rule() != Rule::kw_not)
                .ok_or_else(|| BuildError {
                    message: "NOT without operand".to_string(),
                    line: 1,
                    column: 1,
                })?;
            Ok(Expr::Not(Box::new(build_expression(operand)?)))
        }
        Rule::predicate => build_predicate(pair),
        Rule::additive | Rule::multiplicative => build_arithmetic(pair),
        Rule::case_expr => build_case(pair),
        Rule::date_lit => build_date_literal(pair),
        Rule::dateadd => build_dateadd(pair),
        Rule::func_call => build_function_call(pair),
        Rule::lit_number => build_number(pair),
        Rule::lit_string => Ok(Expr::Literal(Value::String(unquote(pair.as_str())))),
        Rule::lit_null => Ok(Expr::Literal(Value::Null)),
        Rule::ident => Ok(Expr::Field(pair.as_str().to_string())),
        other => Err(error_at(&pair, format!("Unexpected {other:?}"))),
    }
}

fn build_logical(pair: Pair<Rule>, combine: fn(Vec<Expr>) -> Expr) -> BuildResult<Expr> {
    let mut operands = pair
        .into_inner()
        .filter(|p| !matches!(p.as_rule(), Rule::kw_and | Rule::kw_or))
        .map(build_expression)
        .collect::<BuildResult<Vec<_>>>()?;

    if operands.len() == 1 {
        Ok(operands.remove(0))
    } else {
        Ok(combine(operands))
    }
}

fn build_predicate(pair: Pair<Rule>) -> BuildResult<Expr> {
    let mut inner = pair.into_inner();
    let subject = build_expression(inner.next().ok_or_else(|| BuildError {
        message: "Empty predicate".to_string(),
        line: 1,
        column: 1,
    })?)?;

    let Some(check) = inner.next() else {
        return Ok(subject);
    };

    match check.as_rule() {
        Rule::is_check => {
            let negated = check.into_inner().any(|p| p.as_rule() == Rule::kw_not);
            Ok(Expr::IsEmpty {
                expr: Box::new(subject),
                negated,
            })
        }
        Rule::like_check => {
            let mut negated = false;
            let mut pattern = None;
            for p in check.clone().into_inner() {
                match p.as_rule() {
                    Rule::kw_not => negated = true,
                    Rule::lit_string => {
                        let raw = unquote(p.as_str());
                        pattern = Some(LikePattern::new(&raw).map_err(|e| {
                            error_at(&p, format!("Invalid LIKE pattern '{raw}': {e}"))
                        })?);
                    }
                    _ => {}
                }
            }
            let pattern =
                pattern.ok_or_else(|| error_at(&check, "LIKE requires a pattern".to_string()))?;
            Ok(Expr::Like {
                expr: Box::new(subject),
                pattern,
                negated,
            })
        }
        Rule::comparison => {
            let mut parts = check.clone().into_inner();
            let (Some(op), Some(rhs)) = (parts.next(), parts.next()) else {
                return Err(error_at(&check, "Incomplete comparison".to_string()));
            };
            let op = CompareOp::from_str(op.as_str()).map_err(|e| error_at(&op, e))?;
            Ok(Expr::Compare {
                left: Box::new(subject),
                op,
                right: Box::new(build_expression(rhs)?),
            })
        }
        other => Err(error_at(&check, format!("Unexpected {other:?}"))),
    }
}

/// Left-associative fold over `operand (op operand)*`.
fn build_arithmetic(pair: Pair<Rule>) -> BuildResult<Expr> {
    let mut inner = pair.clone().into_inner();
    let first = inner
        .next()
        .ok_or_else(|| error_at(&pair, "Empty arithmetic expression".to_string()))?;
    let mut acc = build_expression(first)?;

    while let Some(op) = inner.next() {
        let rhs = inner
            .next()
            .ok_or_else(|| error_at(&op, "Missing right operand".to_string()))?;
        let op_kind = ArithmeticOp::from_str(op.as_str()).map_err(|e| error_at(&op, e))?;
        acc = Expr::Arithmetic {
            left: Box::new(acc),
            op: op_kind,
            right: Box::new(build_expression(rhs)?),
        };
    }

    Ok(acc)
}

fn build_case(pair: Pair<Rule>) -> BuildResult<Expr> {
    let mut branches = Vec::new();
    let mut else_expr = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::when_clause => {
                let mut exprs = inner
                    .clone()
                    .into_inner()
                    .filter(|p| p.as_rule() == Rule::expression);
                let (Some(cond), Some(value)) = (exprs.next(), exprs.next()) else {
                    return Err(error_at(&inner, "WHEN requires a condition and a value".into()));
                };
                branches.push(WhenBranch {
                    condition: build_expression(cond)?,
                    value: build_expression(value)?,
                });
            }
            Rule::else_clause => {
                let value = inner
                    .clone()
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::expression)
                    .ok_or_else(|| error_at(&inner, "ELSE requires a value".to_string()))?;
                else_expr = Some(Box::new(build_expression(value)?));
            }
            _ => {}
        }
    }

    Ok(Expr::Case {
        branches,
        else_expr,
    })
}

fn build_date_literal(pair: Pair<Rule>) -> BuildResult<Expr> {
    let lit = pair
        .clone()
        .into_inner()
        .find(|p| p.as_rule() == Rule::lit_string)
        .ok_or_else(|| error_at(&pair, "DATE requires a string literal".to_string()))?;

    let raw = unquote(lit.as_str());
    let ts = dates::parse_datetime(&raw)
        .ok_or_else(|| error_at(&lit, format!("Invalid date literal '{raw}'")))?;
    Ok(Expr::Literal(Value::Timestamp(ts)))
}

fn build_dateadd(pair: Pair<Rule>) -> BuildResult<Expr> {
    let mut unit = None;
    let mut args = Vec::new();

    for inner in pair.clone().into_inner() {
        match inner.as_rule() {
            Rule::date_unit => {
                unit = Some(DateUnit::from_str(inner.as_str()).map_err(|e| error_at(&inner, e))?)
            }
            Rule::expression => args.push(build_expression(inner)?),
            _ => {}
        }
    }

    let (Some(unit), 2) = (unit, args.len()) else {
        return Err(error_at(&pair, "DATEADD(unit, amount, date) expected".to_string()));
    };
    let date = args.pop().map(Box::new);
    let amount = args.pop().map(Box::new);
    match (amount, date) {
        (Some(amount), Some(date)) => Ok(Expr::DateAdd { unit, amount, date }),
        _ => Err(error_at(&pair, "DATEADD(unit, amount, date) expected".to_string())),
    }
}

fn build_function_call(pair: Pair<Rule>) -> BuildResult<Expr> {
    let mut name = String::new();
    let mut args = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::func_name => name = inner.as_str().to_ascii_lowercase(),
            Rule::expression => args.push(build_expression(inner)?),
            _ => {}
        }
    }

    Ok(Expr::FunctionCall { name, args })
}

fn build_number(pair: Pair<Rule>) -> BuildResult<Expr> {
    let raw = pair.as_str();
    if !raw.contains('.') {
        if let Ok(i) = raw.parse::<i64>() {
            return Ok(Expr::Literal(Value::Int(i)));
        }
    }
    BigDecimal::from_str(raw)
        .map(|d| Expr::Literal(Value::Decimal(d)))
        .map_err(|e| error_at(&pair, format!("Invalid number '{raw}': {e}")))
}

fn first_inner(pair: Pair<Rule>) -> BuildResult<Pair<Rule>> {
    let err = error_at(&pair, "Empty expression".to_string());
    pair.into_inner().next().ok_or(err)
}

fn unquote(raw: &str) -> String {
    raw.strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(raw)
        .replace("''", "'")
}

fn error_at(pair: &Pair<Rule>, message: String) -> BuildError {
    let (line, column) = pair.line_col();
    BuildError {
        message,
        line,
        column,
    }
}
