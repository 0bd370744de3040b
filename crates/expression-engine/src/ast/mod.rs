pub mod like;

use like::LikePattern;
use model::core::value::Value;
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),

    /// Dotted attribute reference, resolved against the evaluation context.
    Field(String),

    Case {
        branches: Vec<WhenBranch>,
        else_expr: Option<Box<Expr>>,
    },

    DateAdd {
        unit: DateUnit,
        amount: Box<Expr>,
        date: Box<Expr>,
    },

    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },

    Arithmetic {
        left: Box<Expr>,
        op: ArithmeticOp,
        right: Box<Expr>,
    },

    Compare {
        left: Box<Expr>,
        op: CompareOp,
        right: Box<Expr>,
    },

    /// `IS [NOT] EMPTY` and `IS [NOT] NULL`; both treat blank text as empty.
    IsEmpty {
        expr: Box<Expr>,
        negated: bool,
    },

    Like {
        expr: Box<Expr>,
        pattern: LikePattern,
        negated: bool,
    },

    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhenBranch {
    pub condition: Expr,
    pub value: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateUnit {
    Day,
    Month,
    Year,
    Hour,
    Minute,
}

impl FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" | "==" => Ok(CompareOp::Equal),
            "!=" | "<>" => Ok(CompareOp::NotEqual),
            "<" => Ok(CompareOp::Less),
            "<=" => Ok(CompareOp::LessOrEqual),
            ">" => Ok(CompareOp::Greater),
            ">=" => Ok(CompareOp::GreaterOrEqual),
            other => Err(format!("unknown comparison operator '{other}'")),
        }
    }
}

impl FromStr for ArithmeticOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(ArithmeticOp::Add),
            "-" => Ok(ArithmeticOp::Subtract),
            "*" => Ok(ArithmeticOp::Multiply),
            "/" => Ok(ArithmeticOp::Divide),
            other => Err(format!("unknown arithmetic operator '{other}'")),
        }
    }
}

impl FromStr for DateUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" | "dd" => Ok(DateUnit::Day),
            "month" | "mm" => Ok(DateUnit::Month),
            "year" | "yyyy" | "yy" => Ok(DateUnit::Year),
            "hour" | "hh" => Ok(DateUnit::Hour),
            "minute" | "mi" => Ok(DateUnit::Minute),
            other => Err(format!("unknown date unit '{other}'")),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Equal => "=",
            CompareOp::NotEqual => "<>",
            CompareOp::Less => "<",
            CompareOp::LessOrEqual => "<=",
            CompareOp::Greater => ">",
            CompareOp::GreaterOrEqual => ">=",
        };
        f.write_str(s)
    }
}

impl Expr {
    /// Names of all function calls in the tree.
    pub fn functions(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.walk(&mut |e| {
            if let Expr::FunctionCall { name, .. } = e {
                out.push(name.as_str());
            }
        });
        out
    }

    fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        f(self);
        match self {
            Expr::Literal(_) | Expr::Field(_) => {}
            Expr::Case {
                branches,
                else_expr,
            } => {
                for b in branches {
                    b.condition.walk(f);
                    b.value.walk(f);
                }
                if let Some(e) = else_expr {
                    e.walk(f);
                }
            }
            Expr::DateAdd { amount, date, .. } => {
                amount.walk(f);
                date.walk(f);
            }
            Expr::FunctionCall { args, .. } | Expr::And(args) | Expr::Or(args) => {
                for a in args {
                    a.walk(f);
                }
            }
            Expr::Arithmetic { left, right, .. } | Expr::Compare { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            Expr::IsEmpty { expr, .. } | Expr::Like { expr, .. } | Expr::Not(expr) => {
                expr.walk(f)
            }
        }
    }
}
