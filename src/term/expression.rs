//! Textual front-end for terms
//!
//! Parses expressions such as `(x - 2)^2 + sin(y) / 3` into an AST and lowers
//! them into [`Term`]s against a scope that resolves names to [`Variable`]s.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0, one_of},
    combinator::{map, opt, recognize},
    error::ParseError,
    multi::{many0, separated_list0},
    number::complete::double,
    sequence::{delimited, pair, preceded},
    IResult, Parser,
};
use std::collections::HashMap;
use thiserror::Error;

use super::{functions, Term, Variable};

/// Error that can occur during expression parsing or lowering
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Failed to parse expression: {message}")]
    ParseError { message: String },

    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Undefined function: {name}")]
    UndefinedFunction { name: String },
}

type ExprResult<T> = Result<T, ExpressionError>;

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Constant number
    Number(f64),

    /// Variable reference
    Variable(String),

    /// Unary operations
    Unary(UnaryOp, Box<Expression>),

    /// Binary operations
    Binary(BinaryOp, Box<Expression>, Box<Expression>),

    /// Function call
    Function(String, Vec<Expression>),
}

/// Unary operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    /// Negation (-)
    Neg,
}

/// Binary operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    /// Addition (+)
    Add,

    /// Subtraction (-)
    Sub,

    /// Multiplication (*)
    Mul,

    /// Division (/)
    Div,

    /// Power (^)
    Pow,
}

/// Resolves names in an expression to variables.
pub trait VariableScope {
    fn lookup(&self, name: &str) -> Option<Variable>;
}

impl VariableScope for HashMap<String, Variable> {
    fn lookup(&self, name: &str) -> Option<Variable> {
        self.get(name).cloned()
    }
}

impl VariableScope for [Variable] {
    /// Looks a variable up by its display name.
    fn lookup(&self, name: &str) -> Option<Variable> {
        self.iter().find(|var| var.name() == Some(name)).cloned()
    }
}

impl Expression {
    /// Parse an expression from a string
    pub fn parse(input: &str) -> ExprResult<Self> {
        match additive(input.trim()) {
            Ok((remainder, expr)) => {
                if remainder.trim().is_empty() {
                    Ok(expr)
                } else {
                    Err(ExpressionError::ParseError {
                        message: format!("Unexpected trailing characters: '{}'", remainder),
                    })
                }
            }
            Err(e) => Err(ExpressionError::ParseError {
                message: format!("{:?}", e),
            }),
        }
    }

    /// Parse an expression and lower it in one go.
    pub fn parse_term<S: VariableScope + ?Sized>(input: &str, scope: &S) -> ExprResult<Term> {
        Self::parse(input)?.to_term(scope)
    }

    /// Lower the expression into a term, resolving names through `scope`.
    ///
    /// `a ^ n` with an integer literal `n` becomes a constant power; any other
    /// exponent becomes a term power.
    pub fn to_term<S: VariableScope + ?Sized>(&self, scope: &S) -> ExprResult<Term> {
        match self {
            Self::Number(n) => Ok(Term::constant(*n)),

            Self::Variable(name) => scope
                .lookup(name)
                .map(Term::from)
                .ok_or_else(|| ExpressionError::UndefinedVariable { name: name.clone() }),

            Self::Unary(UnaryOp::Neg, expr) => Ok(-expr.to_term(scope)?),

            Self::Binary(op, left, right) => {
                let lhs = left.to_term(scope)?;
                if let (BinaryOp::Pow, Self::Number(n)) = (op, right.as_ref()) {
                    if n.fract() == 0.0 && n.abs() <= f64::from(i32::MAX) {
                        return Ok(lhs.powi(*n as i32));
                    }
                }
                let rhs = right.to_term(scope)?;
                Ok(match op {
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Sub => lhs - rhs,
                    BinaryOp::Mul => lhs * rhs,
                    BinaryOp::Div => lhs / rhs,
                    BinaryOp::Pow => lhs.pow(rhs),
                })
            }

            Self::Function(name, args) => {
                let mut lowered = Vec::with_capacity(args.len());
                for arg in args {
                    lowered.push(arg.to_term(scope)?);
                }
                call(name, lowered)
            }
        }
    }

    /// Find all variable names used in the expression
    pub fn variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort();
        vars.dedup();
        vars
    }

    fn collect_variables(&self, vars: &mut Vec<String>) {
        match self {
            Self::Number(_) => {}
            Self::Variable(name) => vars.push(name.clone()),
            Self::Unary(_, expr) => expr.collect_variables(vars),
            Self::Binary(_, left, right) => {
                left.collect_variables(vars);
                right.collect_variables(vars);
            }
            Self::Function(_, args) => {
                for arg in args {
                    arg.collect_variables(vars);
                }
            }
        }
    }
}

fn arity(name: &str, args: &[Term], expected: usize) -> ExprResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ExpressionError::InvalidOperation {
            message: format!(
                "{}() requires {} argument{}, got {}",
                name,
                expected,
                if expected == 1 { "" } else { "s" },
                args.len()
            ),
        })
    }
}

fn call(name: &str, mut args: Vec<Term>) -> ExprResult<Term> {
    match name {
        "sin" | "cos" | "tan" | "sqrt" | "abs" | "exp" | "log" | "ln" => {
            arity(name, &args, 1)?;
            let arg = args.remove(0);
            Ok(match name {
                "sin" => functions::sin(arg),
                "cos" => functions::cos(arg),
                "tan" => functions::tan(arg),
                "sqrt" => functions::sqrt(arg),
                "abs" => functions::abs(arg),
                "exp" => arg.exp(),
                _ => arg.ln(),
            })
        }
        "atan2" => {
            arity(name, &args, 2)?;
            let x = args.remove(1);
            let y = args.remove(0);
            Ok(functions::atan2(y, x))
        }
        "max" | "min" => {
            if args.len() < 2 {
                return Err(ExpressionError::InvalidOperation {
                    message: format!("{}() requires at least 2 arguments, got {}", name, args.len()),
                });
            }
            Ok(if name == "max" {
                functions::max(args)
            } else {
                functions::min(args)
            })
        }
        _ => Err(ExpressionError::UndefinedFunction {
            name: name.to_string(),
        }),
    }
}

// Parser functions using nom

/// Wrap a parser so that it skips surrounding whitespace
fn ws<'a, O, E, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    E: ParseError<&'a str>,
    F: Parser<&'a str, Output = O, Error = E>,
{
    delimited(multispace0, inner, multispace0)
}

/// Parse an identifier (variable or function name)
fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_")))),
        )),
        str::to_string,
    )
    .parse(input)
}

/// Parse a function call with zero or more comma separated arguments
fn function_call(input: &str) -> IResult<&str, Expression> {
    let (input, name) = identifier(input)?;
    let (input, args) = delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), additive),
        ws(char(')')),
    )
    .parse(input)?;
    Ok((input, Expression::Function(name, args)))
}

fn number(input: &str) -> IResult<&str, Expression> {
    map(double, Expression::Number).parse(input)
}

fn variable(input: &str) -> IResult<&str, Expression> {
    map(identifier, Expression::Variable).parse(input)
}

fn parens(input: &str) -> IResult<&str, Expression> {
    delimited(ws(char('(')), additive, ws(char(')'))).parse(input)
}

/// Parse a primary expression (function call, variable, number, or parenthesized expression)
fn primary(input: &str) -> IResult<&str, Expression> {
    alt((function_call, variable, number, parens)).parse(input)
}

/// Parse a power expression; `^` is right associative and binds tighter than unary minus
fn power(input: &str) -> IResult<&str, Expression> {
    let (input, base) = primary(input)?;
    let (input, exponent) = opt(preceded(ws(char('^')), unary)).parse(input)?;
    Ok(match exponent {
        Some(exponent) => (
            input,
            Expression::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)),
        ),
        None => (input, base),
    })
}

/// Parse a unary expression (-expr)
fn unary(input: &str) -> IResult<&str, Expression> {
    let negated = preceded(ws(char('-')), unary).parse(input);
    match negated {
        Ok((input, expr)) => Ok((input, Expression::Unary(UnaryOp::Neg, Box::new(expr)))),
        Err(_) => power(input),
    }
}

/// Parse a multiplicative expression (expr * expr, expr / expr), left associative
fn multiplicative(input: &str) -> IResult<&str, Expression> {
    let (input, first) = unary(input)?;
    let (input, rest) = many0(pair(ws(one_of("*/")), unary)).parse(input)?;
    Ok((input, fold_binary(first, rest)))
}

/// Parse an additive expression (expr + expr, expr - expr), left associative
fn additive(input: &str) -> IResult<&str, Expression> {
    let (input, first) = multiplicative(input)?;
    let (input, rest) = many0(pair(ws(one_of("+-")), multiplicative)).parse(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn fold_binary(first: Expression, rest: Vec<(char, Expression)>) -> Expression {
    rest.into_iter().fold(first, |left, (op, right)| {
        let op = match op {
            '+' => BinaryOp::Add,
            '-' => BinaryOp::Sub,
            '*' => BinaryOp::Mul,
            _ => BinaryOp::Div,
        };
        Expression::Binary(op, Box::new(left), Box::new(right))
    })
}
