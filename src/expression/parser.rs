//! Expression Parser
//!
//! Parses arithmetic over column names into an [`Expr`].
//!
//! # Grammar
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := '-'* atom
//! atom   := number | identifier | '(' expr ')'
//! ```
//!
//! Identifiers start with a letter or `_`; numbers are decimal with an
//! optional fraction and exponent.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit1, multispace0, one_of},
    combinator::{map, map_res, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, tuple},
    IResult,
};

use super::ast::{BinaryOp, Expr};
use super::error::{ExpressionError, ExpressionResult};

/// Maximum parenthesis depth accepted
pub const MAX_NESTING: usize = 32;

/// Maximum number of operator signs accepted; bounds the depth of the tree
pub const MAX_OPERATORS: usize = 512;

/// Parse an expression string into an AST
pub fn parse_expression(input: &str) -> ExpressionResult<Expr> {
    if input.trim().is_empty() {
        return Err(ExpressionError::Empty);
    }
    check_nesting(input)?;
    check_size(input)?;

    match parse_expr(input) {
        Ok((remaining, expr)) => {
            if remaining.trim().is_empty() {
                Ok(expr)
            } else {
                Err(ExpressionError::syntax(
                    position(input, remaining),
                    format!("unexpected input '{}'", remaining.trim()),
                ))
            }
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(ExpressionError::syntax(
            position(input, e.input),
            "expected a number, column or '('",
        )),
        Err(nom::Err::Incomplete(_)) => Err(ExpressionError::syntax(
            input.len(),
            "unexpected end of expression",
        )),
    }
}

/// Byte offset of the first non-blank character of `rest` within `input`
fn position(input: &str, rest: &str) -> usize {
    input.len() - rest.trim_start().len()
}

fn check_nesting(input: &str) -> ExpressionResult<()> {
    let mut depth = 0usize;
    for (i, c) in input.char_indices() {
        match c {
            '(' => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(ExpressionError::syntax(
                        i,
                        format!("parentheses nested deeper than {}", MAX_NESTING),
                    ));
                }
            }
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

/// Counts every sign, including exponent signs, so the bound is conservative
fn check_size(input: &str) -> ExpressionResult<()> {
    let excess = input
        .char_indices()
        .filter(|(_, c)| matches!(c, '+' | '-' | '*' | '/'))
        .nth(MAX_OPERATORS);
    match excess {
        Some((i, _)) => Err(ExpressionError::syntax(
            i,
            format!("expression has more than {} operators", MAX_OPERATORS),
        )),
        None => Ok(()),
    }
}

/// Surround a parser with optional whitespace
fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Left-associative fold of `first (op operand)*`
fn fold_chain(first: Expr, rest: Vec<(BinaryOp, Expr)>) -> Expr {
    rest.into_iter()
        .fold(first, |lhs, (op, rhs)| Expr::binary(op, lhs, rhs))
}

fn parse_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_term(input)?;
    let (input, rest) = many0(pair(
        ws(alt((
            value(BinaryOp::Add, char('+')),
            value(BinaryOp::Sub, char('-')),
        ))),
        parse_term,
    ))(input)?;

    Ok((input, fold_chain(first, rest)))
}

fn parse_term(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_factor(input)?;
    let (input, rest) = many0(pair(
        ws(alt((
            value(BinaryOp::Mul, char('*')),
            value(BinaryOp::Div, char('/')),
        ))),
        parse_factor,
    ))(input)?;

    Ok((input, fold_chain(first, rest)))
}

/// A run of unary minus signs collapses to at most one negation
fn parse_factor(input: &str) -> IResult<&str, Expr> {
    let (input, signs) = many0(ws(char('-')))(input)?;
    let (input, atom) = ws(parse_atom)(input)?;

    if signs.len() % 2 == 1 {
        Ok((input, Expr::Neg(Box::new(atom))))
    } else {
        Ok((input, atom))
    }
}

fn parse_atom(input: &str) -> IResult<&str, Expr> {
    alt((
        map(parse_number, Expr::Number),
        map(parse_identifier, |name: &str| Expr::Column(name.to_string())),
        delimited(char('('), parse_expr, char(')')),
    ))(input)
}

/// Parse identifier (column name)
fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)
}

/// Parse unsigned floating point number
fn parse_number(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((
            digit1,
            opt(pair(char('.'), digit1)),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: &str| s.parse::<f64>(),
    )(input)
}
