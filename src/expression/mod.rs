//! Derived-column expressions
//!
//! Restricted arithmetic over the columns of an aligned table:
//!
//! - **AST**: expression syntax tree
//! - **Parser**: nom grammar for `+ - * /`, parentheses, unary minus
//! - **Evaluator**: binds identifiers to columns and evaluates row-wise
//!
//! Only column names and numeric literals are accepted; there are no function
//! calls or attribute lookups.
//!
//! ```rust,ignore
//! use plantdb::expression::{evaluate_outcome, ExpressionOutcome};
//!
//! match evaluate_outcome("(m_0 - m_1) / m_1", &alignment.table) {
//!     ExpressionOutcome::Ok { column } => println!("{:?}", column.values),
//!     ExpressionOutcome::Error { message } => eprintln!("{}", message),
//! }
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod parser;

pub use ast::{BinaryOp, Expr};
pub use error::{ExpressionError, ExpressionResult};
pub use evaluator::{evaluate, evaluate_outcome, DerivedColumn, Expression, ExpressionOutcome};
pub use parser::parse_expression;
