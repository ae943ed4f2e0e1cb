//! Expression Evaluator
//!
//! Binds a parsed expression to the columns of a [`WideTable`] and evaluates
//! it row by row. A missing operand makes the row's result missing.

use super::ast::{BinaryOp, Expr};
use super::error::{ExpressionError, ExpressionResult};
use super::parser::parse_expression;
use crate::align::{Column, WideTable};
use serde::Serialize;

/// Values computed from an expression, one per table row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedColumn {
    /// Expression text as given
    pub expression: String,
    pub values: Vec<Option<f64>>,
}

impl DerivedColumn {
    /// Turn into a named table column
    pub fn into_column(self, name: impl Into<String>) -> Column {
        Column {
            name: name.into(),
            values: self.values,
        }
    }
}

/// Result of an evaluation, rendered in place of a derived column
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExpressionOutcome {
    Ok { column: DerivedColumn },
    Error { message: String },
}

impl ExpressionOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ExpressionOutcome::Ok { .. })
    }
}

/// Expression with identifiers resolved to column positions
#[derive(Debug)]
enum Bound {
    Number(f64),
    Column(usize),
    Neg(Box<Bound>),
    Binary {
        op: BinaryOp,
        lhs: Box<Bound>,
        rhs: Box<Bound>,
    },
}

/// A parsed expression ready to run against tables
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    pub fn parse(source: &str) -> ExpressionResult<Self> {
        Ok(Self {
            source: source.trim().to_string(),
            ast: parse_expression(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Evaluate against every row of `table`
    ///
    /// Every identifier must name a column of `table`; this is checked before
    /// any row is evaluated.
    pub fn evaluate(&self, table: &WideTable) -> ExpressionResult<DerivedColumn> {
        let bound = bind(&self.ast, table)?;
        let columns = table.columns();

        let values = (0..table.len())
            .map(|row| eval_row(&bound, columns, row))
            .collect::<ExpressionResult<Vec<_>>>()?;

        Ok(DerivedColumn {
            expression: self.source.clone(),
            values,
        })
    }
}

fn bind(expr: &Expr, table: &WideTable) -> ExpressionResult<Bound> {
    Ok(match expr {
        Expr::Number(n) => Bound::Number(*n),
        Expr::Column(name) => {
            let index = table
                .columns()
                .iter()
                .position(|c| &c.name == name)
                .ok_or_else(|| ExpressionError::UnknownColumn {
                    name: name.clone(),
                    available: table.column_names().join(", "),
                })?;
            Bound::Column(index)
        }
        Expr::Neg(inner) => Bound::Neg(Box::new(bind(inner, table)?)),
        Expr::Binary { op, lhs, rhs } => Bound::Binary {
            op: *op,
            lhs: Box::new(bind(lhs, table)?),
            rhs: Box::new(bind(rhs, table)?),
        },
    })
}

fn eval_row(expr: &Bound, columns: &[Column], row: usize) -> ExpressionResult<Option<f64>> {
    match expr {
        Bound::Number(n) => Ok(Some(*n)),
        Bound::Column(index) => Ok(columns[*index].values[row]),
        Bound::Neg(inner) => Ok(eval_row(inner, columns, row)?.map(|v| -v)),
        Bound::Binary { op, lhs, rhs } => {
            let lhs = eval_row(lhs, columns, row)?;
            let rhs = eval_row(rhs, columns, row)?;
            let (a, b) = match (lhs, rhs) {
                (Some(a), Some(b)) => (a, b),
                _ => return Ok(None),
            };
            match op {
                BinaryOp::Add => Ok(Some(a + b)),
                BinaryOp::Sub => Ok(Some(a - b)),
                BinaryOp::Mul => Ok(Some(a * b)),
                BinaryOp::Div if b == 0.0 => Err(ExpressionError::DivisionByZero { row }),
                BinaryOp::Div => Ok(Some(a / b)),
            }
        }
    }
}

/// Parse and evaluate `expression` against `table`
pub fn evaluate(expression: &str, table: &WideTable) -> ExpressionResult<DerivedColumn> {
    Expression::parse(expression)?.evaluate(table)
}

/// [`evaluate`], with any failure captured as an error outcome
pub fn evaluate_outcome(expression: &str, table: &WideTable) -> ExpressionOutcome {
    match evaluate(expression, table) {
        Ok(column) => ExpressionOutcome::Ok { column },
        Err(e) => {
            tracing::debug!(expression, error = %e, "Expression evaluation failed");
            ExpressionOutcome::Error { message: e.to_string() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::SeriesColumn;
    use crate::storage::test_util::ts;

    fn col(name: &str, pts: &[(&str, Option<f64>)]) -> SeriesColumn {
        SeriesColumn {
            name: name.to_string(),
            points: pts.iter().map(|(t, v)| (ts(t), *v)).collect(),
        }
    }

    /// m_0 = [2, 4, -], m_1 = [3, -, 0]
    fn table() -> WideTable {
        WideTable::align([
            col(
                "m_0",
                &[("2023-01-01 00:00:00", Some(2.0)), ("2023-01-01 00:15:00", Some(4.0))],
            ),
            col(
                "m_1",
                &[("2023-01-01 00:00:00", Some(3.0)), ("2023-01-01 00:30:00", Some(0.0))],
            ),
        ])
    }

    #[test]
    fn test_sum_of_two_columns() {
        let t = WideTable::align([
            col("m_0", &[("2023-01-01 00:00:00", Some(2.0))]),
            col("m_1", &[("2023-01-01 00:00:00", Some(3.0))]),
        ]);
        let result = evaluate("m_0 + m_1", &t).unwrap();
        assert_eq!(result.values, vec![Some(5.0)]);
        assert_eq!(result.expression, "m_0 + m_1");
    }

    #[test]
    fn test_missing_operand_gives_missing_result() {
        let result = evaluate("m_0 + m_1", &table()).unwrap();
        assert_eq!(result.values, vec![Some(5.0), None, None]);
    }

    #[test]
    fn test_arithmetic_with_constants() {
        let result = evaluate("-(m_0 * 2 - 1) / 4", &table()).unwrap();
        assert_eq!(result.values, vec![Some(-0.75), Some(-1.75), None]);
    }

    #[test]
    fn test_unknown_column() {
        let err = evaluate("m_0 / m_9", &table()).unwrap_err();
        assert_eq!(
            err,
            ExpressionError::UnknownColumn {
                name: "m_9".into(),
                available: "m_0, m_1".into()
            }
        );
    }

    #[test]
    fn test_unknown_column_checked_before_rows() {
        // Empty table: the identifier check still runs
        let err = evaluate("m_0", &WideTable::new()).unwrap_err();
        assert!(matches!(err, ExpressionError::UnknownColumn { .. }));
    }

    #[test]
    fn test_division_by_zero() {
        let t = WideTable::align([
            col("m_0", &[("2023-01-01 00:00:00", Some(1.0)), ("2023-01-01 00:15:00", Some(1.0))]),
            col("m_1", &[("2023-01-01 00:00:00", Some(2.0)), ("2023-01-01 00:15:00", Some(0.0))]),
        ]);
        assert_eq!(
            evaluate("m_0 / m_1", &t).unwrap_err(),
            ExpressionError::DivisionByZero { row: 1 }
        );
    }

    #[test]
    fn test_division_by_missing_zero_row_is_missing() {
        // Row 2 has m_0 missing and m_1 == 0
        let result = evaluate("m_0 / m_1", &table()).unwrap();
        assert_eq!(result.values[2], None);
    }

    #[test]
    fn test_outcome_capture() {
        let ok = evaluate_outcome("m_0 + m_1", &table());
        assert!(ok.is_ok());

        let err = evaluate_outcome("m_0 +", &table());
        match err {
            ExpressionOutcome::Error { message } => assert!(message.starts_with("Syntax error")),
            other => panic!("expected error outcome, got {:?}", other),
        }

        let err = evaluate_outcome("m_0 / m_9", &table());
        assert!(!err.is_ok());
    }

    /// Runs on a 2 MiB stack, the size of a tokio worker thread
    fn on_worker_stack<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
        std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(f)
            .unwrap()
            .join()
            .unwrap()
    }

    #[test]
    fn test_long_chain_is_an_error_outcome() {
        let outcome = on_worker_stack(|| evaluate_outcome(&vec!["m_0"; 200_000].join("+"), &table()));
        match outcome {
            ExpressionOutcome::Error { message } => assert!(message.contains("operators")),
            other => panic!("expected error outcome, got {:?}", other),
        }
    }

    #[test]
    fn test_longest_accepted_chain_evaluates() {
        use crate::expression::parser::MAX_OPERATORS;

        // -m_0 - -m_0 - ... with n terms is (n - 2) * m_0
        let n = MAX_OPERATORS / 2;
        let outcome = on_worker_stack(move || evaluate_outcome(&vec!["-m_0"; n].join("-"), &table()));
        match outcome {
            ExpressionOutcome::Ok { column } => {
                assert_eq!(column.values, vec![Some((n - 2) as f64 * 2.0), Some((n - 2) as f64 * 4.0), None]);
            }
            other => panic!("expected ok outcome, got {:?}", other),
        }
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(evaluate_outcome("", &table())).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "Expression is empty");

        let json = serde_json::to_value(evaluate_outcome("m_0", &table())).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["column"]["values"][0], 2.0);
        assert!(json["column"]["values"][2].is_null());
    }

    #[test]
    fn test_derived_column_into_table() {
        let mut t = table();
        let derived = evaluate("m_0 * 10", &t).unwrap();
        t.push_column(derived.into_column("result")).unwrap();
        assert_eq!(t.column("result").unwrap().values, vec![Some(20.0), Some(40.0), None]);
    }
}
