//! Least-squares line through two aligned columns (bivariate scatter view)

use super::table::WideTable;
use crate::storage::{StoreError, StoreResult};
use serde::Serialize;

/// `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Rows where both columns had a value
    pub points: usize,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit a line through the rows where both `x` and `y` are present
///
/// Returns `Ok(None)` with fewer than two usable rows or when every usable x
/// is identical. Unknown column names are `InvalidArgument`.
pub fn linear_fit(table: &WideTable, x: &str, y: &str) -> StoreResult<Option<LinearFit>> {
    let xs = table
        .column(x)
        .ok_or_else(|| StoreError::InvalidArgument(format!("unknown column '{}'", x)))?;
    let ys = table
        .column(y)
        .ok_or_else(|| StoreError::InvalidArgument(format!("unknown column '{}'", y)))?;

    let pairs: Vec<(f64, f64)> = xs
        .values
        .iter()
        .zip(&ys.values)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .collect();

    if pairs.len() < 2 {
        return Ok(None);
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;

    let (sxy, sxx) = pairs.iter().fold((0.0, 0.0), |(sxy, sxx), (a, b)| {
        let dx = a - mean_x;
        (sxy + dx * (b - mean_y), sxx + dx * dx)
    });

    if sxx == 0.0 {
        return Ok(None);
    }

    let slope = sxy / sxx;
    Ok(Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
        points: pairs.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::table::SeriesColumn;
    use crate::storage::test_util::ts;

    fn col(name: &str, pts: &[(&str, f64)]) -> SeriesColumn {
        SeriesColumn {
            name: name.to_string(),
            points: pts.iter().map(|(t, v)| (ts(t), Some(*v))).collect(),
        }
    }

    fn table(xs: &[(&str, f64)], ys: &[(&str, f64)]) -> WideTable {
        WideTable::align([col("m_0", xs), col("m_1", ys)])
    }

    #[test]
    fn test_exact_line() {
        let t = table(
            &[("2023-01-01 00:00:00", 1.0), ("2023-01-01 00:15:00", 2.0), ("2023-01-01 00:30:00", 3.0)],
            &[("2023-01-01 00:00:00", 3.0), ("2023-01-01 00:15:00", 5.0), ("2023-01-01 00:30:00", 7.0)],
        );
        let fit = linear_fit(&t, "m_0", "m_1").unwrap().unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert_eq!(fit.points, 3);
        assert!((fit.predict(10.0) - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_rows_missing_either_side_are_skipped() {
        let t = table(
            &[("2023-01-01 00:00:00", 1.0), ("2023-01-01 00:15:00", 2.0), ("2023-01-01 00:45:00", 100.0)],
            &[("2023-01-01 00:00:00", 1.0), ("2023-01-01 00:15:00", 2.0), ("2023-01-01 00:30:00", -5.0)],
        );
        let fit = linear_fit(&t, "m_0", "m_1").unwrap().unwrap();
        assert_eq!(fit.points, 2);
        assert!((fit.slope - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_inputs() {
        let t = table(&[("2023-01-01 00:00:00", 1.0)], &[("2023-01-01 00:00:00", 1.0)]);
        assert!(linear_fit(&t, "m_0", "m_1").unwrap().is_none());

        let flat = table(
            &[("2023-01-01 00:00:00", 4.0), ("2023-01-01 00:15:00", 4.0)],
            &[("2023-01-01 00:00:00", 1.0), ("2023-01-01 00:15:00", 2.0)],
        );
        assert!(linear_fit(&flat, "m_0", "m_1").unwrap().is_none());

        assert!(linear_fit(&t, "m_0", "m_9").is_err());
    }
}
