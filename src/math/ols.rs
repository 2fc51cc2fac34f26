//! Least squares via SVD.
//!
//! Used for the straight trend line drawn over the price-vs-distance scatter:
//!
//! ```text
//! minimize Σ (y_i - (a + b x_i))^2
//! ```
//!
//! Nalgebra's `QR::solve` is intended for square systems and will panic on
//! tall design matrices, so the solve goes through SVD.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Fitted line `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendLine {
    pub intercept: f64,
    pub slope: f64,
}

impl TrendLine {
    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fit a trend line through `(x, y)` pairs.
///
/// Needs at least two points with distinct `x`.
pub fn fit_trend_line(points: &[(f64, f64)]) -> Option<TrendLine> {
    if points.len() < 2 {
        return None;
    }
    let first_x = points[0].0;
    if points.iter().all(|(x, _)| *x == first_x) {
        return None;
    }

    let n = points.len();
    let x = DMatrix::from_fn(n, 2, |r, c| if c == 0 { 1.0 } else { points[r].0 });
    let y = DVector::from_iterator(n, points.iter().map(|(_, y)| *y));
    let beta = solve_least_squares(&x, &y)?;

    Some(TrendLine {
        intercept: beta[0],
        slope: beta[1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn trend_line_through_noisy_points() {
        // Residuals +1, -1, -1, +1 around y = 1 + 2x cancel out.
        let pts = [(0.0, 2.0), (1.0, 2.0), (2.0, 4.0), (3.0, 8.0)];
        let line = fit_trend_line(&pts).unwrap();
        assert!((line.slope - 2.0).abs() < 1e-9, "{line:?}");
        assert!((line.intercept - 1.0).abs() < 1e-9, "{line:?}");
        assert!((line.at(10.0) - 21.0).abs() < 1e-9);
    }

    #[test]
    fn trend_line_needs_spread_in_x() {
        assert!(fit_trend_line(&[(1.0, 2.0)]).is_none());
        assert!(fit_trend_line(&[(1.0, 2.0), (1.0, 3.0)]).is_none());
    }
}
