//! Regression metrics (R², RMSE, MAE).

use crate::domain::ModelMetrics;

/// Score predictions against observed values.
///
/// Returns `None` for empty or mismatched inputs. R² is 0 when the observed
/// values have no variance.
pub fn regression_metrics(actual: &[f64], predicted: &[f64]) -> Option<ModelMetrics> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return None;
    }

    let n = actual.len() as f64;
    let mean = actual.iter().sum::<f64>() / n;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    let mut abs_sum = 0.0;
    for (y, y_hat) in actual.iter().zip(predicted) {
        let e = y - y_hat;
        ss_res += e * e;
        abs_sum += e.abs();
        ss_tot += (y - mean) * (y - mean);
    }

    let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    Some(ModelMetrics {
        r2,
        rmse: (ss_res / n).sqrt(),
        mae: abs_sum / n,
        n_test: actual.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_fit() {
        let y = [1.0, 2.0, 3.0];
        let m = regression_metrics(&y, &y).unwrap();
        assert_eq!(m.r2, 1.0);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.n_test, 3);
    }

    #[test]
    fn known_errors() {
        let actual = [2.0, 4.0, 6.0, 8.0];
        let predicted = [3.0, 3.0, 7.0, 7.0];
        let m = regression_metrics(&actual, &predicted).unwrap();
        // ss_res = 4, ss_tot = 20
        assert!((m.r2 - 0.8).abs() < 1e-12);
        assert!((m.rmse - 1.0).abs() < 1e-12);
        assert!((m.mae - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(regression_metrics(&[], &[]).is_none());
        assert!(regression_metrics(&[1.0], &[1.0, 2.0]).is_none());
        assert_eq!(regression_metrics(&[5.0, 5.0], &[4.0, 6.0]).unwrap().r2, 0.0);
    }
}
