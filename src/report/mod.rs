//! Reporting utilities: residuals and rankings.

use crate::domain::{TripRecord, TripResidual};
use crate::error::AppError;
use crate::model::FareModel;

pub mod format;

pub use format::{format_rankings, format_run_summary};

/// Over/under-priced rankings (top-N each side).
#[derive(Debug, Clone)]
pub struct Rankings {
    /// Largest positive residuals: the trip cost more than the model predicts.
    pub over: Vec<TripResidual>,
    /// Largest negative residuals.
    pub under: Vec<TripResidual>,
}

/// Predict every record (in parallel) and pair it with its residual.
pub fn compute_residuals(records: &[TripRecord], model: &FareModel) -> Result<Vec<TripResidual>, AppError> {
    let trips: Vec<_> = records.iter().map(|r| r.trip.clone()).collect();
    let predicted = model.predict_batch(&trips)?;

    Ok(records
        .iter()
        .zip(predicted)
        .enumerate()
        .map(|(row, (record, y_hat))| TripResidual {
            row,
            record: record.clone(),
            predicted: y_hat,
            residual: record.trip_price - y_hat,
        })
        .collect())
}

/// Rank the top over- and under-priced trips by residual.
pub fn rank_over_under(residuals: &[TripResidual], top_n: usize) -> Rankings {
    let mut sorted = residuals.to_vec();
    sorted.sort_by(|a, b| b.residual.total_cmp(&a.residual));

    let over = sorted
        .iter()
        .take(top_n)
        .filter(|r| r.residual > 0.0)
        .cloned()
        .collect();
    let under = sorted
        .iter()
        .rev()
        .take(top_n)
        .filter(|r| r.residual < 0.0)
        .cloned()
        .collect();

    Rankings { over, under }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TripInput, Weather};
    use crate::model::tests::tiny_linear_artifact;

    fn residual(row: usize, residual: f64) -> TripResidual {
        TripResidual {
            row,
            record: TripRecord {
                trip: TripInput::default(),
                trip_price: 30.0 + residual,
            },
            predicted: 30.0,
            residual,
        }
    }

    #[test]
    fn compute_residuals_basic() {
        let model = FareModel::from_artifact(tiny_linear_artifact()).unwrap();
        let records = vec![
            TripRecord {
                trip: TripInput {
                    trip_distance_km: 10.0,
                    weather: Weather::Clear,
                    ..TripInput::default()
                },
                trip_price: 20.0,
            },
            TripRecord {
                trip: TripInput {
                    trip_distance_km: 10.0,
                    weather: Weather::Rain,
                    ..TripInput::default()
                },
                trip_price: 15.0,
            },
        ];

        let residuals = compute_residuals(&records, &model).unwrap();
        assert_eq!(residuals.len(), 2);
        assert_eq!(residuals[0].predicted, 15.0);
        assert_eq!(residuals[0].residual, 5.0);
        assert_eq!(residuals[1].row, 1);
        assert_eq!(residuals[1].residual, -3.0);
    }

    #[test]
    fn rank_over_under_basic() {
        let residuals = vec![residual(0, 0.5), residual(1, 5.0), residual(2, -5.0), residual(3, -1.0)];

        let rankings = rank_over_under(&residuals, 1);
        assert_eq!(rankings.over.len(), 1);
        assert_eq!(rankings.over[0].row, 1);
        assert_eq!(rankings.under.len(), 1);
        assert_eq!(rankings.under[0].row, 2);

        let rankings = rank_over_under(&residuals, 10);
        assert_eq!(rankings.over.len(), 2);
        assert_eq!(rankings.under.iter().map(|r| r.row).collect::<Vec<_>>(), vec![2, 3]);
    }
}
