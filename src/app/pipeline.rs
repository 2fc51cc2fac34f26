//! Shared evaluation pipeline used by the `evaluate` command.
//!
//! load artifact -> load dataset -> predict (parallel) -> metrics -> rankings
//!
//! Presentation (printing, plotting, exports) stays with the caller.

use std::path::Path;

use crate::domain::{ModelMetrics, TripResidual};
use crate::error::AppError;
use crate::io::ingest::Dataset;
use crate::math::regression_metrics;
use crate::model::{FareModel, ModelInfo};
use crate::report::Rankings;

/// All computed outputs of a single `taxipred evaluate` run.
#[derive(Debug, Clone)]
pub struct EvaluationOutput {
    pub info: ModelInfo,
    pub dataset: Dataset,
    pub metrics: ModelMetrics,
    pub residuals: Vec<TripResidual>,
    pub rankings: Rankings,
}

/// Load both artifacts from disk and evaluate.
pub fn run_evaluation(model_path: &Path, data_path: &Path, top_n: usize) -> Result<EvaluationOutput, AppError> {
    let model = FareModel::load(model_path)?;
    let dataset = crate::io::load_dataset(data_path)?;
    evaluate(&model, dataset, top_n)
}

/// Score an already-loaded model against a dataset.
pub fn evaluate(model: &FareModel, dataset: Dataset, top_n: usize) -> Result<EvaluationOutput, AppError> {
    let residuals = crate::report::compute_residuals(&dataset.records, model)?;

    let actual: Vec<f64> = residuals.iter().map(|r| r.record.trip_price).collect();
    let predicted: Vec<f64> = residuals.iter().map(|r| r.predicted).collect();
    let metrics = regression_metrics(&actual, &predicted)
        .ok_or_else(|| AppError::new(3, "Dataset contains no valid rows."))?;

    let rankings = crate::report::rank_over_under(&residuals, top_n);
    tracing::info!(
        "Evaluated {} trips: R2={:.4} RMSE={:.3} MAE={:.3}",
        metrics.n_test,
        metrics.r2,
        metrics.rmse,
        metrics.mae
    );

    Ok(EvaluationOutput {
        info: model.info(),
        dataset,
        metrics,
        residuals,
        rankings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::shipped_model_path;

    #[test]
    fn shipped_model_scores_well_on_cleaned_data() {
        let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/taxi_trip_pricing_clean.csv");
        let out = run_evaluation(&shipped_model_path(), &data, 5).unwrap();

        assert_eq!(out.residuals.len(), 480);
        assert_eq!(out.metrics.n_test, 480);
        assert!(out.metrics.r2 > 0.9, "r2 = {}", out.metrics.r2);
        assert!(out.metrics.mae < out.metrics.rmse);
        assert!(out.rankings.over.len() <= 5);
        assert!(out.rankings.over.iter().all(|r| r.residual > 0.0));
        assert!(out.rankings.under.iter().all(|r| r.residual < 0.0));
    }
}
