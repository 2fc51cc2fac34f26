//! Feature encoding: trip fields -> model feature vector.
//!
//! Categorical columns are label-encoded (index into the sorted class list the
//! encoder was fitted with); numerical columns are standardized with the
//! fitted mean/scale. Column order follows `features.order` from the artifact.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::domain::TripInput;
use crate::model::ModelError;

/// Column layout of the feature vector, as recorded by the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub order: Vec<String>,
    pub categorical: Vec<String>,
    pub numerical: Vec<String>,
}

/// Fitted standard scaler parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerSpec {
    pub columns: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone)]
enum ColumnEncoding {
    Categorical { name: String, classes: Vec<String> },
    Numerical { name: String, mean: f64, scale: f64 },
}

/// Validated encoder: every column is known to exist on `TripInput`.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    columns: Vec<ColumnEncoding>,
}

impl FeatureEncoder {
    pub fn new(
        features: &FeatureSpec,
        label_encoders: &BTreeMap<String, Vec<String>>,
        scaler: &ScalerSpec,
    ) -> Result<Self, ModelError> {
        if scaler.columns.len() != scaler.mean.len() || scaler.columns.len() != scaler.scale.len() {
            return Err(ModelError::Invalid(format!(
                "scaler has {} columns but {} means and {} scales",
                scaler.columns.len(),
                scaler.mean.len(),
                scaler.scale.len()
            )));
        }
        check_partition(features)?;

        let template = TripInput::default();
        let mut columns = Vec::with_capacity(features.order.len());

        for name in &features.order {
            if features.categorical.contains(name) {
                if template.categorical(name).is_none() {
                    return Err(ModelError::Invalid(format!("'{name}' is not a categorical trip field")));
                }
                let classes = label_encoders
                    .get(name)
                    .ok_or_else(|| ModelError::Invalid(format!("missing label encoder for '{name}'")))?;
                if classes.is_empty() {
                    return Err(ModelError::Invalid(format!("label encoder for '{name}' has no classes")));
                }
                columns.push(ColumnEncoding::Categorical {
                    name: name.clone(),
                    classes: classes.clone(),
                });
            } else if features.numerical.contains(name) {
                if template.numeric(name).is_none() {
                    return Err(ModelError::Invalid(format!("'{name}' is not a numerical trip field")));
                }
                let idx = scaler
                    .columns
                    .iter()
                    .position(|c| c == name)
                    .ok_or_else(|| ModelError::Invalid(format!("scaler has no parameters for '{name}'")))?;
                let mean = scaler.mean[idx];
                let mut scale = scaler.scale[idx];
                if !(mean.is_finite() && scale.is_finite()) {
                    return Err(ModelError::Invalid(format!("non-finite scaler parameters for '{name}'")));
                }
                // Constant columns are fitted with scale 0; the scaler leaves them unscaled.
                if scale == 0.0 {
                    scale = 1.0;
                }
                columns.push(ColumnEncoding::Numerical {
                    name: name.clone(),
                    mean,
                    scale,
                });
            } else {
                return Err(ModelError::Invalid(format!(
                    "feature '{name}' is neither categorical nor numerical"
                )));
            }
        }

        Ok(Self { columns })
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Class lists for every categorical column, keyed by column name.
    pub fn categories(&self) -> BTreeMap<String, Vec<String>> {
        self.columns
            .iter()
            .filter_map(|c| match c {
                ColumnEncoding::Categorical { name, classes } => Some((name.clone(), classes.clone())),
                ColumnEncoding::Numerical { .. } => None,
            })
            .collect()
    }

    /// Encode a trip into the model's feature vector.
    pub fn encode(&self, trip: &TripInput) -> Result<Vec<f64>, ModelError> {
        let mut out = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            match column {
                ColumnEncoding::Categorical { name, classes } => {
                    let label = trip.categorical(name).unwrap_or_default();
                    let code = classes
                        .iter()
                        .position(|c| c == label)
                        .ok_or_else(|| ModelError::UnknownCategory {
                            column: name.clone(),
                            value: label.to_string(),
                        })?;
                    out.push(code as f64);
                }
                ColumnEncoding::Numerical { name, mean, scale } => {
                    let raw = trip.numeric(name).unwrap_or(f64::NAN);
                    out.push((raw - mean) / scale);
                }
            }
        }
        Ok(out)
    }
}

/// `order` must list every categorical and numerical column exactly once, and
/// no column may be both.
fn check_partition(features: &FeatureSpec) -> Result<(), ModelError> {
    let invalid = |msg: String| Err(ModelError::Invalid(msg));

    let mut kinds = HashSet::new();
    for name in features.categorical.iter().chain(&features.numerical) {
        if !kinds.insert(name.as_str()) {
            return invalid(format!("feature '{name}' is listed more than once across categorical/numerical"));
        }
    }

    let mut ordered = HashSet::new();
    for name in &features.order {
        if !ordered.insert(name.as_str()) {
            return invalid(format!("feature '{name}' appears more than once in the feature order"));
        }
    }

    if let Some(missing) = kinds.iter().find(|name| !ordered.contains(*name)) {
        return invalid(format!("feature '{missing}' is missing from the feature order"));
    }
    if ordered.len() != kinds.len() {
        return invalid("feature order must list every categorical and numerical column exactly once".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Weather;

    fn spec() -> (FeatureSpec, BTreeMap<String, Vec<String>>, ScalerSpec) {
        let features = FeatureSpec {
            order: vec!["Trip_Distance_km".into(), "Weather".into(), "Base_Fare".into()],
            categorical: vec!["Weather".into()],
            numerical: vec!["Trip_Distance_km".into(), "Base_Fare".into()],
        };
        let mut encoders = BTreeMap::new();
        encoders.insert("Weather".to_string(), vec!["Clear".into(), "Fog".into(), "Rain".into()]);
        let scaler = ScalerSpec {
            columns: vec!["Base_Fare".into(), "Trip_Distance_km".into()],
            mean: vec![3.0, 10.0],
            scale: vec![0.0, 5.0],
        };
        (features, encoders, scaler)
    }

    #[test]
    fn encodes_in_feature_order() {
        let (features, encoders, scaler) = spec();
        let encoder = FeatureEncoder::new(&features, &encoders, &scaler).unwrap();
        let trip = TripInput {
            trip_distance_km: 20.0,
            weather: Weather::Rain,
            base_fare: 4.5,
            ..TripInput::default()
        };
        let x = encoder.encode(&trip).unwrap();
        // distance standardized, Rain -> 2, zero scale treated as 1.
        assert_eq!(x, vec![2.0, 2.0, 1.5]);
    }

    #[test]
    fn unseen_class_is_an_error() {
        let (features, mut encoders, scaler) = spec();
        encoders.insert("Weather".to_string(), vec!["Clear".into(), "Rain".into()]);
        let encoder = FeatureEncoder::new(&features, &encoders, &scaler).unwrap();
        let trip = TripInput {
            weather: Weather::Fog,
            ..TripInput::default()
        };
        match encoder.encode(&trip) {
            Err(ModelError::UnknownCategory { column, value }) => {
                assert_eq!(column, "Weather");
                assert_eq!(value, "Fog");
            }
            other => panic!("expected UnknownCategory, got {other:?}"),
        }
    }

    #[test]
    fn rejects_inconsistent_layouts() {
        let (mut features, encoders, scaler) = spec();
        features.order.push("Trip_Price".into());
        assert!(FeatureEncoder::new(&features, &encoders, &scaler).is_err());

        let (features, encoders, mut scaler) = spec();
        scaler.mean.pop();
        assert!(FeatureEncoder::new(&features, &encoders, &scaler).is_err());

        let (features, _, scaler) = spec();
        assert!(FeatureEncoder::new(&features, &BTreeMap::new(), &scaler).is_err());
    }

    #[test]
    fn duplicated_order_entry_cannot_hide_a_column() {
        let (mut features, encoders, scaler) = spec();
        features.order = vec!["Trip_Distance_km".into(), "Trip_Distance_km".into(), "Weather".into()];
        match FeatureEncoder::new(&features, &encoders, &scaler) {
            Err(ModelError::Invalid(msg)) => assert!(msg.contains("Trip_Distance_km"), "{msg}"),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn column_cannot_be_both_kinds() {
        let (mut features, mut encoders, scaler) = spec();
        features.categorical.push("Base_Fare".into());
        features.order.push("Base_Fare".into());
        encoders.insert("Base_Fare".to_string(), vec!["x".into()]);
        assert!(FeatureEncoder::new(&features, &encoders, &scaler).is_err());
    }

    #[test]
    fn order_missing_a_declared_column_is_rejected() {
        let (mut features, encoders, scaler) = spec();
        features.order.retain(|name| name != "Base_Fare");
        features.order.push("Weather".into());
        assert!(FeatureEncoder::new(&features, &encoders, &scaler).is_err());
    }
}
