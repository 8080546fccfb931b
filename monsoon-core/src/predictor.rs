//! Prediction model capability
//!
//! The engine treats the trained classifier as an opaque capability: loaded
//! and validated once, deterministic for a fixed vector and model version,
//! and safe to call concurrently. Nothing here inspects the model's
//! internals beyond the artifact contract.

use crate::error::{EngineError, Result};
use crate::schema::FeatureVector;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Opaque failure-probability model
pub trait Predictor: Send + Sync {
    /// Identifier of the trained model version.
    fn model_version(&self) -> &str;

    /// Feature names in training order; the contract the schema is checked
    /// against at startup.
    fn feature_names(&self) -> &[String];

    /// Failure probability in [0, 1] for the given feature vector.
    fn predict(&self, features: &FeatureVector) -> Result<f64>;
}

/// Logistic model exported from the training pipeline as a JSON artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct LogisticModel {
    pub model_version: String,
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticModel {
    /// Load and validate an artifact from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let model: LogisticModel = serde_json::from_str(&content)?;
        model.validate()?;
        Ok(model)
    }

    /// Check internal consistency once, before any prediction.
    pub fn validate(&self) -> Result<()> {
        if self.feature_names.len() != self.coefficients.len() {
            return Err(EngineError::SchemaMismatch(format!(
                "model {} declares {} features but {} coefficients",
                self.model_version,
                self.feature_names.len(),
                self.coefficients.len()
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(EngineError::Config(format!(
                "model {} has non-finite coefficients",
                self.model_version
            )));
        }
        Ok(())
    }
}

impl Predictor for LogisticModel {
    fn model_version(&self) -> &str {
        &self.model_version
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            return Err(EngineError::SchemaMismatch(format!(
                "feature vector has {} values, model {} expects {}",
                features.len(),
                self.model_version,
                self.coefficients.len()
            )));
        }
        let z = self.intercept
            + self
                .coefficients
                .iter()
                .zip(features.values())
                .map(|(coefficient, value)| coefficient * value)
                .sum::<f64>();
        Ok(sigmoid(z).clamp(0.0, 1.0))
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::{RainfallObservation, TemporalContext};
    use crate::schema::{assemble, FeatureSchema};
    use crate::tables::{WardHistorical, WardStatic};
    use chrono::{TimeZone, Utc};

    fn zero_model() -> LogisticModel {
        LogisticModel {
            model_version: "v1-test".to_string(),
            feature_names: crate::schema::MODEL_V1_FEATURES
                .iter()
                .map(|f| f.to_string())
                .collect(),
            coefficients: vec![0.0; crate::schema::MODEL_V1_FEATURES.len()],
            intercept: 0.0,
        }
    }

    fn sample_vector() -> FeatureVector {
        let ward = WardStatic {
            ward_id: "N12".to_string(),
            drain_density: 4.0,
            mean_elevation: 212.0,
            low_lying_pct: 20.0,
            river_distance_m: 1800.0,
            urbanization_index: 0.7,
            building_density: Some(1.4),
            road_density: Some(3.1),
            flood_vulnerability_index: None,
        };
        let temporal =
            TemporalContext::from_timestamp(Utc.with_ymd_and_hms(2023, 7, 10, 9, 0, 0).unwrap());
        assemble(
            &FeatureSchema::model_v1(),
            &ward,
            &WardHistorical::default(),
            &RainfallObservation::default(),
            &temporal,
        )
        .unwrap()
    }

    #[test]
    fn test_zero_model_predicts_half() {
        let model = zero_model();
        let probability = model.predict(&sample_vector()).unwrap();
        assert!((probability - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let model = zero_model();
        let vector = sample_vector();
        assert_eq!(model.predict(&vector).unwrap(), model.predict(&vector).unwrap());
    }

    #[test]
    fn test_probability_stays_in_unit_interval() {
        let mut model = zero_model();
        model.intercept = 50.0;
        let high = model.predict(&sample_vector()).unwrap();
        model.intercept = -50.0;
        let low = model.predict(&sample_vector()).unwrap();
        assert!((0.0..=1.0).contains(&high));
        assert!((0.0..=1.0).contains(&low));
        assert!(high > 0.99);
        assert!(low < 0.01);
    }

    #[test]
    fn test_coefficient_count_mismatch_rejected() {
        let mut model = zero_model();
        model.coefficients.pop();
        assert!(matches!(model.validate(), Err(EngineError::SchemaMismatch(_))));
    }

    #[test]
    fn test_wrong_vector_length_is_schema_mismatch() {
        let mut model = zero_model();
        model.feature_names = vec!["rain_1h".to_string()];
        model.coefficients = vec![1.0];
        let err = model.predict(&sample_vector()).unwrap_err();
        assert!(matches!(err, EngineError::SchemaMismatch(_)));
    }

    #[test]
    fn test_load_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(
            &path,
            r#"{"model_version": "v1", "feature_names": [], "coefficients": [], "intercept": 0.0, "algorithm": "xgboost"}"#,
        )
        .unwrap();
        assert!(LogisticModel::load(&path).is_err());
    }
}
