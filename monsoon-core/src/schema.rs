//! Feature schema and vector assembly
//!
//! The feature vector order is a fixed contract shared with the trained
//! model. The schema is validated against the model's declared feature names
//! once at startup, never per call; any disagreement is a fatal
//! configuration error, not a retryable condition.

use crate::error::{EngineError, Result};
use crate::observation::{RainfallObservation, TemporalContext};
use crate::tables::{WardHistorical, WardStatic};
use std::collections::HashMap;

/// Field order used to train model v1
pub const MODEL_V1_FEATURES: &[&str] = &[
    "rain_1h",
    "rain_3h",
    "rain_6h",
    "rain_24h",
    "rain_intensity",
    "rain_forecast_3h",
    "drain_density",
    "mean_elevation",
    "low_lying_pct",
    "river_distance_m",
    "urbanization_index",
    "building_density",
    "road_density",
    "hist_flood_freq",
    "monsoon_risk_score",
    "complaint_baseline",
    "month",
    "hour",
    "is_monsoon",
];

/// Versioned, ordered feature field list with an index mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    fields: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Build a schema from an ordered field list, rejecting duplicates.
    pub fn new(fields: Vec<String>) -> Result<Self> {
        if fields.is_empty() {
            return Err(EngineError::SchemaMismatch("schema has no fields".to_string()));
        }
        let mut index = HashMap::with_capacity(fields.len());
        for (position, field) in fields.iter().enumerate() {
            if index.insert(field.clone(), position).is_some() {
                return Err(EngineError::SchemaMismatch(format!(
                    "duplicate feature `{}` in schema",
                    field
                )));
            }
        }
        Ok(FeatureSchema { fields, index })
    }

    /// Schema matching the v1 training pipeline.
    pub fn model_v1() -> Self {
        let fields: Vec<String> = MODEL_V1_FEATURES.iter().map(|f| f.to_string()).collect();
        let index = fields
            .iter()
            .enumerate()
            .map(|(position, field)| (field.clone(), position))
            .collect();
        FeatureSchema { fields, index }
    }

    /// Check this schema against a model's declared feature names.
    ///
    /// Order and length must match exactly.
    pub fn matches(&self, model_features: &[String]) -> Result<()> {
        if self.fields.len() != model_features.len() {
            return Err(EngineError::SchemaMismatch(format!(
                "schema has {} features, model expects {}",
                self.fields.len(),
                model_features.len()
            )));
        }
        for (position, (ours, theirs)) in self.fields.iter().zip(model_features).enumerate() {
            if ours != theirs {
                return Err(EngineError::SchemaMismatch(format!(
                    "feature {} is `{}` in schema but `{}` in model",
                    position, ours, theirs
                )));
            }
        }
        Ok(())
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn index_of(&self, field: &str) -> Option<usize> {
        self.index.get(field).copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Fixed-order numeric vector consumed by the predictor
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Merge one ward's attributes and the shared observation into a vector in
/// schema order.
///
/// Inputs are validated first; a required static attribute the schema names
/// but the ward lacks is a schema mismatch, not a silent zero-fill.
pub fn assemble(
    schema: &FeatureSchema,
    static_attrs: &WardStatic,
    historical: &WardHistorical,
    rainfall: &RainfallObservation,
    temporal: &TemporalContext,
) -> Result<FeatureVector> {
    static_attrs.validate()?;
    historical.validate()?;
    rainfall.validate()?;

    let mut values = Vec::with_capacity(schema.len());
    for field in schema.fields() {
        values.push(resolve_field(field, static_attrs, historical, rainfall, temporal)?);
    }
    Ok(FeatureVector(values))
}

fn resolve_field(
    field: &str,
    static_attrs: &WardStatic,
    historical: &WardHistorical,
    rainfall: &RainfallObservation,
    temporal: &TemporalContext,
) -> Result<f64> {
    match field {
        "rain_1h" => Ok(rainfall.rain_1h),
        "rain_3h" => Ok(rainfall.rain_3h),
        "rain_6h" => Ok(rainfall.rain_6h),
        "rain_24h" => Ok(rainfall.rain_24h),
        "rain_intensity" => Ok(rainfall.rain_intensity()),
        "rain_forecast_3h" => Ok(rainfall.rain_forecast_3h),
        "drain_density" => Ok(static_attrs.drain_density),
        "mean_elevation" => Ok(static_attrs.mean_elevation),
        "low_lying_pct" => Ok(static_attrs.low_lying_pct),
        "river_distance_m" => Ok(static_attrs.river_distance_m),
        "urbanization_index" => Ok(static_attrs.urbanization_index),
        "building_density" => {
            required_static(&static_attrs.ward_id, field, static_attrs.building_density)
        }
        "road_density" => required_static(&static_attrs.ward_id, field, static_attrs.road_density),
        "flood_vulnerability_index" => required_static(
            &static_attrs.ward_id,
            field,
            static_attrs.flood_vulnerability_index,
        ),
        "hist_flood_freq" => Ok(historical.hist_flood_freq),
        "monsoon_risk_score" => Ok(historical.monsoon_risk_score),
        "complaint_baseline" => Ok(historical.complaint_baseline),
        "month" => Ok(f64::from(temporal.month)),
        "hour" => Ok(f64::from(temporal.hour)),
        "is_monsoon" => Ok(if temporal.is_monsoon { 1.0 } else { 0.0 }),
        other => Err(EngineError::SchemaMismatch(format!(
            "unknown feature `{}` in schema",
            other
        ))),
    }
}

fn required_static(ward_id: &str, field: &str, value: Option<f64>) -> Result<f64> {
    value.ok_or_else(|| {
        EngineError::SchemaMismatch(format!(
            "ward {} is missing required static field `{}`",
            ward_id, field
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ward() -> WardStatic {
        WardStatic {
            ward_id: "N12".to_string(),
            drain_density: 4.0,
            mean_elevation: 212.0,
            low_lying_pct: 20.0,
            river_distance_m: 1800.0,
            urbanization_index: 0.7,
            building_density: Some(1.4),
            road_density: Some(3.1),
            flood_vulnerability_index: None,
        }
    }

    fn temporal() -> TemporalContext {
        TemporalContext::from_timestamp(Utc.with_ymd_and_hms(2023, 7, 10, 9, 0, 0).unwrap())
    }

    #[test]
    fn test_model_v1_schema_has_expected_shape() {
        let schema = FeatureSchema::model_v1();
        assert_eq!(schema.len(), MODEL_V1_FEATURES.len());
        assert_eq!(schema.index_of("rain_1h"), Some(0));
        assert_eq!(schema.index_of("is_monsoon"), Some(MODEL_V1_FEATURES.len() - 1));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = FeatureSchema::new(vec!["rain_1h".to_string(), "rain_1h".to_string()]);
        assert!(matches!(result, Err(EngineError::SchemaMismatch(_))));
    }

    #[test]
    fn test_matches_detects_length_and_order() {
        let schema = FeatureSchema::model_v1();
        let mut names: Vec<String> = MODEL_V1_FEATURES.iter().map(|f| f.to_string()).collect();
        assert!(schema.matches(&names).is_ok());

        names.swap(0, 1);
        assert!(schema.matches(&names).is_err());

        names.pop();
        assert!(schema.matches(&names).is_err());
    }

    #[test]
    fn test_assemble_preserves_schema_order() {
        let schema = FeatureSchema::model_v1();
        let rainfall = RainfallObservation {
            rain_1h: 2.0,
            rain_3h: 6.0,
            ..Default::default()
        };
        let vector = assemble(&schema, &ward(), &WardHistorical::default(), &rainfall, &temporal())
            .unwrap();
        assert_eq!(vector.len(), schema.len());
        assert_eq!(vector.values()[0], 2.0); // rain_1h
        assert_eq!(vector.values()[1], 6.0); // rain_3h
        assert_eq!(vector.values()[4], 2.0); // rain_intensity echoes rain_1h
        let monsoon_pos = schema.index_of("is_monsoon").unwrap();
        assert_eq!(vector.values()[monsoon_pos], 1.0);
    }

    #[test]
    fn test_missing_required_static_field_is_schema_mismatch() {
        let schema = FeatureSchema::model_v1();
        let mut incomplete = ward();
        incomplete.road_density = None;
        let err = assemble(
            &schema,
            &incomplete,
            &WardHistorical::default(),
            &RainfallObservation::default(),
            &temporal(),
        )
        .unwrap_err();
        match err {
            EngineError::SchemaMismatch(msg) => assert!(msg.contains("road_density")),
            other => panic!("expected SchemaMismatch, got {other}"),
        }
    }

    #[test]
    fn test_unknown_schema_field_is_schema_mismatch() {
        let schema = FeatureSchema::new(vec!["soil_moisture".to_string()]).unwrap();
        let err = assemble(
            &schema,
            &ward(),
            &WardHistorical::default(),
            &RainfallObservation::default(),
            &temporal(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::SchemaMismatch(_)));
    }

    #[test]
    fn test_invalid_rainfall_rejected_at_assembly() {
        let schema = FeatureSchema::model_v1();
        let rainfall = RainfallObservation {
            rain_3h: -2.0,
            ..Default::default()
        };
        let err = assemble(&schema, &ward(), &WardHistorical::default(), &rainfall, &temporal())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { .. }));
    }
}
