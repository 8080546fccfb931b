//! Scoring context and batch evaluation
//!
//! Global invariants enforced:
//! - The context is immutable once built; no process-wide singletons
//! - Batch scoring is a parallel map over wards with no shared mutable state
//! - Per-ward failures never abort a batch; a missing model always does

use crate::config::ResolvedConfig;
use crate::error::{EngineError, Result};
use crate::mpi::{self, ScoreBreakdown};
use crate::observation::{RainfallObservation, TemporalContext};
use crate::predictor::Predictor;
use crate::preparedness::{self, PreparednessBreakdown};
use crate::report;
use crate::schema::{self, FeatureSchema};
use crate::tables::WardTables;
use crate::zones::{self, ZoneSummary, ZoneThresholds};
use rayon::prelude::*;
use std::sync::Arc;

/// A ward that could not be scored, with the reason
#[derive(Debug)]
pub struct WardFailure {
    pub ward_id: String,
    pub error: EngineError,
}

/// Result of a batch run: successful records plus per-ward failures
#[derive(Debug, Default)]
pub struct BatchOutcome<T> {
    pub records: Vec<T>,
    pub failures: Vec<WardFailure>,
}

/// Immutable bundle of tables, model, schema, and configuration
///
/// Safe to share across threads; every scoring call reads, never writes.
pub struct ScoringContext {
    tables: WardTables,
    schema: FeatureSchema,
    predictor: Option<Arc<dyn Predictor>>,
    config: ResolvedConfig,
}

impl ScoringContext {
    /// Build a context, checking the schema against the model once.
    pub fn new(
        tables: WardTables,
        schema: FeatureSchema,
        predictor: Option<Arc<dyn Predictor>>,
        config: ResolvedConfig,
    ) -> Result<Self> {
        if let Some(model) = &predictor {
            schema.matches(model.feature_names())?;
        }
        Ok(ScoringContext {
            tables,
            schema,
            predictor,
            config,
        })
    }

    pub fn tables(&self) -> &WardTables {
        &self.tables
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    fn predictor(&self) -> Result<&Arc<dyn Predictor>> {
        self.predictor.as_ref().ok_or(EngineError::ModelUnavailable)
    }

    /// Score a single ward: assemble features, predict, compose.
    pub fn score_ward(
        &self,
        ward_id: &str,
        rainfall: &RainfallObservation,
        temporal: &TemporalContext,
    ) -> Result<ScoreBreakdown> {
        let model = self.predictor()?;
        let static_attrs = self.tables.static_for(ward_id)?;
        let historical = self.tables.historical_or_default(ward_id);

        let features =
            schema::assemble(&self.schema, static_attrs, &historical, rainfall, temporal)?;
        let probability = model.predict(&features)?;

        mpi::score(
            ward_id,
            static_attrs,
            &historical,
            self.tables.civic_for(ward_id),
            rainfall,
            probability,
            &self.config,
        )
    }

    /// Score every ward passing the include/exclude filters, with one shared
    /// rainfall observation for the whole batch.
    ///
    /// Wards evaluate in parallel; failures are collected per ward and the
    /// rest of the batch continues. Results come back sorted descending by
    /// score, ward id breaking ties.
    pub fn score_all(
        &self,
        rainfall: &RainfallObservation,
        temporal: &TemporalContext,
    ) -> Result<BatchOutcome<ScoreBreakdown>> {
        // No ward can be scored without a model; abort before starting.
        self.predictor()?;
        rainfall.validate()?;

        let ward_ids = self.filtered_ward_ids();
        let results: Vec<(String, Result<ScoreBreakdown>)> = ward_ids
            .into_par_iter()
            .map(|ward_id| {
                let outcome = self.score_ward(&ward_id, rainfall, temporal);
                (ward_id, outcome)
            })
            .collect();

        let mut outcome = split_results(results);
        report::sort_breakdowns(&mut outcome.records);
        Ok(outcome)
    }

    /// Assess a single ward's preparedness. Needs no model and no rainfall.
    pub fn assess_preparedness(&self, ward_id: &str) -> Result<PreparednessBreakdown> {
        let static_attrs = self.tables.static_for(ward_id)?;
        let historical = self.tables.historical_or_default(ward_id);
        preparedness::assess(
            ward_id,
            static_attrs,
            &historical,
            self.tables.civic_for(ward_id),
            &self.config,
        )
    }

    /// Assess every ward passing the filters, in parallel. Results come back
    /// sorted ascending by score (least prepared first), ward id breaking
    /// ties.
    pub fn assess_all(&self) -> BatchOutcome<PreparednessBreakdown> {
        let ward_ids = self.filtered_ward_ids();
        let results: Vec<(String, Result<PreparednessBreakdown>)> = ward_ids
            .into_par_iter()
            .map(|ward_id| {
                let outcome = self.assess_preparedness(&ward_id);
                (ward_id, outcome)
            })
            .collect();

        let mut outcome = split_results(results);
        report::sort_preparedness(&mut outcome.records);
        outcome
    }

    /// Zone rollup of risk breakdowns, counting wards below the moderate and
    /// high risk boundaries.
    pub fn risk_zone_summaries(&self, breakdowns: &[ScoreBreakdown]) -> Vec<ZoneSummary> {
        zones::aggregate(
            breakdowns,
            ZoneThresholds {
                critical_below: self.config.risk_thresholds.moderate,
                poor_below: self.config.risk_thresholds.high,
            },
        )
    }

    /// Zone rollup of preparedness breakdowns, counting wards below the poor
    /// and moderate preparedness boundaries.
    pub fn preparedness_zone_summaries(
        &self,
        breakdowns: &[PreparednessBreakdown],
    ) -> Vec<ZoneSummary> {
        zones::aggregate(
            breakdowns,
            ZoneThresholds {
                critical_below: self.config.preparedness_thresholds.poor,
                poor_below: self.config.preparedness_thresholds.moderate,
            },
        )
    }

    fn filtered_ward_ids(&self) -> Vec<String> {
        self.tables
            .ward_ids()
            .filter(|ward_id| self.config.should_include(ward_id))
            .cloned()
            .collect()
    }
}

fn split_results<T>(results: Vec<(String, Result<T>)>) -> BatchOutcome<T> {
    let mut records = Vec::new();
    let mut failures = Vec::new();
    for (ward_id, result) in results {
        match result {
            Ok(record) => records.push(record),
            Err(error) => failures.push(WardFailure { ward_id, error }),
        }
    }
    BatchOutcome { records, failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::LogisticModel;
    use crate::schema::MODEL_V1_FEATURES;
    use crate::tables::WardStatic;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn ward(id: &str, drain_density: f64) -> WardStatic {
        WardStatic {
            ward_id: id.to_string(),
            drain_density,
            mean_elevation: 215.0,
            low_lying_pct: 15.0,
            river_distance_m: 2500.0,
            urbanization_index: 0.6,
            building_density: Some(1.2),
            road_density: Some(3.5),
            flood_vulnerability_index: None,
        }
    }

    fn zero_model() -> Arc<dyn Predictor> {
        Arc::new(LogisticModel {
            model_version: "v1-test".to_string(),
            feature_names: MODEL_V1_FEATURES.iter().map(|f| f.to_string()).collect(),
            coefficients: vec![0.0; MODEL_V1_FEATURES.len()],
            intercept: 0.0,
        })
    }

    fn context(predictor: Option<Arc<dyn Predictor>>) -> ScoringContext {
        let tables = WardTables::from_records(
            vec![ward("N01", 2.0), ward("N02", 8.0), ward("E01", 5.0)],
            BTreeMap::new(),
            None,
        )
        .unwrap();
        ScoringContext::new(
            tables,
            FeatureSchema::model_v1(),
            predictor,
            ResolvedConfig::defaults().unwrap(),
        )
        .unwrap()
    }

    fn temporal() -> TemporalContext {
        TemporalContext::from_timestamp(Utc.with_ymd_and_hms(2023, 7, 10, 9, 0, 0).unwrap())
    }

    #[test]
    fn test_score_all_without_model_aborts() {
        let ctx = context(None);
        let err = ctx
            .score_all(&RainfallObservation::default(), &temporal())
            .unwrap_err();
        assert!(matches!(err, EngineError::ModelUnavailable));
    }

    #[test]
    fn test_score_ward_unknown_id() {
        let ctx = context(Some(zero_model()));
        let err = ctx
            .score_ward("Z99", &RainfallObservation::default(), &temporal())
            .unwrap_err();
        assert!(matches!(err, EngineError::WardNotFound { .. }));
    }

    #[test]
    fn test_score_all_sorted_descending() {
        let ctx = context(Some(zero_model()));
        let outcome = ctx
            .score_all(&RainfallObservation::default(), &temporal())
            .unwrap();
        assert_eq!(outcome.records.len(), 3);
        assert!(outcome.failures.is_empty());
        for pair in outcome.records.windows(2) {
            assert!(pair[0].mpi_score >= pair[1].mpi_score);
        }
    }

    #[test]
    fn test_schema_model_mismatch_fails_at_construction() {
        let model: Arc<dyn Predictor> = Arc::new(LogisticModel {
            model_version: "v2".to_string(),
            feature_names: vec!["rain_1h".to_string()],
            coefficients: vec![1.0],
            intercept: 0.0,
        });
        let tables =
            WardTables::from_records(vec![ward("N01", 2.0)], BTreeMap::new(), None).unwrap();
        let result = ScoringContext::new(
            tables,
            FeatureSchema::model_v1(),
            Some(model),
            ResolvedConfig::defaults().unwrap(),
        );
        assert!(matches!(result, Err(EngineError::SchemaMismatch(_))));
    }

    #[test]
    fn test_assess_all_needs_no_model() {
        let ctx = context(None);
        let outcome = ctx.assess_all();
        assert_eq!(outcome.records.len(), 3);
        assert!(outcome.failures.is_empty());
        for pair in outcome.records.windows(2) {
            assert!(pair[0].preparedness_score <= pair[1].preparedness_score);
        }
    }

    #[test]
    fn test_exclude_filter_skips_wards() {
        let config: crate::config::MonsoonConfig =
            serde_json::from_str(r#"{"exclude": ["E*"]}"#).unwrap();
        let tables = WardTables::from_records(
            vec![ward("N01", 2.0), ward("E01", 5.0)],
            BTreeMap::new(),
            None,
        )
        .unwrap();
        let ctx = ScoringContext::new(
            tables,
            FeatureSchema::model_v1(),
            Some(zero_model()),
            config.resolve().unwrap(),
        )
        .unwrap();
        let outcome = ctx
            .score_all(&RainfallObservation::default(), &temporal())
            .unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].ward_id, "N01");
    }

    #[test]
    fn test_batch_collects_per_ward_failures_and_continues() {
        // One ward lacks road_density, which the model schema requires.
        let mut incomplete = ward("N03", 3.0);
        incomplete.road_density = None;
        let tables = WardTables::from_records(
            vec![ward("N01", 2.0), incomplete],
            BTreeMap::new(),
            None,
        )
        .unwrap();
        let ctx = ScoringContext::new(
            tables,
            FeatureSchema::model_v1(),
            Some(zero_model()),
            ResolvedConfig::defaults().unwrap(),
        )
        .unwrap();

        let outcome = ctx
            .score_all(&RainfallObservation::default(), &temporal())
            .unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].ward_id, "N01");
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].ward_id, "N03");
        assert!(matches!(
            outcome.failures[0].error,
            EngineError::SchemaMismatch(_)
        ));
    }
}
