//! Monsoon core library - ward-level flood risk scoring and aggregation
//!
//! Converts per-ward signals (model failure probability, rainfall, flood
//! history, civic complaints, physical vulnerability) into a bounded
//! Multi-Parameter Index, a risk level, an independent preparedness index,
//! and zone-level priority rankings.

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Scoring is strictly per-ward; batches are parallel maps with no locking
// - No global mutable state; the context object is immutable and re-entrant
// - No randomness or clock reads inside scoring paths
// - Deterministic ordering of every exported list
// - Identical input yields byte-for-byte identical output

pub mod config;
pub mod engine;
pub mod error;
pub mod mpi;
pub mod observation;
pub mod predictor;
pub mod preparedness;
pub mod report;
pub mod schema;
pub mod tables;
pub mod zones;

pub use engine::{BatchOutcome, ScoringContext, WardFailure};
pub use error::{EngineError, Result};
pub use mpi::{RiskLevel, ScoreBreakdown};
pub use observation::{RainfallObservation, TemporalContext};
pub use predictor::{LogisticModel, Predictor};
pub use preparedness::{PreparednessBreakdown, PreparednessComponent, PreparednessLevel};
pub use report::{render_json, render_text, sort_breakdowns, RiskSummary};
pub use schema::{FeatureSchema, FeatureVector};
pub use tables::{CivicSignals, WardHistorical, WardStatic, WardTables};
pub use zones::{zone_key, ZoneSummary};

use chrono::{DateTime, Utc};

/// Score every ward in the context with one shared rainfall observation.
///
/// The timestamp defaults to the current time when not supplied; pass an
/// explicit value for reproducible runs.
pub fn score_wards(
    context: &ScoringContext,
    rainfall: &RainfallObservation,
    timestamp: Option<DateTime<Utc>>,
) -> Result<BatchOutcome<ScoreBreakdown>> {
    let temporal = TemporalContext::from_timestamp(timestamp.unwrap_or_else(Utc::now));
    context.score_all(rainfall, &temporal)
}

/// Assess every ward's monsoon preparedness. Needs no model, no rainfall,
/// and no timestamp.
pub fn assess_wards(context: &ScoringContext) -> BatchOutcome<PreparednessBreakdown> {
    context.assess_all()
}
