//! Multi-Parameter Index (MPI) composite risk scoring
//!
//! Global invariants enforced:
//! - Each component is independently capped and non-negative
//! - The total is the exact sum of the five components, in [0, 100]
//! - Identical inputs always produce an identical breakdown

use crate::config::{ResolvedConfig, RiskThresholds};
use crate::error::{EngineError, Result};
use crate::observation::RainfallObservation;
use crate::tables::{CivicSignals, WardHistorical, WardStatic};
use serde::{Deserialize, Serialize};

/// Risk level classification for MPI totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }
}

/// One ward's composite result
///
/// Field names are a persisted-format contract for downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScoreBreakdown {
    pub ward_id: String,
    pub mpi_score: f64,
    pub risk_level: RiskLevel,
    pub model_prob: f64,
    pub model_contribution: f64,
    pub rainfall_contribution: f64,
    pub historical_contribution: f64,
    pub infrastructure_contribution: f64,
    pub vulnerability_contribution: f64,
    pub current_rain_mm: f64,
    pub forecast_rain_mm: f64,
    pub hist_flood_count: f64,
    pub drain_density: f64,
    pub elevation_m: f64,
}

/// Combine the model probability with the four rule-based components.
pub fn score(
    ward_id: &str,
    static_attrs: &WardStatic,
    historical: &WardHistorical,
    civic: Option<&CivicSignals>,
    rainfall: &RainfallObservation,
    probability: f64,
    config: &ResolvedConfig,
) -> Result<ScoreBreakdown> {
    static_attrs.validate()?;
    historical.validate()?;
    rainfall.validate()?;
    if let Some(signals) = civic {
        signals.validate()?;
    }
    EngineError::check_unit_interval("probability", probability)?;

    let caps = &config.caps;

    let model_contribution = probability * caps.model;

    let rain_total = rainfall.rain_3h + rainfall.rain_forecast_3h;
    let rainfall_contribution = config.rainfall_bins.score_for(rain_total);

    let historical_contribution = (historical.hist_flood_freq * 2.5).min(caps.historical);

    let infrastructure_contribution =
        infrastructure_stress(static_attrs, civic, config.growth_rate);

    let vulnerability_contribution =
        vulnerability(static_attrs, rainfall, caps.vulnerability);

    let mpi_score = model_contribution
        + rainfall_contribution
        + historical_contribution
        + infrastructure_contribution
        + vulnerability_contribution;

    Ok(ScoreBreakdown {
        ward_id: ward_id.to_string(),
        mpi_score,
        risk_level: classify(mpi_score, &config.risk_thresholds),
        model_prob: probability,
        model_contribution,
        rainfall_contribution,
        historical_contribution,
        infrastructure_contribution,
        vulnerability_contribution,
        current_rain_mm: rainfall.rain_1h,
        forecast_rain_mm: rainfall.rain_forecast_3h,
        hist_flood_count: historical.hist_flood_freq,
        drain_density: static_attrs.drain_density,
        elevation_m: static_attrs.mean_elevation,
    })
}

/// Drainage capacity stress plus three civic complaint terms.
///
/// Sub-term caps (6 + 4 + 3 + 2) partition the 15-point component weight.
/// The civic terms are zero when the ward has no civic record.
fn infrastructure_stress(
    static_attrs: &WardStatic,
    civic: Option<&CivicSignals>,
    growth_rate: f64,
) -> f64 {
    let drain_stress = (10.0 - static_attrs.drain_density).max(0.0) / 10.0 * 6.0;

    match civic {
        Some(signals) => {
            let sewerage_stress =
                (signals.sewerage_complaints / 15.0 * (1.0 + growth_rate)).min(4.0);
            let drainage_stress = (signals.drainage_complaints / 25.0).min(3.0);
            let pothole_stress =
                (signals.pothole_count / 5.0 + signals.large_pothole_count / 2.0).min(2.0);
            drain_stress + sewerage_stress + drainage_stress + pothole_stress
        }
        None => drain_stress,
    }
}

/// Physical exposure from the precomputed index when available, otherwise
/// the elevation/low-lying fallback, plus an urban flash-flood bonus under
/// heavy rain. Clamped to the component cap.
fn vulnerability(static_attrs: &WardStatic, rainfall: &RainfallObservation, cap: f64) -> f64 {
    let base = match static_attrs.flood_vulnerability_index {
        Some(index) => index * cap,
        None => {
            let elevation_vuln = ((220.0 - static_attrs.mean_elevation) / 15.0 * 5.0).max(0.0);
            let low_lying_vuln = static_attrs.low_lying_pct / 30.0 * 5.0;
            elevation_vuln + low_lying_vuln
        }
    };

    let urban_bonus = if rainfall.rain_1h > 10.0 {
        static_attrs.urbanization_index * rainfall.rain_1h / 10.0 * 2.0
    } else {
        0.0
    };

    (base + urban_bonus).min(cap)
}

/// Assign a risk level. Boundaries are half-open and lower-inclusive.
pub fn classify(total: f64, thresholds: &RiskThresholds) -> RiskLevel {
    if total < thresholds.moderate {
        RiskLevel::Low
    } else if total < thresholds.high {
        RiskLevel::Moderate
    } else if total < thresholds.critical {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}
