//! Monsoon Preparedness Index
//!
//! Infrastructure-readiness assessment per ward, independent of rainfall and
//! the prediction model. Five capped components sum to a 0-100 total; the
//! weakest component drives the recommended intervention.

use crate::config::{PreparednessThresholds, ResolvedConfig};
use crate::error::Result;
use crate::tables::{CivicSignals, WardHistorical, WardStatic};
use serde::{Deserialize, Serialize};

/// Preparedness level classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PreparednessLevel {
    Critical,
    Poor,
    Moderate,
    Good,
    Excellent,
}

impl PreparednessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreparednessLevel::Excellent => "Excellent",
            PreparednessLevel::Good => "Good",
            PreparednessLevel::Moderate => "Moderate",
            PreparednessLevel::Poor => "Poor",
            PreparednessLevel::Critical => "Critical",
        }
    }

    /// Fixed recommendation text carried by each level.
    pub fn recommendation(&self) -> &'static str {
        match self {
            PreparednessLevel::Excellent => "Well-prepared. Maintain current standards.",
            PreparednessLevel::Good => "Adequate preparation. Minor improvements needed.",
            PreparednessLevel::Moderate => "Significant gaps. Prioritize drainage maintenance.",
            PreparednessLevel::Poor => "Critical improvements needed before monsoon.",
            PreparednessLevel::Critical => "Emergency intervention required. High failure risk.",
        }
    }
}

/// Preparedness components in fixed tie-break order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreparednessComponent {
    Infrastructure,
    Resilience,
    Resources,
    Vulnerability,
    Maintenance,
}

impl PreparednessComponent {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreparednessComponent::Infrastructure => "Infrastructure",
            PreparednessComponent::Resilience => "Resilience",
            PreparednessComponent::Resources => "Resources",
            PreparednessComponent::Vulnerability => "Vulnerability",
            PreparednessComponent::Maintenance => "Maintenance",
        }
    }
}

/// One ward's preparedness result
///
/// Field names are a persisted-format contract for downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PreparednessBreakdown {
    pub ward_id: String,
    pub preparedness_score: f64,
    pub preparedness_level: PreparednessLevel,
    pub infra_capacity: f64,
    pub historical_resilience: f64,
    pub resource_readiness: f64,
    pub vulnerability_gap: f64,
    pub maintenance_score: f64,
    pub weakest_component: PreparednessComponent,
    pub recommendation: String,
}

/// Assess one ward's monsoon preparedness from static, historical, and civic
/// data only.
pub fn assess(
    ward_id: &str,
    static_attrs: &WardStatic,
    historical: &WardHistorical,
    civic: Option<&CivicSignals>,
    config: &ResolvedConfig,
) -> Result<PreparednessBreakdown> {
    static_attrs.validate()?;
    historical.validate()?;
    if let Some(signals) = civic {
        signals.validate()?;
    }

    // Infrastructure capacity (30): drainage coverage minus a complaint penalty.
    let drain_capacity = (static_attrs.drain_density * 5.0).min(30.0);
    let complaint_penalty = civic
        .map(|c| (c.drainage_complaints / 30.0 + c.sewerage_complaints / 20.0).min(10.0))
        .unwrap_or(0.0);
    let infra_capacity = (drain_capacity - complaint_penalty).max(0.0);

    // Historical resilience (25): how well the ward handled past monsoons.
    let flood_resilience = (25.0 - historical.hist_flood_freq * 4.0).max(0.0);
    let risk_resilience = (1.0 - historical.monsoon_risk_score) * 10.0;
    let historical_resilience = (flood_resilience + risk_resilience).min(25.0);

    // Resource readiness (20): access and built assets, with midpoint
    // defaults when the attributes were never extracted.
    let road_access = static_attrs
        .road_density
        .map(|r| (r * 2.0).min(10.0))
        .unwrap_or(5.0);
    let building_factor = static_attrs
        .building_density
        .map(|b| (b * 5.0).min(10.0))
        .unwrap_or(5.0);
    let resource_readiness = road_access + building_factor;

    // Vulnerability gap (15): physical exposure offset by infrastructure.
    let physical_vulnerability = static_attrs.low_lying_pct / 30.0 * 8.0
        + (220.0 - static_attrs.mean_elevation).max(0.0) / 20.0 * 7.0;
    let vulnerability_gap =
        (15.0 - (physical_vulnerability - infra_capacity / 3.0)).clamp(0.0, 15.0);

    // Maintenance (10): pothole backlog and complaint growth drag it down.
    let maintenance_penalty = civic.map(|c| (c.pothole_count / 4.0).min(5.0)).unwrap_or(0.0);
    let maintenance_score =
        (10.0 - maintenance_penalty - config.growth_rate * 3.0).clamp(0.0, 10.0);

    let preparedness_score = infra_capacity
        + historical_resilience
        + resource_readiness
        + vulnerability_gap
        + maintenance_score;

    let components = [
        (PreparednessComponent::Infrastructure, infra_capacity),
        (PreparednessComponent::Resilience, historical_resilience),
        (PreparednessComponent::Resources, resource_readiness),
        (PreparednessComponent::Vulnerability, vulnerability_gap),
        (PreparednessComponent::Maintenance, maintenance_score),
    ];
    let weakest_component = weakest(&components);

    let preparedness_level = classify(preparedness_score, &config.preparedness_thresholds);

    Ok(PreparednessBreakdown {
        ward_id: ward_id.to_string(),
        preparedness_score,
        preparedness_level,
        infra_capacity,
        historical_resilience,
        resource_readiness,
        vulnerability_gap,
        maintenance_score,
        weakest_component,
        recommendation: preparedness_level.recommendation().to_string(),
    })
}

/// Assign a preparedness level. Boundaries are lower-inclusive.
pub fn classify(total: f64, thresholds: &PreparednessThresholds) -> PreparednessLevel {
    if total >= thresholds.excellent {
        PreparednessLevel::Excellent
    } else if total >= thresholds.good {
        PreparednessLevel::Good
    } else if total >= thresholds.moderate {
        PreparednessLevel::Moderate
    } else if total >= thresholds.poor {
        PreparednessLevel::Poor
    } else {
        PreparednessLevel::Critical
    }
}

/// Minimum-valued component; ties keep the earliest in enumeration order.
fn weakest(components: &[(PreparednessComponent, f64)]) -> PreparednessComponent {
    let mut best = components[0];
    for candidate in &components[1..] {
        if candidate.1 < best.1 {
            best = *candidate;
        }
    }
    best.0
}
