//! Report rendering and deterministic ordering
//!
//! Global invariants enforced:
//! - Deterministic output ordering
//! - Byte-for-byte identical output across runs

use crate::mpi::{RiskLevel, ScoreBreakdown};
use crate::preparedness::PreparednessBreakdown;
use crate::zones::ZoneSummary;
use serde::Serialize;

/// Sort risk breakdowns descending by score; ward id breaks ties.
pub fn sort_breakdowns(breakdowns: &mut [ScoreBreakdown]) {
    breakdowns.sort_by(|a, b| {
        b.mpi_score
            .partial_cmp(&a.mpi_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.ward_id.cmp(&b.ward_id))
    });
}

/// Sort preparedness breakdowns ascending by score (least prepared first);
/// ward id breaks ties.
pub fn sort_preparedness(breakdowns: &mut [PreparednessBreakdown]) {
    breakdowns.sort_by(|a, b| {
        a.preparedness_score
            .partial_cmp(&b.preparedness_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.ward_id.cmp(&b.ward_id))
    });
}

/// Distribution statistics over one scoring run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RiskSummary {
    pub total_wards: usize,
    pub low: usize,
    pub moderate: usize,
    pub high: usize,
    pub critical: usize,
    pub mean_mpi: f64,
    pub min_mpi: f64,
    pub max_mpi: f64,
}

/// Summarize a scored batch. Empty input yields zeroed statistics.
pub fn summarize(breakdowns: &[ScoreBreakdown]) -> RiskSummary {
    let mut summary = RiskSummary {
        total_wards: breakdowns.len(),
        low: 0,
        moderate: 0,
        high: 0,
        critical: 0,
        mean_mpi: 0.0,
        min_mpi: 0.0,
        max_mpi: 0.0,
    };
    if breakdowns.is_empty() {
        return summary;
    }

    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for breakdown in breakdowns {
        match breakdown.risk_level {
            RiskLevel::Low => summary.low += 1,
            RiskLevel::Moderate => summary.moderate += 1,
            RiskLevel::High => summary.high += 1,
            RiskLevel::Critical => summary.critical += 1,
        }
        sum += breakdown.mpi_score;
        min = min.min(breakdown.mpi_score);
        max = max.max(breakdown.mpi_score);
    }
    summary.mean_mpi = sum / breakdowns.len() as f64;
    summary.min_mpi = min;
    summary.max_mpi = max;
    summary
}

/// Render risk breakdowns as a fixed-width text table with a distribution
/// footer.
pub fn render_text(breakdowns: &[ScoreBreakdown]) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{:<10} {:>7} {:<10} {:>6} {:>6} {:>6} {:>6} {:>6} {:>6}\n",
        "WARD", "MPI", "LEVEL", "PROB", "MODEL", "RAIN", "HIST", "INFRA", "VULN"
    ));
    for breakdown in breakdowns {
        output.push_str(&format!(
            "{:<10} {:>7.1} {:<10} {:>6.3} {:>6.1} {:>6.1} {:>6.1} {:>6.1} {:>6.1}\n",
            truncate_or_pad(&breakdown.ward_id, 10),
            breakdown.mpi_score,
            breakdown.risk_level.as_str(),
            breakdown.model_prob,
            breakdown.model_contribution,
            breakdown.rainfall_contribution,
            breakdown.historical_contribution,
            breakdown.infrastructure_contribution,
            breakdown.vulnerability_contribution,
        ));
    }

    let summary = summarize(breakdowns);
    output.push_str(&format!(
        "\n{} wards | Critical: {}  High: {}  Moderate: {}  Low: {} | mean {:.1}  min {:.1}  max {:.1}\n",
        summary.total_wards,
        summary.critical,
        summary.high,
        summary.moderate,
        summary.low,
        summary.mean_mpi,
        summary.min_mpi,
        summary.max_mpi,
    ));
    output
}

/// Render preparedness breakdowns as a fixed-width text table.
pub fn render_preparedness_text(breakdowns: &[PreparednessBreakdown]) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{:<10} {:>7} {:<10} {:>6} {:>6} {:>6} {:>6} {:>6} {:<16}\n",
        "WARD", "SCORE", "LEVEL", "INFRA", "RESIL", "RESRC", "VULN", "MAINT", "WEAKEST"
    ));
    for breakdown in breakdowns {
        output.push_str(&format!(
            "{:<10} {:>7.1} {:<10} {:>6.1} {:>6.1} {:>6.1} {:>6.1} {:>6.1} {:<16}\n",
            truncate_or_pad(&breakdown.ward_id, 10),
            breakdown.preparedness_score,
            breakdown.preparedness_level.as_str(),
            breakdown.infra_capacity,
            breakdown.historical_resilience,
            breakdown.resource_readiness,
            breakdown.vulnerability_gap,
            breakdown.maintenance_score,
            breakdown.weakest_component.as_str(),
        ));
    }
    output
}

/// Render zone summaries as a priority table, worst zones first.
pub fn render_zone_text(summaries: &[ZoneSummary]) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{:<14} {:>6} {:>7} {:>7} {:>7} {:>9} {:>6} {:<16}\n",
        "ZONE", "WARDS", "MEAN", "MIN", "MAX", "CRITICAL", "POOR", "TOP WEAKNESS"
    ));
    for summary in summaries {
        output.push_str(&format!(
            "{:<14} {:>6} {:>7.1} {:>7.1} {:>7.1} {:>9} {:>6} {:<16}\n",
            truncate_or_pad(&summary.zone, 14),
            summary.ward_count,
            summary.avg_score,
            summary.min_score,
            summary.max_score,
            summary.critical_wards,
            summary.poor_wards,
            summary.top_weakness.as_deref().unwrap_or("-"),
        ));
    }
    output
}

/// Render any record list as pretty JSON.
pub fn render_json<T: Serialize>(records: &[T]) -> String {
    serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string())
}

/// Truncate or pad string to fixed width
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.len() > width {
        format!("{}...", &s[..width.saturating_sub(3)])
    } else {
        format!("{:<width$}", s, width = width)
    }
}
