//! Zone rollup and priority ranking
//!
//! Wards group into administrative zones by the letter prefix of their id.
//! The grouping is intentionally coarse and must stay byte-compatible with
//! existing exports, including the `Zone_Unknown` fallback.

use crate::mpi::ScoreBreakdown;
use crate::preparedness::PreparednessBreakdown;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reserved key for ward ids with no alphabetic characters
pub const ZONE_UNKNOWN: &str = "Zone_Unknown";

/// Derive the zone key from a ward id: keep letters only.
pub fn zone_key(ward_id: &str) -> String {
    let letters: String = ward_id.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        ZONE_UNKNOWN.to_string()
    } else {
        format!("Zone_{}", letters)
    }
}

/// Record kinds that can be rolled up to zone level
pub trait ZoneRecord {
    fn ward_id(&self) -> &str;
    fn total(&self) -> f64;
    /// Name of the weakest component, for record kinds that track one.
    fn weakest_component(&self) -> Option<&'static str>;
}

impl ZoneRecord for ScoreBreakdown {
    fn ward_id(&self) -> &str {
        &self.ward_id
    }

    fn total(&self) -> f64 {
        self.mpi_score
    }

    fn weakest_component(&self) -> Option<&'static str> {
        None
    }
}

impl ZoneRecord for PreparednessBreakdown {
    fn ward_id(&self) -> &str {
        &self.ward_id
    }

    fn total(&self) -> f64 {
        self.preparedness_score
    }

    fn weakest_component(&self) -> Option<&'static str> {
        Some(self.weakest_component.as_str())
    }
}

/// Score boundaries for the below-threshold counts in a zone summary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneThresholds {
    pub critical_below: f64,
    pub poor_below: f64,
}

/// Aggregate over wards sharing a zone key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ZoneSummary {
    pub zone: String,
    pub ward_count: usize,
    pub avg_score: f64,
    pub min_score: f64,
    pub max_score: f64,
    /// Wards scoring below the critical threshold
    pub critical_wards: usize,
    /// Wards scoring below the poor threshold
    pub poor_wards: usize,
    /// Modal weakest component; first-encountered value wins ties
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_weakness: Option<String>,
}

struct ZoneAccumulator {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
    critical: usize,
    poor: usize,
    /// Weakness tallies in first-encounter order
    weaknesses: Vec<(&'static str, usize)>,
}

impl ZoneAccumulator {
    fn new() -> Self {
        ZoneAccumulator {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            critical: 0,
            poor: 0,
            weaknesses: Vec::new(),
        }
    }

    fn push(&mut self, total: f64, weakness: Option<&'static str>, thresholds: ZoneThresholds) {
        self.count += 1;
        self.sum += total;
        self.min = self.min.min(total);
        self.max = self.max.max(total);
        if total < thresholds.critical_below {
            self.critical += 1;
        }
        if total < thresholds.poor_below {
            self.poor += 1;
        }
        if let Some(name) = weakness {
            match self.weaknesses.iter_mut().find(|(seen, _)| *seen == name) {
                Some((_, tally)) => *tally += 1,
                None => self.weaknesses.push((name, 1)),
            }
        }
    }

    fn top_weakness(&self) -> Option<String> {
        let mut best: Option<(&'static str, usize)> = None;
        for (name, tally) in &self.weaknesses {
            // Strictly greater keeps the first-encountered value on ties.
            if best.map(|(_, top)| *tally > top).unwrap_or(true) {
                best = Some((name, *tally));
            }
        }
        best.map(|(name, _)| name.to_string())
    }
}

/// Group records by zone key and summarize each group.
///
/// Output is sorted ascending by mean score, so the least prepared or lowest
/// scoring zones come first for priority lists; equal means tie-break on the
/// zone key.
pub fn aggregate<R: ZoneRecord>(records: &[R], thresholds: ZoneThresholds) -> Vec<ZoneSummary> {
    let mut zones: BTreeMap<String, ZoneAccumulator> = BTreeMap::new();

    for record in records {
        let key = zone_key(record.ward_id());
        zones
            .entry(key)
            .or_insert_with(ZoneAccumulator::new)
            .push(record.total(), record.weakest_component(), thresholds);
    }

    let mut summaries: Vec<ZoneSummary> = zones
        .into_iter()
        .map(|(zone, acc)| ZoneSummary {
            zone,
            ward_count: acc.count,
            avg_score: acc.sum / acc.count as f64,
            min_score: acc.min,
            max_score: acc.max,
            critical_wards: acc.critical,
            poor_wards: acc.poor,
            top_weakness: acc.top_weakness(),
        })
        .collect();

    summaries.sort_by(|a, b| {
        a.avg_score
            .partial_cmp(&b.avg_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.zone.cmp(&b.zone))
    });

    summaries
}
