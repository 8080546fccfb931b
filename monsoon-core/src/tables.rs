//! Ward attribute tables
//!
//! Static, historical, and civic records keyed by ward id. Tables are built
//! fresh per scoring invocation from caller-supplied data; the engine keeps
//! no state between invocations.
//!
//! Required/optional distinction is explicit per field: every plain numeric
//! field on `WardStatic` must be present and valid, while `building_density`,
//! `road_density`, and `flood_vulnerability_index` may be absent. A ward
//! missing from the historical table scores with documented defaults, and an
//! absent civic table contributes zero everywhere.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Fixed physical and infrastructure attributes of a ward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WardStatic {
    pub ward_id: String,
    /// Drainage points per km²
    pub drain_density: f64,
    /// Mean elevation in metres
    pub mean_elevation: f64,
    /// Share of ward area below the flood-prone contour, in percent
    pub low_lying_pct: f64,
    /// Distance to the nearest river channel in metres
    pub river_distance_m: f64,
    /// Built-up intensity in [0, 1]
    pub urbanization_index: f64,
    /// Buildings per km², when extracted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_density: Option<f64>,
    /// Road km per km², when extracted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub road_density: Option<f64>,
    /// Precomputed exposure index in [0, 1], when available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flood_vulnerability_index: Option<f64>,
}

impl WardStatic {
    pub fn validate(&self) -> Result<()> {
        if self.ward_id.is_empty() {
            return Err(EngineError::Table("empty ward id in static table".to_string()));
        }
        EngineError::check_non_negative("drain_density", self.drain_density)?;
        EngineError::check_non_negative("mean_elevation", self.mean_elevation)?;
        EngineError::check_non_negative("low_lying_pct", self.low_lying_pct)?;
        EngineError::check_non_negative("river_distance_m", self.river_distance_m)?;
        EngineError::check_unit_interval("urbanization_index", self.urbanization_index)?;
        if let Some(v) = self.building_density {
            EngineError::check_non_negative("building_density", v)?;
        }
        if let Some(v) = self.road_density {
            EngineError::check_non_negative("road_density", v)?;
        }
        if let Some(v) = self.flood_vulnerability_index {
            EngineError::check_unit_interval("flood_vulnerability_index", v)?;
        }
        Ok(())
    }
}

/// Past-flood behavior of a ward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WardHistorical {
    /// Recorded flood events over the reference period
    pub hist_flood_freq: f64,
    /// Normalized monsoon season risk in [0, 1]
    pub monsoon_risk_score: f64,
    /// Typical complaint volume per season
    pub complaint_baseline: f64,
}

impl Default for WardHistorical {
    /// Defaults applied when a ward has no historical record.
    fn default() -> Self {
        WardHistorical {
            hist_flood_freq: 0.0,
            monsoon_risk_score: 0.5,
            complaint_baseline: 5.0,
        }
    }
}

impl WardHistorical {
    pub fn validate(&self) -> Result<()> {
        EngineError::check_non_negative("hist_flood_freq", self.hist_flood_freq)?;
        EngineError::check_unit_interval("monsoon_risk_score", self.monsoon_risk_score)?;
        EngineError::check_non_negative("complaint_baseline", self.complaint_baseline)?;
        Ok(())
    }
}

/// Complaint and degradation proxies for a ward
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CivicSignals {
    #[serde(default)]
    pub sewerage_complaints: f64,
    #[serde(default)]
    pub drainage_complaints: f64,
    #[serde(default)]
    pub pothole_count: f64,
    #[serde(default)]
    pub large_pothole_count: f64,
}

impl CivicSignals {
    pub fn validate(&self) -> Result<()> {
        EngineError::check_non_negative("sewerage_complaints", self.sewerage_complaints)?;
        EngineError::check_non_negative("drainage_complaints", self.drainage_complaints)?;
        EngineError::check_non_negative("pothole_count", self.pothole_count)?;
        EngineError::check_non_negative("large_pothole_count", self.large_pothole_count)?;
        Ok(())
    }
}

/// All per-ward input tables, keyed by ward id
///
/// BTreeMap keys give every iteration a stable ascending order.
#[derive(Debug, Clone, Default)]
pub struct WardTables {
    static_by_id: BTreeMap<String, WardStatic>,
    historical_by_id: BTreeMap<String, WardHistorical>,
    civic_by_id: Option<BTreeMap<String, CivicSignals>>,
}

impl WardTables {
    /// Build tables from in-memory records, validating everything up front.
    pub fn from_records(
        static_records: Vec<WardStatic>,
        historical: BTreeMap<String, WardHistorical>,
        civic: Option<BTreeMap<String, CivicSignals>>,
    ) -> Result<Self> {
        let mut static_by_id = BTreeMap::new();
        for record in static_records {
            record.validate()?;
            let id = record.ward_id.clone();
            if static_by_id.insert(id.clone(), record).is_some() {
                return Err(EngineError::Table(format!(
                    "duplicate ward id `{}` in static table",
                    id
                )));
            }
        }
        for record in historical.values() {
            record.validate()?;
        }
        if let Some(table) = &civic {
            for record in table.values() {
                record.validate()?;
            }
        }
        Ok(WardTables {
            static_by_id,
            historical_by_id: historical,
            civic_by_id: civic,
        })
    }

    /// Load tables from a data directory.
    ///
    /// `wards.json` (array of static records) is required. `historical.json`
    /// and `civic.json` (objects keyed by ward id) are optional; a missing
    /// historical file means every ward scores with defaults, and a missing
    /// civic file zeroes all civic contributions.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let statics_path = dir.join("wards.json");
        let content = std::fs::read_to_string(&statics_path)?;
        let static_records: Vec<WardStatic> = serde_json::from_str(&content)?;

        let historical_path = dir.join("historical.json");
        let historical: BTreeMap<String, WardHistorical> = if historical_path.exists() {
            serde_json::from_str(&std::fs::read_to_string(&historical_path)?)?
        } else {
            BTreeMap::new()
        };

        let civic_path = dir.join("civic.json");
        let civic: Option<BTreeMap<String, CivicSignals>> = if civic_path.exists() {
            Some(serde_json::from_str(&std::fs::read_to_string(&civic_path)?)?)
        } else {
            None
        };

        Self::from_records(static_records, historical, civic)
    }

    /// Static record for a ward, or `WardNotFound`.
    pub fn static_for(&self, ward_id: &str) -> Result<&WardStatic> {
        self.static_by_id.get(ward_id).ok_or_else(|| EngineError::WardNotFound {
            ward_id: ward_id.to_string(),
        })
    }

    /// Historical record for a ward, falling back to documented defaults.
    pub fn historical_or_default(&self, ward_id: &str) -> WardHistorical {
        self.historical_by_id.get(ward_id).cloned().unwrap_or_default()
    }

    /// Civic signals for a ward. Absent table or absent ward both yield None.
    pub fn civic_for(&self, ward_id: &str) -> Option<&CivicSignals> {
        self.civic_by_id.as_ref().and_then(|table| table.get(ward_id))
    }

    /// Ward ids in stable ascending order.
    pub fn ward_ids(&self) -> impl Iterator<Item = &String> {
        self.static_by_id.keys()
    }

    pub fn len(&self) -> usize {
        self.static_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.static_by_id.is_empty()
    }
}
