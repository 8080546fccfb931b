//! Rainfall observations and temporal context
//!
//! A `RainfallObservation` is one point-in-time reading plus a short-range
//! forecast, shared across all wards in a batch. `TemporalContext` is a pure
//! function of a caller-supplied timestamp; scoring paths never read the
//! clock themselves.

use crate::error::{EngineError, Result};
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Rainfall reading in millimetres, with explicit defaults of 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RainfallObservation {
    #[serde(default)]
    pub rain_1h: f64,
    #[serde(default)]
    pub rain_3h: f64,
    #[serde(default)]
    pub rain_6h: f64,
    #[serde(default)]
    pub rain_24h: f64,
    #[serde(default)]
    pub rain_forecast_3h: f64,
}

impl RainfallObservation {
    /// The 1-hour reading doubles as the intensity proxy the model consumes.
    pub fn rain_intensity(&self) -> f64 {
        self.rain_1h
    }

    pub fn validate(&self) -> Result<()> {
        EngineError::check_non_negative("rain_1h", self.rain_1h)?;
        EngineError::check_non_negative("rain_3h", self.rain_3h)?;
        EngineError::check_non_negative("rain_6h", self.rain_6h)?;
        EngineError::check_non_negative("rain_24h", self.rain_24h)?;
        EngineError::check_non_negative("rain_forecast_3h", self.rain_forecast_3h)?;
        Ok(())
    }
}

/// Calendar/seasonal signal derived from a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TemporalContext {
    pub month: u32,
    pub hour: u32,
    pub is_monsoon: bool,
}

impl TemporalContext {
    /// Derive the context from a UTC timestamp. The monsoon window is June
    /// through September.
    pub fn from_timestamp(timestamp: DateTime<Utc>) -> Self {
        let month = timestamp.month();
        TemporalContext {
            month,
            hour: timestamp.hour(),
            is_monsoon: (6..=9).contains(&month),
        }
    }
}
