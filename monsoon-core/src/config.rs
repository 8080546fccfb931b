//! Configuration file support
//!
//! Scoring weights, caps, and thresholds live in a declarative rule table so
//! they can be tuned without code changes. All fields are optional; defaults
//! reproduce the calibrated rules.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.monsoonrc.json` in the data root
//! 3. `monsoon.config.json` in the data root

use crate::error::{EngineError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Raw configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonsoonConfig {
    /// Glob patterns for ward ids to include (default: all wards)
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns for ward ids to exclude
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Year-over-year sewerage complaint growth rate (default: 0.0)
    #[serde(default)]
    pub growth_rate: Option<f64>,

    /// Custom component caps for the composite score
    #[serde(default)]
    pub caps: Option<CapConfig>,

    /// Custom rainfall severity bins
    #[serde(default)]
    pub rainfall_bins: Option<RainfallBinConfig>,

    /// Custom risk level thresholds
    #[serde(default)]
    pub risk_thresholds: Option<RiskThresholdConfig>,

    /// Custom preparedness level thresholds
    #[serde(default)]
    pub preparedness_thresholds: Option<PreparednessThresholdConfig>,
}

/// Custom caps for the five composite components
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapConfig {
    /// Model probability cap (default: 40)
    pub model: Option<f64>,
    /// Rainfall severity cap (default: 20)
    pub rainfall: Option<f64>,
    /// Historical risk cap (default: 15)
    pub historical: Option<f64>,
    /// Infrastructure stress cap (default: 15)
    pub infrastructure: Option<f64>,
    /// Vulnerability cap (default: 10)
    pub vulnerability: Option<f64>,
}

/// Custom rainfall severity step function
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RainfallBinConfig {
    /// Upper edges in mm (default: [5, 15, 35, 65])
    pub edges: Option<Vec<f64>>,
    /// Step values, one more than edges (default: [0, 5, 10, 15, 20])
    pub scores: Option<Vec<f64>>,
}

/// Custom risk level thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskThresholdConfig {
    /// Total at which risk becomes Moderate (default: 30)
    pub moderate: Option<f64>,
    /// Total at which risk becomes High (default: 50)
    pub high: Option<f64>,
    /// Total at which risk becomes Critical (default: 70)
    pub critical: Option<f64>,
}

/// Custom preparedness level thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreparednessThresholdConfig {
    /// Total at which preparedness leaves Critical (default: 30)
    pub poor: Option<f64>,
    /// Total at which preparedness becomes Moderate (default: 45)
    pub moderate: Option<f64>,
    /// Total at which preparedness becomes Good (default: 60)
    pub good: Option<f64>,
    /// Total at which preparedness becomes Excellent (default: 75)
    pub excellent: Option<f64>,
}

/// Resolved caps for the five composite components
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentCaps {
    pub model: f64,
    pub rainfall: f64,
    pub historical: f64,
    pub infrastructure: f64,
    pub vulnerability: f64,
}

impl Default for ComponentCaps {
    fn default() -> Self {
        ComponentCaps {
            model: 40.0,
            rainfall: 20.0,
            historical: 15.0,
            infrastructure: 15.0,
            vulnerability: 10.0,
        }
    }
}

impl ComponentCaps {
    pub fn sum(&self) -> f64 {
        self.model + self.rainfall + self.historical + self.infrastructure + self.vulnerability
    }
}

/// Step function mapping combined rainfall (mm) to a severity score
#[derive(Debug, Clone, PartialEq)]
pub struct RainfallBins {
    pub edges: Vec<f64>,
    pub scores: Vec<f64>,
}

impl Default for RainfallBins {
    fn default() -> Self {
        RainfallBins {
            edges: vec![5.0, 15.0, 35.0, 65.0],
            scores: vec![0.0, 5.0, 10.0, 15.0, 20.0],
        }
    }
}

impl RainfallBins {
    /// Severity score for a combined rainfall total. Bins are half-open and
    /// lower-inclusive: a total equal to an edge lands in the next bin up.
    pub fn score_for(&self, total_mm: f64) -> f64 {
        for (edge, score) in self.edges.iter().zip(&self.scores) {
            if total_mm < *edge {
                return *score;
            }
        }
        self.scores.last().copied().unwrap_or(0.0)
    }
}

/// Risk level boundaries, lower-inclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskThresholds {
    pub moderate: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        RiskThresholds {
            moderate: 30.0,
            high: 50.0,
            critical: 70.0,
        }
    }
}

/// Preparedness level boundaries, lower-inclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreparednessThresholds {
    pub poor: f64,
    pub moderate: f64,
    pub good: f64,
    pub excellent: f64,
}

impl Default for PreparednessThresholds {
    fn default() -> Self {
        PreparednessThresholds {
            poor: 30.0,
            moderate: 45.0,
            good: 60.0,
            excellent: 75.0,
        }
    }
}

/// Resolved configuration with compiled glob patterns
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Compiled include patterns (None means include all wards)
    pub include: Option<GlobSet>,
    /// Compiled exclude patterns
    pub exclude: GlobSet,
    pub growth_rate: f64,
    pub caps: ComponentCaps,
    pub rainfall_bins: RainfallBins,
    pub risk_thresholds: RiskThresholds,
    pub preparedness_thresholds: PreparednessThresholds,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl MonsoonConfig {
    /// Validate the configuration for logical errors.
    pub fn validate(&self) -> Result<()> {
        if let Some(rate) = self.growth_rate {
            if !rate.is_finite() || rate <= -1.0 {
                return Err(EngineError::Config(format!(
                    "growth_rate must be a finite value greater than -1.0 (got {})",
                    rate
                )));
            }
        }

        let caps = resolve_caps(&self.caps);
        for (name, value) in [
            ("model", caps.model),
            ("rainfall", caps.rainfall),
            ("historical", caps.historical),
            ("infrastructure", caps.infrastructure),
            ("vulnerability", caps.vulnerability),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::Config(format!(
                    "caps.{} must be non-negative (got {})",
                    name, value
                )));
            }
        }
        if (caps.sum() - 100.0).abs() > 1e-9 {
            return Err(EngineError::Config(format!(
                "component caps must sum to 100 (got {})",
                caps.sum()
            )));
        }

        let bins = resolve_bins(&self.rainfall_bins);
        if bins.edges.is_empty() {
            return Err(EngineError::Config("rainfall_bins.edges must not be empty".to_string()));
        }
        if bins.scores.len() != bins.edges.len() + 1 {
            return Err(EngineError::Config(format!(
                "rainfall_bins.scores must have one more entry than edges ({} edges, {} scores)",
                bins.edges.len(),
                bins.scores.len()
            )));
        }
        for window in bins.edges.windows(2) {
            if window[0] >= window[1] {
                return Err(EngineError::Config(format!(
                    "rainfall_bins.edges must be strictly increasing ({} then {})",
                    window[0], window[1]
                )));
            }
        }
        if bins.edges.iter().any(|e| !e.is_finite() || *e < 0.0)
            || bins.scores.iter().any(|s| !s.is_finite() || *s < 0.0)
        {
            return Err(EngineError::Config(
                "rainfall_bins values must be finite and non-negative".to_string(),
            ));
        }
        for window in bins.scores.windows(2) {
            if window[0] > window[1] {
                return Err(EngineError::Config(
                    "rainfall_bins.scores must be non-decreasing".to_string(),
                ));
            }
        }

        let risk = resolve_risk_thresholds(&self.risk_thresholds);
        if risk.moderate <= 0.0 || risk.moderate >= risk.high || risk.high >= risk.critical {
            return Err(EngineError::Config(format!(
                "risk thresholds must be positive and strictly increasing (got {}, {}, {})",
                risk.moderate, risk.high, risk.critical
            )));
        }

        let prep = resolve_preparedness_thresholds(&self.preparedness_thresholds);
        if prep.poor <= 0.0
            || prep.poor >= prep.moderate
            || prep.moderate >= prep.good
            || prep.good >= prep.excellent
        {
            return Err(EngineError::Config(format!(
                "preparedness thresholds must be positive and strictly increasing (got {}, {}, {}, {})",
                prep.poor, prep.moderate, prep.good, prep.excellent
            )));
        }

        for pattern in self.include.iter().chain(&self.exclude) {
            Glob::new(pattern).map_err(|e| {
                EngineError::Config(format!("invalid ward pattern `{}`: {}", pattern, e))
            })?;
        }

        Ok(())
    }

    /// Resolve config into compiled form ready for use.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let include = if self.include.is_empty() {
            None
        } else {
            Some(compile_globs(&self.include)?)
        };
        let exclude = compile_globs(&self.exclude)?;

        Ok(ResolvedConfig {
            include,
            exclude,
            growth_rate: self.growth_rate.unwrap_or(0.0),
            caps: resolve_caps(&self.caps),
            rainfall_bins: resolve_bins(&self.rainfall_bins),
            risk_thresholds: resolve_risk_thresholds(&self.risk_thresholds),
            preparedness_thresholds: resolve_preparedness_thresholds(&self.preparedness_thresholds),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Check whether a ward id passes the include/exclude patterns.
    pub fn should_include(&self, ward_id: &str) -> bool {
        if self.exclude.is_match(ward_id) {
            return false;
        }
        if let Some(include) = &self.include {
            return include.is_match(ward_id);
        }
        true
    }

    /// Build a ResolvedConfig with all defaults (no config file).
    pub fn defaults() -> Result<Self> {
        MonsoonConfig::default().resolve()
    }
}

fn compile_globs(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).map_err(|e| {
            EngineError::Config(format!("invalid ward pattern `{}`: {}", pattern, e))
        })?);
    }
    builder
        .build()
        .map_err(|e| EngineError::Config(format!("failed to compile ward patterns: {}", e)))
}

fn resolve_caps(caps: &Option<CapConfig>) -> ComponentCaps {
    let defaults = ComponentCaps::default();
    match caps {
        Some(c) => ComponentCaps {
            model: c.model.unwrap_or(defaults.model),
            rainfall: c.rainfall.unwrap_or(defaults.rainfall),
            historical: c.historical.unwrap_or(defaults.historical),
            infrastructure: c.infrastructure.unwrap_or(defaults.infrastructure),
            vulnerability: c.vulnerability.unwrap_or(defaults.vulnerability),
        },
        None => defaults,
    }
}

fn resolve_bins(bins: &Option<RainfallBinConfig>) -> RainfallBins {
    let defaults = RainfallBins::default();
    match bins {
        Some(b) => RainfallBins {
            edges: b.edges.clone().unwrap_or(defaults.edges),
            scores: b.scores.clone().unwrap_or(defaults.scores),
        },
        None => defaults,
    }
}

fn resolve_risk_thresholds(thresholds: &Option<RiskThresholdConfig>) -> RiskThresholds {
    let defaults = RiskThresholds::default();
    match thresholds {
        Some(t) => RiskThresholds {
            moderate: t.moderate.unwrap_or(defaults.moderate),
            high: t.high.unwrap_or(defaults.high),
            critical: t.critical.unwrap_or(defaults.critical),
        },
        None => defaults,
    }
}

fn resolve_preparedness_thresholds(
    thresholds: &Option<PreparednessThresholdConfig>,
) -> PreparednessThresholds {
    let defaults = PreparednessThresholds::default();
    match thresholds {
        Some(t) => PreparednessThresholds {
            poor: t.poor.unwrap_or(defaults.poor),
            moderate: t.moderate.unwrap_or(defaults.moderate),
            good: t.good.unwrap_or(defaults.good),
            excellent: t.excellent.unwrap_or(defaults.excellent),
        },
        None => defaults,
    }
}

/// Discover and load a config file from the data root.
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(data_root: &Path) -> Result<Option<(MonsoonConfig, PathBuf)>> {
    let rc_path = data_root.join(".monsoonrc.json");
    if rc_path.exists() {
        let config = load_config_file(&rc_path)?;
        return Ok(Some((config, rc_path)));
    }

    let config_path = data_root.join("monsoon.config.json");
    if config_path.exists() {
        let config = load_config_file(&config_path)?;
        return Ok(Some((config, config_path)));
    }

    Ok(None)
}

/// Load config from an explicit file path.
pub fn load_config_file(path: &Path) -> Result<MonsoonConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: MonsoonConfig = serde_json::from_str(&content).map_err(|e| {
        EngineError::Config(format!("failed to parse config file {}: {}", path.display(), e))
    })?;
    config.validate().map_err(|e| {
        EngineError::Config(format!("invalid config in {}: {}", path.display(), e))
    })?;
    Ok(config)
}

/// Load and resolve config for a data root.
///
/// If `config_path` is provided, loads from that file. Otherwise, discovers
/// config from the data root. Returns default config if nothing is found.
pub fn load_and_resolve(data_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        (load_config_file(path)?, Some(path.to_path_buf()))
    } else {
        match discover_config(data_root)? {
            Some((config, path)) => (config, Some(path)),
            None => (MonsoonConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config_is_valid() {
        let config = MonsoonConfig::default();
        config.validate().expect("default config should be valid");
        let resolved = config.resolve().expect("default config should resolve");
        assert!(resolved.include.is_none());
        assert_eq!(resolved.growth_rate, 0.0);
        assert_eq!(resolved.caps, ComponentCaps::default());
        assert_eq!(resolved.risk_thresholds.moderate, 30.0);
        assert_eq!(resolved.risk_thresholds.high, 50.0);
        assert_eq!(resolved.risk_thresholds.critical, 70.0);
        assert_eq!(resolved.preparedness_thresholds.excellent, 75.0);
    }

    #[test]
    fn test_default_caps_sum_to_hundred() {
        assert_eq!(ComponentCaps::default().sum(), 100.0);
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "include": ["N*", "E*"],
            "exclude": ["N99"],
            "growth_rate": 0.75,
            "caps": {"model": 35.0, "rainfall": 25.0},
            "risk_thresholds": {"moderate": 25.0, "high": 45.0, "critical": 65.0}
        }"#;
        let config: MonsoonConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.growth_rate, 0.75);
        assert_eq!(resolved.caps.model, 35.0);
        assert_eq!(resolved.caps.rainfall, 25.0);
        assert_eq!(resolved.caps.historical, 15.0); // default
        assert_eq!(resolved.risk_thresholds.critical, 65.0);
    }

    #[test]
    fn test_reject_unknown_fields() {
        let json = r#"{"weights": {"model": 40.0}}"#;
        let result: std::result::Result<MonsoonConfig, _> = serde_json::from_str(json);
        assert!(result.is_err(), "unknown fields should be rejected");
    }

    #[test]
    fn test_reject_caps_not_summing_to_hundred() {
        let json = r#"{"caps": {"model": 50.0}}"#;
        let config: MonsoonConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_unordered_risk_thresholds() {
        let json = r#"{"risk_thresholds": {"moderate": 50.0, "high": 30.0}}"#;
        let config: MonsoonConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_unordered_preparedness_thresholds() {
        let json = r#"{"preparedness_thresholds": {"poor": 60.0, "moderate": 45.0}}"#;
        let config: MonsoonConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_bin_score_count_mismatch() {
        let json = r#"{"rainfall_bins": {"edges": [5.0, 15.0], "scores": [0.0, 5.0]}}"#;
        let config: MonsoonConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_non_increasing_bin_edges() {
        let json = r#"{"rainfall_bins": {"edges": [15.0, 5.0], "scores": [0.0, 5.0, 10.0]}}"#;
        let config: MonsoonConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_growth_rate_at_minus_one() {
        let json = r#"{"growth_rate": -1.0}"#;
        let config: MonsoonConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_invalid_glob_pattern() {
        let json = r#"{"include": ["[invalid"]}"#;
        let config: MonsoonConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_should_include_patterns() {
        let config: MonsoonConfig = serde_json::from_str(
            r#"{"include": ["N*"], "exclude": ["N99"]}"#,
        )
        .unwrap();
        let resolved = config.resolve().unwrap();
        assert!(resolved.should_include("N12"));
        assert!(!resolved.should_include("N99"));
        assert!(!resolved.should_include("E07"));
    }

    #[test]
    fn test_no_patterns_includes_everything() {
        let resolved = ResolvedConfig::defaults().unwrap();
        assert!(resolved.should_include("N12"));
        assert!(resolved.should_include("anything"));
    }

    #[test]
    fn test_rainfall_bin_boundaries_are_lower_inclusive() {
        let bins = RainfallBins::default();
        assert_eq!(bins.score_for(4.999), 0.0);
        assert_eq!(bins.score_for(5.0), 5.0);
        assert_eq!(bins.score_for(15.0), 10.0);
        assert_eq!(bins.score_for(35.0), 15.0);
        assert_eq!(bins.score_for(65.0), 20.0);
        assert_eq!(bins.score_for(200.0), 20.0);
    }

    #[test]
    fn test_discover_monsoonrc_takes_priority() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".monsoonrc.json"), r#"{"growth_rate": 0.1}"#).unwrap();
        fs::write(dir.path().join("monsoon.config.json"), r#"{"growth_rate": 0.2}"#).unwrap();

        let (config, path) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.growth_rate, Some(0.1));
        assert!(path.ends_with(".monsoonrc.json"));
    }

    #[test]
    fn test_no_config_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_config(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_and_resolve_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("custom.json");
        fs::write(&config_path, r#"{"growth_rate": 0.75}"#).unwrap();

        let resolved = load_and_resolve(dir.path(), Some(&config_path)).unwrap();
        assert_eq!(resolved.growth_rate, 0.75);
        assert_eq!(resolved.config_path, Some(config_path));
    }

    #[test]
    fn test_load_and_resolve_defaults_when_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = load_and_resolve(dir.path(), None).unwrap();
        assert!(resolved.config_path.is_none());
        assert_eq!(resolved.growth_rate, 0.0);
    }
}
