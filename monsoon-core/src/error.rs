//! Engine error types
//!
//! Every scoring failure is local to the ward being processed except
//! `ModelUnavailable`, which is global: no ward can be scored without a
//! loaded model, so batch evaluation aborts before it starts.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("ward not found: {ward_id}")]
    WardNotFound { ward_id: String },

    #[error("prediction model is not loaded")]
    ModelUnavailable,

    #[error("feature schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("invalid input: field `{field}` has value {value}")]
    InvalidInput { field: String, value: f64 },

    #[error("invalid table: {0}")]
    Table(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Reject non-finite or negative values in a required numeric field.
    pub(crate) fn check_non_negative(field: &str, value: f64) -> Result<f64> {
        if !value.is_finite() || value < 0.0 {
            return Err(EngineError::InvalidInput {
                field: field.to_string(),
                value,
            });
        }
        Ok(value)
    }

    /// Reject values outside [0, 1] in a normalized index field.
    pub(crate) fn check_unit_interval(field: &str, value: f64) -> Result<f64> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(EngineError::InvalidInput {
                field: field.to_string(),
                value,
            });
        }
        Ok(value)
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
