use thiserror::Error;

/// Boundary errors only. The numeric pipeline itself is total: divisions guard
/// against zero denominators, IRR is clamped, and "not found within horizon"
/// conditions return sentinels rather than erroring.
#[derive(Debug, Error)]
pub enum ViabilityError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for ViabilityError {
    fn from(e: serde_json::Error) -> Self {
        ViabilityError::SerializationError(e.to_string())
    }
}
