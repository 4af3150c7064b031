pub mod error;
pub mod metrics;
pub mod projection;
pub mod types;

#[cfg(feature = "grading")]
pub mod grading;

#[cfg(feature = "report")]
pub mod report;

pub use error::ViabilityError;
pub use types::*;

/// Standard result type for all viability operations
pub type ViabilityResult<T> = Result<T, ViabilityError>;
