//! Engine error taxonomy
//!
//! Only structurally invalid inputs surface as errors. A failed or
//! timed-out intensity source is not an error anywhere in this crate;
//! it degrades to an explicit fallback reading with zero confidence.

use thiserror::Error;

/// Errors surfaced by the decision engine to its callers.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A requested region has no profile and no source coverage.
    #[error("unknown region: {0}")]
    UnknownRegion(String),

    /// The requested schedule cannot be satisfied: the duration exceeds
    /// the deadline window, or no candidate has usable forecast coverage.
    #[error("infeasible schedule: {0}")]
    InfeasibleSchedule(String),

    /// A measurement failed structural validation (negative/NaN energy,
    /// or component/phase sums inconsistent with the total).
    #[error("invalid measurement: {0}")]
    InvalidMeasurement(String),

    /// The baseline store failed to load or persist a record.
    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Callers reject these with a 4xx rather than retrying.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EngineError::UnknownRegion(_)
                | EngineError::InfeasibleSchedule(_)
                | EngineError::InvalidMeasurement(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_context() {
        let err = EngineError::InfeasibleSchedule("duration 180m exceeds window 60m".to_string());
        assert!(err.to_string().contains("duration 180m"));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(EngineError::UnknownRegion("xx".into()).is_client_error());
        assert!(EngineError::InvalidMeasurement("nan".into()).is_client_error());
        assert!(!EngineError::Storage("io".into()).is_client_error());
    }
}
