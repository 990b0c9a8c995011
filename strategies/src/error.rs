use thiserror::Error;

/// Errors raised when a strategy configuration is internally inconsistent.
/// These are caught at construction time, never mid-cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategiesError {
    #[error("scanner score weights sum to {sum:.3}, expected ~1.0 (outside [0.8, 1.2])")]
    WeightsOutOfRange { sum: f64 },
}
