use breakout_execution::{ExecutionError, NoOpenPosition};
use breakout_risk::RiskError;
use thiserror::Error;

/// Errors the engine cannot absorb as a per-symbol skip or a rejection
/// reason: these are the ones that count against the consecutive error
/// budget and, past it, force a transition to `EMERGENCY`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("execution manager error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("risk manager error: {0}")]
    Risk(#[from] RiskError),

    #[error(transparent)]
    NoOpenPosition(#[from] NoOpenPosition),

    #[error("engine exceeded its consecutive-error budget ({consecutive} errors)")]
    MaxConsecutiveErrorsExceeded { consecutive: u32 },
}
