use thiserror::Error;

/// Failures surfaced by [`crate::manager::ExecutionManager::execute`].
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("exchange client rejected the order: {0}")]
    Exchange(#[from] breakout_data::DataError),

    #[error("child order timed out after {timeout_ms}ms with no fill")]
    Deadman { timeout_ms: u64 },

    #[error("requested quantity {quantity} must be positive")]
    NonPositiveQuantity { quantity: f64 },

    #[error("book too thin for {notional_usd} usd (only {allowed_usd} usd available within the depth guard)")]
    DepthTooThin { notional_usd: f64, allowed_usd: f64 },
}
