use thiserror::Error;

/// Errors surfaced by REST/WS adapters.
///
/// Per , transient I/O errors are retried at the adapter (see
/// [`breakout_integration::RateLimiter`]) and only surfaced after the retry
/// budget is exhausted; data-unavailable conditions are not errors at all —
/// callers translate them into "skip this symbol".
#[derive(Debug, Clone, Error)]
pub enum DataError {
    #[error("request to {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },

    #[error("rate limited calling {endpoint}: {message}")]
    RateLimited { endpoint: String, message: String },

    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("insufficient balance: requested notional {requested} exceeds free balance {free}")]
    InsufficientBalance { requested: f64, free: f64 },

    #[error("unknown order id {0}")]
    UnknownOrder(String),
}

impl DataError {
    /// Whether this error is the rate-limit class recognised by  (the
    /// only class [`breakout_integration::RateLimiter::execute_with_retry`]
    /// retries).
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, DataError::RateLimited { .. })
    }
}
