use thiserror::Error;

/// Errors raised by the integration layer itself (not by the wrapped
/// operation, whose error type is generic in [`crate::RateLimiter`]).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    #[error("retry budget exhausted after {attempts} attempts for {endpoint}")]
    RetriesExhausted { attempts: usize, endpoint: String },
}
