use thiserror::Error;

/// Errors raised when constructing a domain primitive with invalid data.
///
/// These are validation errors, not I/O errors: they are returned at the
/// point of construction and never propagate past the subsystem that
/// raised them (see design note on result-or-reason values).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarketsError {
    #[error("non-finite or non-positive price: {0}")]
    InvalidPrice(f64),

    #[error("negative volume: {0}")]
    InvalidVolume(f64),

    #[error("candle ohlc inconsistency: open={open} high={high} low={low} close={close}")]
    InconsistentCandle {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("spread_bps must be >= 0, got {0}")]
    InvalidSpread(f64),

    #[error("imbalance must be in [-1, 1], got {0}")]
    InvalidImbalance(f64),

    #[error("empty symbol")]
    EmptySymbol,
}
