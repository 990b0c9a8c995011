//! Performance metrics, diagnostics, and persistence sinks that sit behind
//! the engine's external interfaces: the engine writes through these
//! traits and never touches a filesystem or database directly.
//!
//! # Example
//!
//! ```rust
//! use breakout_analytics::metric::sharpe::SharpeRatio;
//! use breakout_analytics::time::Daily;
//! use rust_decimal_macros::dec;
//!
//! let sharpe = SharpeRatio::calculate(dec!(0.0015), dec!(0.0025), dec!(0.02), Daily);
//! assert_eq!(sharpe.value, dec!(0.05));
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations)]

/// Append-only diagnostics sink and per-reason rejection counters.
pub mod diagnostics;

/// Sharpe, Sortino, Calmar, Win Rate, Profit Factor and drawdown tracking
/// over closed-trade history.
pub mod metric;

/// Fire-and-forget persistence sink for positions, signals, scan results
/// and performance metrics.
pub mod persistence;

/// Time interval conventions used to annualize or rescale return metrics.
pub mod time;

pub use diagnostics::{DiagnosticRecord, DiagnosticsSink, InMemoryDiagnosticsSink, JsonlDiagnosticsSink};
pub use persistence::{append_serializable, upsert_serializable, InMemoryPersistenceSink, PersistenceSink, RecordKind};

use chrono::{DateTime, Utc};

/// A type that carries its own timestamp, for chronological ordering of
/// heterogeneous records.
pub trait Timed {
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Pairs any value with the UTC instant it was observed at.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedValue<T> {
    pub value: T,
    pub timestamp: DateTime<Utc>,
}

impl<T> TimedValue<T> {
    pub fn new(value: T, timestamp: DateTime<Utc>) -> Self {
        Self { value, timestamp }
    }
}

impl<T> Timed for TimedValue<T> {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
