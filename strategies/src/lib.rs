#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations)]

//! Opportunity-finding pipeline: multi-stage [`scanner`] filters and scores
//! candidates, [`levels`] detects horizontal support/resistance, and
//! [`signals`] turns a scanned, leveled symbol into a momentum or retest
//! trade idea.

pub mod error;
pub mod levels;
pub mod scanner;
pub mod signals;

pub use error::StrategiesError;
pub use levels::{LevelDetector, LevelDetectorConfig, TradingLevel};
pub use scanner::{ScanMetrics, ScanResult, Scanner, ScannerConfig};
pub use signals::{Signal, SignalGenerator, SignalGeneratorConfig};
