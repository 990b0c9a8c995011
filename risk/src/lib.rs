#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations)]

//! Position sizing, portfolio-level guardrails, and the kill switch that
//! sits between a generated [`breakout_strategies::Signal`] and an order
//! reaching [`breakout_execution`].

pub mod error;
pub mod monitor;
pub mod sizing;

pub use error::RiskError;
pub use monitor::{correlation_bucket, PortfolioConfig, PortfolioMonitor, RiskMetrics};
pub use sizing::{PositionSize, RiskManager, SizingConfig};
