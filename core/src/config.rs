//! Engine-wide configuration: a pre-parsed, immutable bundle of every
//! subsystem's configuration plus the handful of knobs that belong to
//! the cycle orchestrator itself. No file format is part of this
//! crate — callers parse their own config source and construct this
//! record.

use breakout_execution::{ExecutionConfig, PositionConfig};
use breakout_markets::{SignalStrategy, Symbol};
use breakout_risk::{PortfolioConfig, SizingConfig};
use breakout_strategies::{LevelDetectorConfig, ScannerConfig, SignalGeneratorConfig};
use std::time::Duration;

/// Everything the engine needs to run a cycle, gathered into one
/// immutable value shared for the engine's lifetime.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub scanner: ScannerConfig,
    pub levels: LevelDetectorConfig,
    pub signals: SignalGeneratorConfig,
    pub sizing: SizingConfig,
    pub portfolio: PortfolioConfig,
    pub execution: ExecutionConfig,
    pub position: PositionConfig,
    /// Which signal strategy wins a tie when both fire for the same
    /// symbol in a cycle.
    pub strategy_priority: SignalStrategy,
    /// How many detected levels feed the signal generator per symbol,
    /// selected by [`breakout_strategies::LevelDetector::strongest`].
    pub levels_per_symbol: usize,
    /// Interval between the start of one scanning stage and the next.
    pub scan_interval: Duration,
    /// Consecutive subsystem-exception budget before the engine forces
    /// an emergency flatten.
    pub max_consecutive_errors: u32,
    /// Reference symbol used for BTC-correlation and the scanner's BTC
    /// candle cache.
    pub btc_symbol: Symbol,
    /// Equity the portfolio monitor's high-water mark and daily-loss
    /// baseline are seeded with when the engine starts.
    pub starting_equity: f64,
}

impl EngineConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scanner: ScannerConfig,
        levels: LevelDetectorConfig,
        signals: SignalGeneratorConfig,
        sizing: SizingConfig,
        portfolio: PortfolioConfig,
        execution: ExecutionConfig,
        position: PositionConfig,
        strategy_priority: SignalStrategy,
        btc_symbol: Symbol,
        starting_equity: f64,
    ) -> Self {
        Self {
            scanner,
            levels,
            signals,
            sizing,
            portfolio,
            execution,
            position,
            strategy_priority,
            levels_per_symbol: 3,
            scan_interval: Duration::from_secs(60),
            max_consecutive_errors: 5,
            btc_symbol,
            starting_equity,
        }
    }
}
