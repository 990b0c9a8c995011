use breakout_markets::Symbol;
use serde::{Deserialize, Serialize};

/// Liquidity-tier filter thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityFilters {
    pub min_24h_volume_usd: f64,
    /// Futures-only OI floor. `None` skips the check for futures symbols
    /// too (spot always auto-passes).
    pub min_oi_usd: Option<f64>,
    pub max_spread_bps: f64,
    pub min_depth_0_3pct_usd: f64,
    pub min_depth_0_5pct_usd: f64,
    pub min_trades_per_minute: f64,
}

/// Volatility-tier filter thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityFilters {
    pub atr_range_min: f64,
    pub atr_range_max: f64,
    pub bb_width_percentile_max: f64,
    pub vol_surge_1h_min: f64,
    pub vol_surge_5m_min: f64,
    pub oi_delta_24h_min: Option<f64>,
}

/// Linear weights applied to normalised score components. Expected
/// to sum to ~1.0; values outside `[0.8, 1.2]` only warn, they don't reject.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub vol_surge: f64,
    pub oi_delta: f64,
    pub atr_quality: f64,
    pub correlation: f64,
    pub trades_per_minute: f64,
    /// Optional strategy-specific bonus component (e.g. gainers_momentum).
    pub strategy_specific: f64,
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.vol_surge
            + self.oi_delta
            + self.atr_quality
            + self.correlation
            + self.trades_per_minute
            + self.strategy_specific
    }

    /// Whether the weights sum close enough to 1.0 to avoid a warning:
    /// validated to sum ~1.0, warning (not rejecting) outside [0.8, 1.2].
    pub fn is_within_expected_range(&self) -> bool {
        (0.8..=1.2).contains(&self.sum())
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            vol_surge: 0.30,
            oi_delta: 0.15,
            atr_quality: 0.25,
            correlation: 0.15,
            trades_per_minute: 0.15,
            strategy_specific: 0.0,
        }
    }
}

/// Top-level scanner configuration combining filters, scoring weights and
/// pre-filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerConfig {
    pub liquidity: LiquidityFilters,
    pub volatility: VolatilityFilters,
    pub max_btc_correlation: f64,
    pub weights: ScoreWeights,
    pub whitelist: Option<Vec<Symbol>>,
    pub blacklist: Option<Vec<Symbol>>,
    pub top_n_by_volume: Option<usize>,
    pub max_candidates: usize,
}

impl ScannerConfig {
    /// The effective BTC-correlation cap: silently floors an operator value
    /// below 0.85, since a tighter cap than that has proven to starve the
    /// scanner of candidates in practice.
    pub fn effective_max_btc_correlation(&self) -> f64 {
        self.max_btc_correlation.max(0.85)
    }
}
