use serde::{Deserialize, Serialize};

/// Gate thresholds for the momentum (breakout) strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentumConfig {
    /// `ε` in `close > level * (1 + ε)` / `close < level * (1 - ε)`.
    pub momentum_epsilon: f64,
    /// `v[-1] / median(v[-20:-1]) >=` this.
    pub volume_multiplier: f64,
    pub body_ratio_min: f64,
    /// Minimum `|imbalance|`, direction-agnostic; only checked when L2
    /// depth is present on the market data.
    pub l2_imbalance_threshold: f64,
    /// `|price - vwap| / price <= (atr / price) * vwap_gap_max_atr`.
    pub vwap_gap_max_atr: f64,
    /// Stop distance in ATR multiples, compared against the last-10-bar
    /// swing low/high and the wider of the two used.
    pub sl_atr_mult: f64,
    pub tp1_r_mult: f64,
    pub tp2_r_mult: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            momentum_epsilon: 0.002,
            volume_multiplier: 1.5,
            body_ratio_min: 0.6,
            l2_imbalance_threshold: 0.2,
            vwap_gap_max_atr: 1.5,
            sl_atr_mult: 1.2,
            tp1_r_mult: 2.0,
            tp2_r_mult: 3.0,
        }
    }
}

/// Gate thresholds for the retest strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetestConfig {
    /// `|price - level| / level` must be at most this for a retest to
    /// even be considered.
    pub level_retest_pct: f64,
    /// How far beyond the level (in ATR) the pullback may have pierced.
    pub max_pierce_atr: f64,
    /// Offset used to build the entry price: `level * (1 +/- this)`.
    pub entry_offset_pct: f64,
    /// `mean(v[-5:]) / mean(v[-20:-5]) >=` this.
    pub trading_activity_min: f64,
    pub l2_imbalance_threshold: f64,
    /// A previous breakout of the same level must have happened within
    /// this window, in hours, to count (spec: 1-24h).
    pub breakout_lookback_min_hours: f64,
    pub breakout_lookback_max_hours: f64,
    pub sl_atr_mult: f64,
    pub tp1_r_mult: f64,
    pub tp2_r_mult: f64,
}

impl Default for RetestConfig {
    fn default() -> Self {
        Self {
            level_retest_pct: 0.005,
            max_pierce_atr: 0.3,
            entry_offset_pct: 0.001,
            trading_activity_min: 0.8,
            l2_imbalance_threshold: 0.2,
            breakout_lookback_min_hours: 1.0,
            breakout_lookback_max_hours: 24.0,
            sl_atr_mult: 1.0,
            tp1_r_mult: 1.2,
            tp2_r_mult: 2.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SignalGeneratorConfig {
    pub momentum: MomentumConfig,
    pub retest: RetestConfig,
}
