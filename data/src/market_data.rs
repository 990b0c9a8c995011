use breakout_markets::{safe_divide, Candle, L2Depth, MarketType, Symbol, TimestampMs};
use serde::{Deserialize, Serialize};

/// Aggregated per-symbol market snapshot consumed by the scanner, level
/// detector and signal generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub symbol: Symbol,
    pub price: f64,
    pub volume_24h_usd: f64,
    pub oi_usd: Option<f64>,
    pub oi_change_24h: Option<f64>,
    pub trades_per_minute: f64,
    pub atr_5m: f64,
    pub atr_15m: f64,
    pub bb_width_pct: f64,
    pub btc_correlation: f64,
    pub l2_depth: Option<L2Depth>,
    pub candles_5m: Vec<Candle>,
    pub timestamp: TimestampMs,
    pub market_type: MarketType,
}

impl MarketData {
    /// `atr_15m / atr_5m`, guarded against division by zero.
    pub fn atr_ratio(&self) -> f64 {
        safe_divide(self.atr_15m, self.atr_5m).unwrap_or(0.0)
    }

    /// Composite `[0, 1]` score blending 24h USD volume (log-scaled against
    /// a $50M reference) with the presence of usable L2 depth. See
    /// DESIGN.md for the rationale behind this particular blend.
    pub fn liquidity_score(&self) -> f64 {
        let volume_component = if self.volume_24h_usd <= 0.0 {
            0.0
        } else {
            (self.volume_24h_usd.ln() / 50_000_000_f64.ln()).clamp(0.0, 1.0)
        };
        let depth_component = match &self.l2_depth {
            Some(depth) if depth.total_depth_0_3pct() > 0.0 => 1.0,
            Some(_) => 0.3,
            None => 0.0,
        };
        (0.7 * volume_component + 0.3 * depth_component).clamp(0.0, 1.0)
    }

    /// Closing prices of `candles_5m`, oldest first — the series most
    /// indicator functions operate on.
    pub fn closes(&self) -> Vec<f64> {
        self.candles_5m.iter().map(|c| c.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.candles_5m.iter().map(|c| c.volume).collect()
    }
}
