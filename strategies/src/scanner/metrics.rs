use breakout_data::{indicators, MarketData};

/// Derived per-symbol metrics computed ahead of filtering/scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanMetrics {
    pub vol_surge_1h: f64,
    pub vol_surge_5m: f64,
    pub atr_quality: f64,
    pub oi_delta_24h: f64,
    pub bb_width_pct: f64,
    pub btc_correlation: f64,
    pub trades_per_minute: f64,
    pub liquidity_score: f64,
}

/// Peak-at-midpoint triangular kernel for `atr_ratio = atr_15m/price`:
/// `1.0` at the midpoint of `[lo, hi]`, decaying linearly to `0.0` at the
/// band edges and beyond.
fn triangular_quality(value: f64, lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        return 0.0;
    }
    let mid = (lo + hi) / 2.0;
    let half_width = (hi - lo) / 2.0;
    let distance = (value - mid).abs();
    (1.0 - distance / half_width).clamp(0.0, 1.0)
}

impl ScanMetrics {
    pub fn compute(market_data: &MarketData) -> Self {
        let volumes = market_data.volumes();
        let vol_surge_1h = indicators::volume_surge_1h(&volumes).unwrap_or(1.0);
        let vol_surge_5m = indicators::volume_surge_5m(&volumes).unwrap_or(1.0);

        let atr_ratio = breakout_markets::safe_divide(market_data.atr_15m, market_data.price)
            .unwrap_or(0.0);
        let atr_quality = triangular_quality(atr_ratio, 0.015, 0.035);

        Self {
            vol_surge_1h,
            vol_surge_5m,
            atr_quality,
            oi_delta_24h: market_data.oi_change_24h.unwrap_or(0.0),
            bb_width_pct: market_data.bb_width_pct,
            btc_correlation: market_data.btc_correlation,
            trades_per_minute: market_data.trades_per_minute,
            liquidity_score: market_data.liquidity_score(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangular_quality_peaks_at_midpoint() {
        assert!((triangular_quality(0.025, 0.015, 0.035) - 1.0).abs() < 1e-9);
        assert_eq!(triangular_quality(0.015, 0.015, 0.035), 0.0);
        assert_eq!(triangular_quality(0.005, 0.015, 0.035), 0.0);
    }
}
