use super::config::MomentumConfig;
use crate::levels::TradingLevel;
use breakout_data::indicators::{median, vwap};
use breakout_markets::{safe_divide, Candle, L2Depth, LevelType, Side};

/// Result of running the momentum gates against one level: whether every
/// gate passed, the side, the computed entry and the raw confidence input.
pub(super) struct MomentumEvaluation {
    pub confidence: f64,
    pub side: Side,
    pub entry: f64,
    pub sl: f64,
}

fn swing_low(candles: &[Candle], lookback: usize) -> f64 {
    candles
        .iter()
        .rev()
        .take(lookback)
        .map(|c| c.low)
        .fold(f64::INFINITY, f64::min)
}

fn swing_high(candles: &[Candle], lookback: usize) -> f64 {
    candles
        .iter()
        .rev()
        .take(lookback)
        .map(|c| c.high)
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Momentum fires when price closes through a level with conviction:
/// enough of a break past the level, a volume surge, a strong candle body,
/// order-book imbalance in the breakout direction (only checked when L2
/// depth is present), and a bounded VWAP gap. Every gate must pass;
/// confidence is the average margin by which they cleared their threshold.
pub(super) fn evaluate(
    md: &breakout_data::MarketData,
    level: &TradingLevel,
    config: &MomentumConfig,
) -> Option<MomentumEvaluation> {
    let candles = &md.candles_5m;
    let last = candles.last()?;
    if candles.len() < 11 {
        return None;
    }

    let side = match level.level_type {
        LevelType::Resistance => Side::Long,
        LevelType::Support => Side::Short,
    };

    let price_breakout = match side {
        Side::Long => last.close > level.price * (1.0 + config.momentum_epsilon),
        Side::Short => last.close < level.price * (1.0 - config.momentum_epsilon),
    };

    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
    let prior = &volumes[..volumes.len() - 1];
    let prior_window = &prior[prior.len().saturating_sub(19)..];
    let vol_surge = safe_divide(last.volume, median(prior_window)).unwrap_or(0.0);
    let volume_surge_ok = vol_surge >= config.volume_multiplier;

    let body_ratio = last.body_ratio();
    let body_ratio_ok = body_ratio >= config.body_ratio_min;

    let (l2_imbalance_ok, abs_imbalance) = match &md.l2_depth {
        Some(depth) => (depth.imbalance.abs() >= config.l2_imbalance_threshold, depth.imbalance.abs()),
        None => (true, 0.0),
    };

    let vwap_value = vwap(candles).unwrap_or(md.price);
    let atr = if md.atr_5m > 0.0 { md.atr_5m } else { md.price * 0.001 };
    let vwap_gap_ratio = safe_divide((md.price - vwap_value).abs(), md.price).unwrap_or(0.0);
    let vwap_gap_limit = safe_divide(atr, md.price).unwrap_or(0.0) * config.vwap_gap_max_atr;
    let vwap_gap_ok = vwap_gap_ratio <= vwap_gap_limit;

    if !(price_breakout && volume_surge_ok && body_ratio_ok && l2_imbalance_ok && vwap_gap_ok) {
        return None;
    }

    let entry = match side {
        Side::Long => level.price * (1.0 + config.momentum_epsilon),
        Side::Short => level.price * (1.0 - config.momentum_epsilon),
    };
    // `max(swing_low, entry - k*ATR)` for longs: whichever floor sits
    // closer to entry. Symmetric for shorts.
    let atr_stop = config.sl_atr_mult * atr;
    let sl = match side {
        Side::Long => swing_low(candles, 10).max(entry - atr_stop),
        Side::Short => swing_high(candles, 10).min(entry + atr_stop),
    };

    let margins = [
        safe_divide(vol_surge, config.volume_multiplier).unwrap_or(1.0),
        safe_divide(body_ratio, config.body_ratio_min).unwrap_or(1.0),
        safe_divide(abs_imbalance, config.l2_imbalance_threshold.max(1e-6)).unwrap_or(1.0),
    ];
    let confidence = (margins.iter().sum::<f64>() / margins.len() as f64 / 2.0).clamp(0.1, 1.0);

    Some(MomentumEvaluation { confidence, side, entry, sl })
}

#[cfg(test)]
mod tests {
    use super::*;
    use breakout_markets::{MarketType, Symbol};

    fn candles(volumes: &[f64], last_open: f64, last_high: f64, last_low: f64, last_close: f64) -> Vec<Candle> {
        let mut out = Vec::new();
        let mut ts = 0i64;
        for (i, v) in volumes.iter().enumerate() {
            if i + 1 == volumes.len() {
                out.push(Candle::new(ts, last_open, last_high, last_low, last_close, *v).unwrap());
            } else {
                out.push(Candle::new(ts, 49_900.0, 49_950.0, 49_850.0, 49_900.0, *v).unwrap());
            }
            ts += 300_000;
        }
        out
    }

    fn level(price: f64, level_type: LevelType) -> TradingLevel {
        TradingLevel {
            symbol: Symbol::new("BTCUSDT").unwrap(),
            level_type,
            price,
            touches: 3,
            strength: 0.7,
            first_touch_ts: 0,
            last_touch_ts: 0,
            volume_at_level: 1_000.0,
            is_round_number: false,
        }
    }

    /// Spec §8 scenario 1: the literal momentum-pass numbers.
    #[test]
    fn spec_scenario_one_momentum_pass() {
        let mut volumes = vec![1_000.0; 19];
        volumes.push(5_000.0);
        let md = breakout_data::MarketData {
            symbol: Symbol::new("BTCUSDT").unwrap(),
            price: 50_200.0,
            volume_24h_usd: 50_000_000.0,
            oi_usd: None,
            oi_change_24h: None,
            trades_per_minute: 100.0,
            atr_5m: 100.0,
            atr_15m: 150.0,
            bb_width_pct: 1.0,
            btc_correlation: 0.3,
            l2_depth: None,
            candles_5m: candles(&volumes, 49_950.0, 50_250.0, 49_900.0, 50_200.0),
            timestamp: 0,
            market_type: MarketType::Futures,
        };
        let level = level(50_000.0, LevelType::Resistance);
        let config = MomentumConfig::default();

        let eval = evaluate(&md, &level, &config).expect("all gates should pass");
        assert_eq!(eval.side, Side::Long);
        assert!((eval.entry - 50_100.0).abs() < 1e-6);
    }

    /// Spec §8 scenario 1 with its L2 depth included: imbalance=+0.5,
    /// spread_bps=10, threshold 0.2 -> `|imbalance| >= threshold` passes
    /// regardless of side, since the gate is direction-agnostic.
    #[test]
    fn spec_scenario_one_momentum_pass_with_l2_depth() {
        let mut volumes = vec![1_000.0; 19];
        volumes.push(5_000.0);
        let md = breakout_data::MarketData {
            symbol: Symbol::new("BTCUSDT").unwrap(),
            price: 50_200.0,
            volume_24h_usd: 50_000_000.0,
            oi_usd: None,
            oi_change_24h: None,
            trades_per_minute: 100.0,
            atr_5m: 100.0,
            atr_15m: 150.0,
            bb_width_pct: 1.0,
            btc_correlation: 0.3,
            l2_depth: Some(L2Depth::new(50_195.0, 50_205.0, 100_000.0, 150_000.0, 100_000.0, 150_000.0, 10.0, 0.5).unwrap()),
            candles_5m: candles(&volumes, 49_950.0, 50_250.0, 49_900.0, 50_200.0),
            timestamp: 0,
            market_type: MarketType::Futures,
        };
        let level = level(50_000.0, LevelType::Resistance);
        let config = MomentumConfig::default();

        let eval = evaluate(&md, &level, &config).expect("all gates including l2_imbalance should pass");
        assert_eq!(eval.side, Side::Long);
        assert!((eval.entry - 50_100.0).abs() < 1e-6);
    }

    /// A negative imbalance is just as valid as a positive one for this
    /// gate: only the magnitude is checked, never the sign.
    #[test]
    fn negative_imbalance_still_passes_on_magnitude() {
        let mut volumes = vec![1_000.0; 19];
        volumes.push(5_000.0);
        let md = breakout_data::MarketData {
            symbol: Symbol::new("BTCUSDT").unwrap(),
            price: 50_200.0,
            volume_24h_usd: 50_000_000.0,
            oi_usd: None,
            oi_change_24h: None,
            trades_per_minute: 100.0,
            atr_5m: 100.0,
            atr_15m: 150.0,
            bb_width_pct: 1.0,
            btc_correlation: 0.3,
            l2_depth: Some(L2Depth::new(50_195.0, 50_205.0, 100_000.0, 150_000.0, 100_000.0, 150_000.0, 10.0, -0.5).unwrap()),
            candles_5m: candles(&volumes, 49_950.0, 50_250.0, 49_900.0, 50_200.0),
            timestamp: 0,
            market_type: MarketType::Futures,
        };
        let level = level(50_000.0, LevelType::Resistance);
        let config = MomentumConfig::default();

        assert!(evaluate(&md, &level, &config).is_some());
    }

    #[test]
    fn no_breakout_yields_no_signal() {
        let volumes = vec![1_000.0; 20];
        let md = breakout_data::MarketData {
            symbol: Symbol::new("BTCUSDT").unwrap(),
            price: 49_990.0,
            volume_24h_usd: 50_000_000.0,
            oi_usd: None,
            oi_change_24h: None,
            trades_per_minute: 100.0,
            atr_5m: 100.0,
            atr_15m: 150.0,
            bb_width_pct: 1.0,
            btc_correlation: 0.3,
            l2_depth: None,
            candles_5m: candles(&volumes, 49_900.0, 49_995.0, 49_890.0, 49_990.0),
            timestamp: 0,
            market_type: MarketType::Futures,
        };
        let level = level(50_000.0, LevelType::Resistance);
        assert!(evaluate(&md, &level, &MomentumConfig::default()).is_none());
    }
}
