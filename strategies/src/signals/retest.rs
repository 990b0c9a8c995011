use super::config::RetestConfig;
use super::history::BreakoutHistory;
use crate::levels::TradingLevel;
use breakout_markets::{safe_divide, L2Depth, LevelType, Side, TimestampMs};

pub(super) struct RetestEvaluation {
    pub confidence: f64,
    pub side: Side,
    pub entry: f64,
    pub sl: f64,
}

/// Retest fires when price returns to a level that previously broke, with
/// enough trading activity and book imbalance to suggest the level is
/// about to hold again. A prior momentum breakout of the same level,
/// recorded in `history` within 1-24h, is preferred but not required: its
/// absence falls back to the level-type default (former resistance long,
/// former support short — the only reading under which that default and
/// "inherit the breakout side when known" agree with each other).
pub(super) fn evaluate(
    md: &breakout_data::MarketData,
    level: &TradingLevel,
    history: &BreakoutHistory,
    atr: f64,
    now_ms: TimestampMs,
    config: &RetestConfig,
) -> Option<RetestEvaluation> {
    let level_retest = safe_divide((md.price - level.price).abs(), level.price)
        .map(|ratio| ratio <= config.level_retest_pct)
        .unwrap_or(false);

    let pierce_amount = (level.price - md.price).abs();
    let pierce_ok = pierce_amount <= config.max_pierce_atr * atr;

    let candles = &md.candles_5m;
    let trading_activity_ok = if candles.len() >= 20 {
        let recent: f64 = candles[candles.len() - 5..].iter().map(|c| c.volume).sum::<f64>() / 5.0;
        let prior: f64 = candles[candles.len() - 20..candles.len() - 5].iter().map(|c| c.volume).sum::<f64>() / 15.0;
        safe_divide(recent, prior).map(|r| r >= config.trading_activity_min).unwrap_or(true)
    } else {
        true
    };

    let directional_side_for_history = match level.level_type {
        LevelType::Resistance => Side::Long,
        LevelType::Support => Side::Short,
    };
    let hours_since_breakout = history.hours_since_recent_breakout(
        &md.symbol,
        level.price,
        config.max_pierce_atr * atr,
        directional_side_for_history,
        now_ms,
        config.breakout_lookback_min_hours,
        config.breakout_lookback_max_hours,
    );
    let side = directional_side_for_history;

    let l2_imbalance_ok = md
        .l2_depth
        .as_ref()
        .map(|depth| depth.imbalance.abs() >= config.l2_imbalance_threshold)
        .unwrap_or(true);

    if !(level_retest && pierce_ok && trading_activity_ok && l2_imbalance_ok) {
        return None;
    }

    let entry = match side {
        Side::Long => level.price * (1.0 + config.entry_offset_pct),
        Side::Short => level.price * (1.0 - config.entry_offset_pct),
    };
    let sl = match side {
        Side::Long => level.price - config.sl_atr_mult * atr,
        Side::Short => level.price + config.sl_atr_mult * atr,
    };

    let recency_factor = hours_since_breakout
        .map(|hours| (1.0 - hours / 24.0).max(0.3))
        .unwrap_or(0.5);
    let pierce_margin = safe_divide(
        config.max_pierce_atr * atr - pierce_amount,
        (config.max_pierce_atr * atr).max(1e-9),
    )
    .unwrap_or(0.0)
    .clamp(0.0, 1.0);
    let confidence = (0.4 * pierce_margin + 0.3 * recency_factor + 0.3 * level.strength).clamp(0.1, 1.0);

    Some(RetestEvaluation { confidence, side, entry, sl })
}

#[cfg(test)]
mod tests {
    use super::*;
    use breakout_markets::Symbol;

    fn level(price: f64, level_type: LevelType) -> TradingLevel {
        TradingLevel {
            symbol: Symbol::new("BTCUSDT").unwrap(),
            level_type,
            price,
            touches: 4,
            strength: 0.6,
            first_touch_ts: 0,
            last_touch_ts: 0,
            volume_at_level: 500.0,
            is_round_number: false,
        }
    }

    fn market_data(price: f64) -> breakout_data::MarketData {
        breakout_data::MarketData {
            symbol: Symbol::new("BTCUSDT").unwrap(),
            price,
            volume_24h_usd: 10_000_000.0,
            oi_usd: None,
            oi_change_24h: None,
            trades_per_minute: 50.0,
            atr_5m: 100.0,
            atr_15m: 150.0,
            bb_width_pct: 1.0,
            btc_correlation: 0.3,
            l2_depth: None,
            candles_5m: Vec::new(),
            timestamp: 0,
            market_type: breakout_markets::MarketType::Futures,
        }
    }

    /// Spec §8 scenario 2: too far from the level to be a retest.
    #[test]
    fn too_far_from_level_fails_retest() {
        let md = market_data(51_050.0);
        let level = level(50_000.0, LevelType::Resistance);
        let history = BreakoutHistory::new();
        let result = evaluate(&md, &level, &history, 100.0, 1_000_000, &RetestConfig::default());
        assert!(result.is_none());
    }

    #[test]
    fn within_tolerance_with_recent_breakout_fires() {
        let md = market_data(50_010.0);
        let level = level(50_000.0, LevelType::Resistance);
        let mut history = BreakoutHistory::new();
        let breakout_ts = 1_000_000 - (2.0 * 3_600_000.0) as i64;
        history.record(&Symbol::new("BTCUSDT").unwrap(), 50_000.0, Side::Long, breakout_ts);
        let result = evaluate(&md, &level, &history, 100.0, 1_000_000, &RetestConfig::default());
        assert!(result.is_some());
        let eval = result.unwrap();
        assert_eq!(eval.side, Side::Long);
    }

    /// `l2_imbalance_ok` checks `|imbalance|` only, never its sign: a
    /// resistance retest (side=Long) still passes with a negative
    /// imbalance whose magnitude clears the threshold.
    #[test]
    fn l2_imbalance_gate_is_direction_agnostic() {
        let mut md = market_data(50_010.0);
        md.l2_depth = Some(L2Depth::new(50_005.0, 50_015.0, 50_000.0, 75_000.0, 50_000.0, 75_000.0, 10.0, -0.5).unwrap());
        let level = level(50_000.0, LevelType::Resistance);
        let history = BreakoutHistory::new();

        let result = evaluate(&md, &level, &history, 100.0, 1_000_000, &RetestConfig::default());
        assert!(result.is_some(), "negative imbalance magnitude should still clear the threshold");
        assert_eq!(result.unwrap().side, Side::Long);
    }

    /// Imbalance magnitude below the threshold rejects regardless of sign.
    #[test]
    fn l2_imbalance_below_threshold_rejects() {
        let mut md = market_data(50_010.0);
        md.l2_depth = Some(L2Depth::new(50_005.0, 50_015.0, 50_000.0, 52_000.0, 50_000.0, 52_000.0, 10.0, 0.05).unwrap());
        let level = level(50_000.0, LevelType::Resistance);
        let history = BreakoutHistory::new();

        let result = evaluate(&md, &level, &history, 100.0, 1_000_000, &RetestConfig::default());
        assert!(result.is_none());
    }
}
