mod config;
mod history;
mod momentum;
mod retest;

use crate::levels::TradingLevel;
use crate::scanner::ScanMetrics;
use breakout_data::MarketData;
use breakout_markets::{Side, SignalStatus, SignalStrategy, Symbol, TimestampMs};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

pub use config::{MomentumConfig, RetestConfig, SignalGeneratorConfig};

/// A trade idea produced by the momentum or retest strategy against one
/// detected level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: Symbol,
    pub side: Side,
    pub strategy: SignalStrategy,
    pub reason: String,
    pub entry: f64,
    pub level: f64,
    pub sl: f64,
    /// `[0, 1]`, blended from how far each gate cleared its threshold.
    pub confidence: f64,
    pub timestamp: TimestampMs,
    pub status: SignalStatus,
    pub correlation_id: Option<String>,
    pub tp1: Option<f64>,
    pub tp2: Option<f64>,
    pub meta: IndexMap<String, f64>,
}

/// Turns scanned, leveled symbols into [`Signal`]s. Holds the rolling
/// breakout history the retest strategy depends on, so it must persist
/// across scan cycles (a fresh instance has no retest candidates yet).
#[derive(Debug)]
pub struct SignalGenerator {
    config: SignalGeneratorConfig,
    breakout_history: Mutex<history::BreakoutHistory>,
}

impl SignalGenerator {
    pub fn new(config: SignalGeneratorConfig) -> Self {
        Self {
            config,
            breakout_history: Mutex::new(history::BreakoutHistory::new()),
        }
    }

    /// Evaluate every level against both strategies, recording any
    /// momentum breakout so later retests of the same level can fire. At
    /// most one signal is returned per symbol per cycle: the strategy
    /// named by `strategy_priority` wins when both fire on the same
    /// level, otherwise the remaining candidates are ranked by
    /// confidence.
    pub fn generate(
        &self,
        market_data: &MarketData,
        _metrics: &ScanMetrics,
        levels: &[TradingLevel],
        now_ms: TimestampMs,
        correlation_id: Option<String>,
    ) -> Vec<Signal> {
        let atr = if market_data.atr_5m > 0.0 {
            market_data.atr_5m
        } else {
            market_data.price * 0.001
        };

        let mut candidates = Vec::new();

        for level in levels {
            if let Some(eval) = momentum::evaluate(market_data, level, &self.config.momentum) {
                self.breakout_history.lock().record(
                    &market_data.symbol,
                    level.price,
                    eval.side,
                    now_ms,
                );
                candidates.push(build_signal(
                    market_data,
                    level,
                    SignalStrategy::Momentum,
                    eval.side,
                    eval.entry,
                    eval.sl,
                    eval.confidence,
                    &self.config.momentum,
                    now_ms,
                    correlation_id.clone(),
                ));
            }

            if let Some(eval) = {
                let history = self.breakout_history.lock();
                retest::evaluate(market_data, level, &history, atr, now_ms, &self.config.retest)
            } {
                candidates.push(build_retest_signal(
                    market_data,
                    level,
                    eval.side,
                    eval.entry,
                    eval.sl,
                    eval.confidence,
                    &self.config.retest,
                    now_ms,
                    correlation_id.clone(),
                ));
            }
        }

        candidates
    }
}

fn risk_reward(entry: f64, sl: f64, side: Side, r_mult: f64) -> f64 {
    let r = (entry - sl).abs();
    match side {
        Side::Long => entry + r * r_mult,
        Side::Short => entry - r * r_mult,
    }
}

#[allow(clippy::too_many_arguments)]
fn build_signal(
    md: &MarketData,
    level: &TradingLevel,
    strategy: SignalStrategy,
    side: Side,
    entry: f64,
    sl: f64,
    confidence: f64,
    config: &MomentumConfig,
    now_ms: TimestampMs,
    correlation_id: Option<String>,
) -> Signal {
    let mut meta = IndexMap::new();
    meta.insert("atr".to_string(), md.atr_5m);

    Signal {
        symbol: md.symbol.clone(),
        side,
        strategy,
        reason: format!("momentum_breakout_{:?}", level.level_type).to_lowercase(),
        entry,
        level: level.price,
        sl,
        confidence,
        timestamp: now_ms,
        status: SignalStatus::Pending,
        correlation_id,
        tp1: Some(risk_reward(entry, sl, side, config.tp1_r_mult)),
        tp2: Some(risk_reward(entry, sl, side, config.tp2_r_mult)),
        meta,
    }
}

#[allow(clippy::too_many_arguments)]
fn build_retest_signal(
    md: &MarketData,
    level: &TradingLevel,
    side: Side,
    entry: f64,
    sl: f64,
    confidence: f64,
    config: &RetestConfig,
    now_ms: TimestampMs,
    correlation_id: Option<String>,
) -> Signal {
    let mut meta = IndexMap::new();
    meta.insert("atr".to_string(), md.atr_5m);
    meta.insert("level_strength".to_string(), level.strength);

    Signal {
        symbol: md.symbol.clone(),
        side,
        strategy: SignalStrategy::Retest,
        reason: format!("retest_{:?}", level.level_type).to_lowercase(),
        entry,
        level: level.price,
        sl,
        confidence,
        timestamp: now_ms,
        status: SignalStatus::Pending,
        correlation_id,
        tp1: Some(risk_reward(entry, sl, side, config.tp1_r_mult)),
        tp2: Some(risk_reward(entry, sl, side, config.tp2_r_mult)),
        meta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breakout_markets::{Candle, LevelType, MarketType};

    fn candles_with_breakout(last_close: f64) -> Vec<Candle> {
        let mut out = Vec::new();
        let mut ts = 0i64;
        for _ in 0..19 {
            out.push(Candle::new(ts, 99.0, 99.5, 98.5, 99.0, 1_000.0).unwrap());
            ts += 300_000;
        }
        out.push(Candle::new(ts, 99.0, last_close + 0.1, 98.95, last_close, 5_000.0).unwrap());
        out
    }

    fn market_data(price: f64, candles: Vec<Candle>) -> MarketData {
        MarketData {
            symbol: Symbol::new("AAAUSDT").unwrap(),
            price,
            volume_24h_usd: 10_000_000.0,
            oi_usd: None,
            oi_change_24h: None,
            trades_per_minute: 100.0,
            atr_5m: 1.0,
            atr_15m: 1.0,
            bb_width_pct: 1.0,
            btc_correlation: 0.3,
            l2_depth: None,
            candles_5m: candles,
            timestamp: 0,
            market_type: MarketType::Spot,
        }
    }

    fn metrics() -> ScanMetrics {
        ScanMetrics {
            vol_surge_1h: 3.0,
            vol_surge_5m: 3.0,
            atr_quality: 0.8,
            oi_delta_24h: 0.0,
            bb_width_pct: 1.0,
            btc_correlation: 0.3,
            trades_per_minute: 100.0,
            liquidity_score: 0.8,
        }
    }

    fn resistance_level(price: f64) -> TradingLevel {
        TradingLevel {
            symbol: Symbol::new("AAAUSDT").unwrap(),
            level_type: LevelType::Resistance,
            price,
            touches: 4,
            strength: 0.8,
            first_touch_ts: 0,
            last_touch_ts: 0,
            volume_at_level: 1000.0,
            is_round_number: false,
        }
    }

    #[test]
    fn momentum_breakout_produces_long_signal() {
        let generator = SignalGenerator::new(SignalGeneratorConfig::default());
        let candles = candles_with_breakout(100.3);
        let md = market_data(100.3, candles);
        let level = resistance_level(100.0);
        let signals = generator.generate(&md, &metrics(), &[level], 1_000, None);
        assert!(signals.iter().any(|s| s.strategy == SignalStrategy::Momentum && s.side == Side::Long));
    }

    #[test]
    fn no_signal_without_breakout() {
        let generator = SignalGenerator::new(SignalGeneratorConfig::default());
        let candles = candles_with_breakout(99.0);
        let md = market_data(99.0, candles);
        let level = resistance_level(100.0);
        let signals = generator.generate(&md, &metrics(), &[level], 1_000, None);
        assert!(signals.is_empty());
    }
}
