//! Data-quality assessment: a standing health check over a symbol's
//! recent candle stream, separate from the scanner's inline data-health
//! filter. Operators run this over a universe on a schedule; it never
//! gates the live cycle by itself.

use crate::indicators::atr;
use breakout_markets::{Candle, TimestampMs};

/// Scored [0,1] across completeness, freshness, consistency and
/// stability, folded into a single `overall_score` the same way the
/// scanner folds filter components into a `ScanResult.score`.
#[derive(Debug, Clone, PartialEq)]
pub struct DqaMetrics {
    pub symbol: String,
    pub ohlcv_gaps: usize,
    pub ohlcv_total_expected: usize,
    pub duplicate_candles: usize,
    pub price_teleports: usize,
    pub completeness_score: f64,
    pub freshness_score: f64,
    pub consistency_score: f64,
    pub stability_score: f64,
    pub overall_score: f64,
    pub checked_at: TimestampMs,
    pub errors: Vec<String>,
}

impl DqaMetrics {
    fn empty(symbol: &str, checked_at: TimestampMs) -> Self {
        Self {
            symbol: symbol.to_string(),
            ohlcv_gaps: 0,
            ohlcv_total_expected: 0,
            duplicate_candles: 0,
            price_teleports: 0,
            completeness_score: 0.0,
            freshness_score: 0.0,
            consistency_score: 0.0,
            stability_score: 0.0,
            overall_score: 0.0,
            checked_at,
            errors: Vec::new(),
        }
    }
}

/// Candle cadence the assessment checks gaps against, in milliseconds.
/// 5-minute bars are what the provider fetches for every symbol, so that
/// is the only cadence this assessment needs to know about.
const TIMEFRAME_MS: i64 = 5 * 60 * 1000;

/// Bar ranges wider than this multiple of ATR(14) are flagged as price
/// teleports rather than genuine volatility.
const DEFAULT_TELEPORT_ATR_MULTIPLIER: f64 = 5.0;

/// Runs every check over one symbol's candle window and folds the
/// per-dimension scores into `overall_score`. `now_ms` is the caller's
/// clock, passed in rather than read internally so the assessment stays
/// pure and testable.
pub fn assess(symbol: &str, candles: &[Candle], now_ms: TimestampMs) -> DqaMetrics {
    let mut metrics = DqaMetrics::empty(symbol, now_ms);

    if candles.is_empty() {
        metrics.errors.push("no OHLCV data available".to_string());
        return metrics;
    }

    check_completeness(candles, &mut metrics);
    check_freshness(candles, now_ms, &mut metrics);
    check_uniqueness(candles, &mut metrics);
    check_consistency(candles, &mut metrics);
    check_stability(candles, &mut metrics);
    calculate_overall_score(&mut metrics);

    metrics
}

fn check_completeness(candles: &[Candle], metrics: &mut DqaMetrics) {
    if candles.len() < 2 {
        return;
    }

    let mut gaps = 0;
    for window in candles.windows(2) {
        let [prev, cur] = window else { unreachable!() };
        let expected_ts = prev.ts + TIMEFRAME_MS;
        if cur.ts - expected_ts > TIMEFRAME_MS * 3 / 2 {
            gaps += 1;
        }
    }

    let time_range_ms = candles.last().unwrap().ts - candles.first().unwrap().ts;
    let expected_bars = (time_range_ms / TIMEFRAME_MS) as usize + 1;

    metrics.ohlcv_gaps = gaps;
    metrics.ohlcv_total_expected = expected_bars;

    if expected_bars > 0 {
        let gap_ratio = gaps as f64 / expected_bars as f64;
        metrics.completeness_score = (1.0 - gap_ratio * 5.0).max(0.0);
    }
}

fn check_freshness(candles: &[Candle], now_ms: TimestampMs, metrics: &mut DqaMetrics) {
    let Some(latest) = candles.last() else { return };
    let latency_ms = (now_ms - latest.ts) as f64;
    const MAX_ACCEPTABLE_LATENCY_MS: f64 = 60_000.0;
    metrics.freshness_score = if latency_ms < MAX_ACCEPTABLE_LATENCY_MS {
        1.0 - (latency_ms / MAX_ACCEPTABLE_LATENCY_MS)
    } else {
        0.0
    };
}

fn check_uniqueness(candles: &[Candle], metrics: &mut DqaMetrics) {
    let mut seen = std::collections::HashSet::with_capacity(candles.len());
    let mut duplicates = 0;
    for c in candles {
        if !seen.insert(c.ts) {
            duplicates += 1;
        }
    }
    metrics.duplicate_candles = duplicates;
}

fn check_consistency(candles: &[Candle], metrics: &mut DqaMetrics) {
    for candle in candles {
        if candle.low > candle.high {
            metrics.errors.push(format!(
                "invalid OHLC at {}: low ({}) > high ({})",
                candle.ts, candle.low, candle.high
            ));
        }
        if !(candle.low <= candle.open && candle.open <= candle.high) {
            metrics.errors.push(format!(
                "invalid open at {}: {} not in [{}, {}]",
                candle.ts, candle.open, candle.low, candle.high
            ));
        }
        if !(candle.low <= candle.close && candle.close <= candle.high) {
            metrics.errors.push(format!(
                "invalid close at {}: {} not in [{}, {}]",
                candle.ts, candle.close, candle.low, candle.high
            ));
        }
    }

    let error_ratio = metrics.errors.len() as f64 / candles.len() as f64;
    metrics.consistency_score = (1.0 - error_ratio * 10.0).max(0.0);
}

fn check_stability(candles: &[Candle], metrics: &mut DqaMetrics) {
    if candles.len() < 20 {
        return;
    }

    let mut teleports = 0;
    for i in 14..candles.len() {
        let Some(atr_val) = atr(&candles[..=i], 14) else { continue };
        let bar_range = candles[i].high - candles[i].low;
        if atr_val > 0.0 && bar_range > DEFAULT_TELEPORT_ATR_MULTIPLIER * atr_val {
            teleports += 1;
        }
    }
    metrics.price_teleports = teleports;

    let total_checks = candles.len() - 14;
    let anomaly_ratio = if total_checks > 0 { teleports as f64 / total_checks as f64 } else { 0.0 };
    metrics.stability_score = (1.0 - anomaly_ratio * 5.0).max(0.0);
}

fn calculate_overall_score(metrics: &mut DqaMetrics) {
    const WEIGHTS: [f64; 4] = [0.3, 0.2, 0.3, 0.2];
    let scores = [
        metrics.completeness_score,
        metrics.freshness_score,
        metrics.consistency_score,
        metrics.stability_score,
    ];
    metrics.overall_score = scores.iter().zip(WEIGHTS.iter()).map(|(s, w)| s * w).sum();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64, o: f64, h: f64, l: f64, c: f64, v: f64) -> Candle {
        Candle::new(ts, o, h, l, c, v).unwrap()
    }

    fn regular_series(n: usize) -> Vec<Candle> {
        (0..n as i64)
            .map(|i| candle(i * TIMEFRAME_MS, 100.0, 101.0, 99.0, 100.0, 10.0))
            .collect()
    }

    #[test]
    fn empty_candles_yields_zero_score_with_an_error() {
        let metrics = assess("AAAUSDT", &[], 0);
        assert_eq!(metrics.overall_score, 0.0);
        assert!(!metrics.errors.is_empty());
    }

    #[test]
    fn regular_cadence_has_no_gaps_and_full_completeness() {
        let candles = regular_series(30);
        let metrics = assess("AAAUSDT", &candles, candles.last().unwrap().ts);
        assert_eq!(metrics.ohlcv_gaps, 0);
        assert_eq!(metrics.completeness_score, 1.0);
    }

    #[test]
    fn a_missing_bar_is_recorded_as_a_gap() {
        let mut candles = regular_series(30);
        candles.remove(15);
        let metrics = assess("AAAUSDT", &candles, candles.last().unwrap().ts);
        assert_eq!(metrics.ohlcv_gaps, 1);
    }

    #[test]
    fn stale_latest_candle_scores_low_freshness() {
        let candles = regular_series(5);
        let latest_ts = candles.last().unwrap().ts;
        let metrics = assess("AAAUSDT", &candles, latest_ts + 120_000);
        assert_eq!(metrics.freshness_score, 0.0);
    }

    #[test]
    fn fresh_latest_candle_scores_high_freshness() {
        let candles = regular_series(5);
        let latest_ts = candles.last().unwrap().ts;
        let metrics = assess("AAAUSDT", &candles, latest_ts + 1_000);
        assert!(metrics.freshness_score > 0.9);
    }

    #[test]
    fn duplicate_timestamps_are_counted() {
        let mut candles = regular_series(10);
        let dup = candles[3];
        candles.push(dup);
        let metrics = assess("AAAUSDT", &candles, candles.last().unwrap().ts);
        assert_eq!(metrics.duplicate_candles, 1);
    }

    #[test]
    fn a_wide_range_bar_well_beyond_atr_is_flagged_as_a_teleport() {
        let mut candles = regular_series(25);
        let last = candles.len() - 1;
        candles[last] = candle(candles[last].ts, 100.0, 500.0, 50.0, 100.0, 10.0);
        let metrics = assess("AAAUSDT", &candles, candles.last().unwrap().ts);
        assert!(metrics.price_teleports >= 1);
    }

    #[test]
    fn overall_score_is_bounded_to_unit_interval() {
        let candles = regular_series(30);
        let metrics = assess("AAAUSDT", &candles, candles.last().unwrap().ts);
        assert!((0.0..=1.0).contains(&metrics.overall_score));
    }
}
