use crate::scanner::config::ScannerConfig;
use crate::scanner::metrics::ScanMetrics;
use breakout_data::MarketData;
use breakout_markets::MarketType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Diagnostic detail recorded for one filter evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDetail {
    pub passed: bool,
    pub value: f64,
    pub threshold: f64,
    pub reason: String,
}

/// All filters evaluated against one symbol, keyed by filter name. Every
/// filter always runs — nothing short-circuits — so diagnostics show the
/// full picture even for a rejected symbol.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub results: IndexMap<String, bool>,
    pub details: IndexMap<String, FilterDetail>,
}

impl FilterOutcome {
    pub fn passed_all(&self) -> bool {
        self.results.values().all(|&p| p)
    }
}

fn record(
    out: &mut FilterOutcome,
    name: &str,
    passed: bool,
    value: f64,
    threshold: f64,
    reason: impl Into<String>,
) {
    out.results.insert(name.to_string(), passed);
    out.details.insert(
        name.to_string(),
        FilterDetail {
            passed,
            value,
            threshold,
            reason: reason.into(),
        },
    );
}

/// Evaluate every liquidity, volatility, correlation and data-health filter
/// for one symbol. Returns a result regardless of pass/fail — the
/// caller decides whether to drop the candidate.
pub fn evaluate(market_data: &MarketData, metrics: &ScanMetrics, config: &ScannerConfig) -> FilterOutcome {
    let mut out = FilterOutcome {
        results: IndexMap::new(),
        details: IndexMap::new(),
    };

    evaluate_liquidity(&mut out, market_data, config);
    evaluate_volatility(&mut out, market_data, metrics, config);
    evaluate_correlation(&mut out, metrics, config);
    evaluate_data_health(&mut out, market_data, config);

    out
}

fn evaluate_liquidity(out: &mut FilterOutcome, md: &MarketData, config: &ScannerConfig) {
    let liq = &config.liquidity;

    record(
        out,
        "24h_volume_usd",
        md.volume_24h_usd >= liq.min_24h_volume_usd,
        md.volume_24h_usd,
        liq.min_24h_volume_usd,
        "24h USD volume vs minimum",
    );

    let oi_passed = match (md.market_type, liq.min_oi_usd) {
        (MarketType::Futures, Some(min_oi)) => md.oi_usd.unwrap_or(0.0) >= min_oi,
        _ => true,
    };
    record(
        out,
        "open_interest",
        oi_passed,
        md.oi_usd.unwrap_or(0.0),
        liq.min_oi_usd.unwrap_or(0.0),
        "futures OI floor (auto-pass for spot or unset threshold)",
    );

    match &md.l2_depth {
        None => {
            record(out, "spread_bps", true, 0.0, liq.max_spread_bps, "auto-pass: no L2 depth");
            record(out, "depth_0_3pct", true, 0.0, liq.min_depth_0_3pct_usd, "auto-pass: no L2 depth");
            record(out, "depth_0_5pct", true, 0.0, liq.min_depth_0_5pct_usd, "auto-pass: no L2 depth");
        }
        Some(depth) => {
            record(
                out,
                "spread_bps",
                depth.spread_bps <= liq.max_spread_bps,
                depth.spread_bps,
                liq.max_spread_bps,
                "spread vs maximum",
            );
            record(
                out,
                "depth_0_3pct",
                depth.total_depth_0_3pct() >= liq.min_depth_0_3pct_usd,
                depth.total_depth_0_3pct(),
                liq.min_depth_0_3pct_usd,
                "0.3% band notional vs minimum",
            );
            record(
                out,
                "depth_0_5pct",
                depth.total_depth_0_5pct() >= liq.min_depth_0_5pct_usd,
                depth.total_depth_0_5pct(),
                liq.min_depth_0_5pct_usd,
                "0.5% band notional vs minimum",
            );
        }
    }

    record(
        out,
        "trades_per_minute",
        md.trades_per_minute >= liq.min_trades_per_minute,
        md.trades_per_minute,
        liq.min_trades_per_minute,
        "trade flow vs minimum",
    );
}

fn evaluate_volatility(out: &mut FilterOutcome, md: &MarketData, metrics: &ScanMetrics, config: &ScannerConfig) {
    let vol = &config.volatility;

    let atr_ratio = breakout_markets::safe_divide(md.atr_15m, md.price).unwrap_or(0.0);
    record(
        out,
        "atr_range",
        atr_ratio >= vol.atr_range_min && atr_ratio <= vol.atr_range_max,
        atr_ratio,
        vol.atr_range_max,
        "atr_15m/price vs configured band",
    );

    record(
        out,
        "bb_width_pct",
        metrics.bb_width_pct <= vol.bb_width_percentile_max,
        metrics.bb_width_pct,
        vol.bb_width_percentile_max,
        "Bollinger width vs maximum",
    );

    record(
        out,
        "vol_surge_1h",
        metrics.vol_surge_1h >= vol.vol_surge_1h_min,
        metrics.vol_surge_1h,
        vol.vol_surge_1h_min,
        "1h volume surge vs minimum",
    );

    record(
        out,
        "vol_surge_5m",
        metrics.vol_surge_5m >= vol.vol_surge_5m_min,
        metrics.vol_surge_5m,
        vol.vol_surge_5m_min,
        "5m volume surge vs minimum",
    );

    let oi_passed = vol
        .oi_delta_24h_min
        .map(|min| metrics.oi_delta_24h >= min)
        .unwrap_or(true);
    record(
        out,
        "oi_delta_24h",
        oi_passed,
        metrics.oi_delta_24h,
        vol.oi_delta_24h_min.unwrap_or(0.0),
        "OI delta vs minimum (auto-pass if unset)",
    );
}

fn evaluate_correlation(out: &mut FilterOutcome, metrics: &ScanMetrics, config: &ScannerConfig) {
    let limit = config.effective_max_btc_correlation();
    record(
        out,
        "btc_correlation",
        metrics.btc_correlation.abs() <= limit,
        metrics.btc_correlation.abs(),
        limit,
        "abs(BTC correlation) vs effective limit",
    );
}

/// Synthetic data-health filter: flags gaps, duplicates, missing
/// depth, blown-out spread, zero depth, and zero trade flow. Any failing
/// condition marks the symbol unfit and contributes its reason token.
fn evaluate_data_health(out: &mut FilterOutcome, md: &MarketData, config: &ScannerConfig) {
    let mut reasons = Vec::new();

    if let Some(gap_ratio) = ohlcv_gap_ratio(md) {
        if gap_ratio > 0.2 {
            reasons.push("ohlcv_gap");
        }
    }
    if has_duplicate_timestamps(md) {
        reasons.push("duplicate_candles");
    }
    match &md.l2_depth {
        None => reasons.push("missing_depth"),
        Some(depth) => {
            if depth.total_depth_0_3pct() <= 0.0 && depth.total_depth_0_5pct() <= 0.0 {
                reasons.push("zero_depth");
            }
            if depth.spread_bps > 2.0 * config.liquidity.max_spread_bps {
                reasons.push("spread_blown_out");
            }
        }
    }
    if md.trades_per_minute <= 0.0 {
        reasons.push("zero_trades_per_minute");
    }

    let passed = reasons.is_empty();
    record(
        out,
        "data_health",
        passed,
        reasons.len() as f64,
        0.0,
        if passed {
            "ok".to_string()
        } else {
            reasons.join(",")
        },
    );
}

/// Fraction of consecutive candle gaps deviating more than 20% from the
/// expected 5-minute cadence.
fn ohlcv_gap_ratio(md: &MarketData) -> Option<f64> {
    if md.candles_5m.len() < 2 {
        return None;
    }
    let expected_ms = 5 * 60 * 1000;
    let mut gap_count = 0;
    let mut total = 0;
    for pair in md.candles_5m.windows(2) {
        let delta = (pair[1].ts - pair[0].ts).unsigned_abs() as f64;
        total += 1;
        if (delta - expected_ms as f64).abs() / expected_ms as f64 > 0.2 {
            gap_count += 1;
        }
    }
    breakout_markets::safe_divide(gap_count as f64, total as f64)
}

fn has_duplicate_timestamps(md: &MarketData) -> bool {
    let mut seen = std::collections::HashSet::new();
    md.candles_5m.iter().any(|c| !seen.insert(c.ts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::config::{LiquidityFilters, ScoreWeights, VolatilityFilters};
    use breakout_markets::{L2Depth, Symbol};

    fn config(max_spread_bps: f64) -> ScannerConfig {
        ScannerConfig {
            liquidity: LiquidityFilters {
                min_24h_volume_usd: 0.0,
                min_oi_usd: None,
                max_spread_bps,
                min_depth_0_3pct_usd: 0.0,
                min_depth_0_5pct_usd: 0.0,
                min_trades_per_minute: 0.0,
            },
            volatility: VolatilityFilters {
                atr_range_min: 0.0,
                atr_range_max: 1.0,
                bb_width_percentile_max: 100.0,
                vol_surge_1h_min: 0.0,
                vol_surge_5m_min: 0.0,
                oi_delta_24h_min: None,
            },
            max_btc_correlation: 0.95,
            weights: ScoreWeights::default(),
            whitelist: None,
            blacklist: None,
            top_n_by_volume: None,
            max_candidates: 10,
        }
    }

    fn market_data(spread_bps: f64) -> MarketData {
        MarketData {
            symbol: Symbol::new("AAAUSDT").unwrap(),
            price: 100.0,
            volume_24h_usd: 1_000_000.0,
            oi_usd: None,
            oi_change_24h: None,
            trades_per_minute: 50.0,
            atr_5m: 1.0,
            atr_15m: 1.5,
            bb_width_pct: 1.0,
            btc_correlation: 0.1,
            l2_depth: Some(L2Depth::new(99.9, 100.1, 10_000.0, 15_000.0, 10_000.0, 15_000.0, spread_bps, 0.0).unwrap()),
            candles_5m: Vec::new(),
            timestamp: 0,
            market_type: breakout_markets::MarketType::Spot,
        }
    }

    #[test]
    fn spread_over_twice_the_max_fails_data_health() {
        let cfg = config(10.0);
        let md = market_data(25.0);
        let mut out = FilterOutcome { results: IndexMap::new(), details: IndexMap::new() };
        evaluate_data_health(&mut out, &md, &cfg);
        assert!(!out.results["data_health"]);
        assert!(out.details["data_health"].reason.contains("spread_blown_out"));
    }

    #[test]
    fn spread_within_twice_the_max_passes_data_health() {
        let cfg = config(10.0);
        let md = market_data(15.0);
        let mut out = FilterOutcome { results: IndexMap::new(), details: IndexMap::new() };
        evaluate_data_health(&mut out, &md, &cfg);
        assert!(out.results["data_health"]);
    }
}
