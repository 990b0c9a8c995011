use breakout_markets::{Symbol, TimestampMs};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Portfolio-wide guardrails: daily loss limit, drawdown from the day's
/// starting equity, concentration in BTC-correlated symbols and the
/// kill-switch's hard stop thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioConfig {
    /// Daily risk budget as a fraction of `daily_start_equity`: breaching
    /// this (`daily_risk_used > daily_risk_limit`) blocks new entries for
    /// the rest of the day, independent of the kill switch.
    pub daily_risk_limit: f64,
    /// Drawdown from `daily_start_equity`, as a fraction, past which the
    /// kill switch trips (only evaluated while `daily_pnl < 0`).
    pub kill_switch_loss_limit: f64,
    pub max_concurrent_positions: usize,
    pub max_correlated_exposure_pct: f64,
    /// Hard ceiling on a signal's own `|btc_correlation|`, independent of
    /// aggregate bucket exposure: a signal this tied to BTC is rejected
    /// outright rather than merely bucketed.
    pub max_abs_btc_correlation: f64,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            daily_risk_limit: 0.05,
            kill_switch_loss_limit: 0.10,
            max_concurrent_positions: 10,
            max_correlated_exposure_pct: 0.60,
            max_abs_btc_correlation: 0.85,
        }
    }
}

/// Point-in-time risk readout, per §4.7's `RiskMetrics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub total_equity: f64,
    pub used_equity: f64,
    pub total_risk_usd: f64,
    pub daily_pnl: f64,
    pub daily_risk_used: f64,
    pub max_drawdown: f64,
    pub open_positions_count: usize,
    pub kill_switch_active: bool,
    pub daily_limit_breached: bool,
    pub position_count_breached: bool,
    pub should_reduce_risk: bool,
}

/// Tracks equity over the trading day, the all-time high-water mark, and
/// per-bucket correlation exposure, and decides when the engine must stop
/// opening new risk.
#[derive(Debug, Clone)]
pub struct PortfolioMonitor {
    config: PortfolioConfig,
    daily_start_equity: f64,
    daily_start_ts: TimestampMs,
    high_water_mark: f64,
    kill_switch_active: bool,
    /// Notional exposure per correlation bucket (e.g. `"btc_correlated"`),
    /// accumulated by [`Self::record_position_open`] and released by
    /// [`Self::record_position_close`].
    correlation_exposure: IndexMap<String, f64>,
}

impl PortfolioMonitor {
    pub fn new(config: PortfolioConfig, starting_equity: f64, now_ms: TimestampMs) -> Self {
        Self {
            config,
            daily_start_equity: starting_equity,
            daily_start_ts: now_ms,
            high_water_mark: starting_equity,
            kill_switch_active: false,
            correlation_exposure: IndexMap::new(),
        }
    }

    /// Rolls `daily_start_equity` forward on a UTC day change or whenever
    /// equity has moved more than 10% from the current baseline — the
    /// same "baseline went stale" signal the daily-loss check itself
    /// depends on.
    pub fn roll_day_if_needed(&mut self, equity: f64, now_ms: TimestampMs) {
        const DAY_MS: i64 = 24 * 60 * 60 * 1000;
        let equity_drifted = breakout_markets::safe_divide(
            (equity - self.daily_start_equity).abs(),
            self.daily_start_equity,
        )
        .map(|ratio| ratio > 0.10)
        .unwrap_or(false);

        if now_ms - self.daily_start_ts >= DAY_MS || equity_drifted {
            self.daily_start_equity = equity;
            self.daily_start_ts = now_ms;
            self.kill_switch_active = false;
        }
    }

    pub fn record_position_open(&mut self, bucket: impl Into<String>, notional_usd: f64) {
        *self.correlation_exposure.entry(bucket.into()).or_insert(0.0) += notional_usd;
    }

    pub fn record_position_close(&mut self, bucket: impl Into<String>, notional_usd: f64) {
        let bucket = bucket.into();
        if let Some(exposure) = self.correlation_exposure.get_mut(&bucket) {
            *exposure = (*exposure - notional_usd).max(0.0);
        }
    }

    /// Whether opening `notional_usd` more in `bucket` would push that
    /// bucket's exposure past `max_correlated_exposure_pct` of total open
    /// notional (approximated here by equity, since the monitor doesn't
    /// track aggregate open notional directly).
    pub fn correlation_limit_breached(&self, bucket: &str, notional_usd: f64, equity: f64) -> bool {
        if equity <= 0.0 {
            return true;
        }
        let current = self.correlation_exposure.get(bucket).copied().unwrap_or(0.0);
        (current + notional_usd) / equity > self.config.max_correlated_exposure_pct
    }

    /// Recomputes [`RiskMetrics`] and flips the kill switch per §4.7:
    /// only while `daily_pnl < 0`, drawdown from the daily baseline past
    /// `kill_switch_loss_limit`, or `|daily_pnl|/equity` past `3x` the
    /// daily risk limit. Once tripped, stays latched until
    /// [`Self::roll_day_if_needed`] rolls the day.
    pub fn evaluate(&mut self, equity: f64, open_risk_usd: f64, open_positions_count: usize) -> RiskMetrics {
        self.high_water_mark = self.high_water_mark.max(equity);

        let daily_pnl = equity - self.daily_start_equity;
        let daily_risk_used =
            breakout_markets::safe_divide(daily_pnl.abs(), self.daily_start_equity).unwrap_or(0.0);
        let max_drawdown = if equity < self.daily_start_equity {
            breakout_markets::safe_divide(self.daily_start_equity - equity, self.daily_start_equity)
                .unwrap_or(0.0)
        } else {
            0.0
        };

        if daily_pnl < 0.0 {
            let loss_frac = breakout_markets::safe_divide(daily_pnl.abs(), equity).unwrap_or(0.0);
            if max_drawdown > self.config.kill_switch_loss_limit
                || loss_frac > 3.0 * self.config.daily_risk_limit
            {
                self.kill_switch_active = true;
            }
        }

        let daily_limit_breached = daily_risk_used > self.config.daily_risk_limit;
        let position_count_breached = open_positions_count > self.config.max_concurrent_positions;

        let should_reduce_risk = daily_risk_used > 0.8 * self.config.daily_risk_limit
            || max_drawdown > 0.5 * self.config.kill_switch_loss_limit
            || open_positions_count >= self.config.max_concurrent_positions;

        RiskMetrics {
            total_equity: equity,
            used_equity: 0.0,
            total_risk_usd: open_risk_usd,
            daily_pnl,
            daily_risk_used,
            max_drawdown,
            open_positions_count,
            kill_switch_active: self.kill_switch_active,
            daily_limit_breached,
            position_count_breached,
            should_reduce_risk,
        }
    }

    pub fn should_reduce_risk(&self, equity: f64) -> bool {
        let daily_pnl = equity - self.daily_start_equity;
        let daily_risk_used =
            breakout_markets::safe_divide(daily_pnl.abs(), self.daily_start_equity).unwrap_or(0.0);
        let max_drawdown = if equity < self.daily_start_equity {
            breakout_markets::safe_divide(self.daily_start_equity - equity, self.daily_start_equity)
                .unwrap_or(0.0)
        } else {
            0.0
        };
        daily_risk_used > 0.8 * self.config.daily_risk_limit
            || max_drawdown > 0.5 * self.config.kill_switch_loss_limit
    }

    /// Whether `btc_correlation` alone rules a signal out, before any
    /// bucket-level exposure is considered.
    pub fn absolute_correlation_breached(&self, btc_correlation: f64) -> bool {
        btc_correlation.abs() > self.config.max_abs_btc_correlation
    }

    pub fn kill_switch_active(&self) -> bool {
        self.kill_switch_active
    }

    pub fn high_water_mark(&self) -> f64 {
        self.high_water_mark
    }
}

/// BTC correlation bucket a symbol's exposure rolls up into, for
/// concentration control: anything highly correlated to BTC shares one
/// exposure budget regardless of which symbol it trades through.
pub fn correlation_bucket(symbol: &Symbol, btc_correlation: f64) -> String {
    if symbol.as_str().starts_with("BTC") {
        "btc".to_string()
    } else if btc_correlation.abs() > 0.7 {
        "high".to_string()
    } else if btc_correlation.abs() > 0.3 {
        "medium".to_string()
    } else {
        "low".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_switch_trips_on_daily_loss_past_three_times_limit() {
        // Spec §8 scenario 3: E=10_000, daily_start=10_000, current=8_500.
        let mut monitor = PortfolioMonitor::new(PortfolioConfig::default(), 10_000.0, 0);
        let metrics = monitor.evaluate(8_500.0, 0.0, 0);
        assert!(metrics.kill_switch_active);
    }

    #[test]
    fn no_kill_switch_on_a_profitable_day() {
        let mut monitor = PortfolioMonitor::new(PortfolioConfig::default(), 10_000.0, 0);
        let metrics = monitor.evaluate(12_000.0, 0.0, 0);
        assert!(!metrics.kill_switch_active);
    }

    #[test]
    fn kill_switch_trips_exactly_at_the_drawdown_limit() {
        let config = PortfolioConfig {
            daily_risk_limit: 1.0, // disable the 3x clause for this test
            kill_switch_loss_limit: 0.10,
            ..PortfolioConfig::default()
        };
        let mut monitor = PortfolioMonitor::new(config, 10_000.0, 0);
        // drawdown = (10_000 - 8_999)/10_000 = 0.1001 > 0.10
        let metrics = monitor.evaluate(8_999.0, 0.0, 0);
        assert!(metrics.kill_switch_active);
    }

    #[test]
    fn reduce_risk_trips_before_kill_switch() {
        let config = PortfolioConfig { daily_risk_limit: 0.5, ..PortfolioConfig::default() };
        let monitor = PortfolioMonitor::new(config, 10_000.0, 0);
        assert!(monitor.should_reduce_risk(9_600.0));
    }

    #[test]
    fn position_count_breach_is_reported() {
        let mut monitor = PortfolioMonitor::new(PortfolioConfig::default(), 10_000.0, 0);
        let metrics = monitor.evaluate(10_000.0, 0.0, 11);
        assert!(metrics.position_count_breached);
    }

    #[test]
    fn correlation_limit_respects_existing_exposure() {
        let mut monitor = PortfolioMonitor::new(PortfolioConfig::default(), 10_000.0, 0);
        monitor.record_position_open("high", 3_000.0);
        assert!(monitor.correlation_limit_breached("high", 4_000.0, 10_000.0));
        assert!(!monitor.correlation_limit_breached("high", 500.0, 10_000.0));
    }

    #[test]
    fn day_roll_resets_baseline_and_kill_switch() {
        let mut monitor = PortfolioMonitor::new(PortfolioConfig::default(), 10_000.0, 0);
        monitor.evaluate(8_500.0, 0.0, 0);
        assert!(monitor.kill_switch_active());
        monitor.roll_day_if_needed(8_500.0, 25 * 60 * 60 * 1000);
        assert!(!monitor.kill_switch_active());
    }

    #[test]
    fn large_equity_swing_rolls_the_day_early() {
        let mut monitor = PortfolioMonitor::new(PortfolioConfig::default(), 10_000.0, 0);
        monitor.roll_day_if_needed(11_500.0, 1_000);
        assert!((monitor.daily_start_equity - 11_500.0).abs() < 1e-9);
    }
}
