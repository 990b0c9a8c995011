//! Position management decision layer: given an open [`Position`]
//! and its latest [`MarketData`], decides whether to move the stop,
//! realize a take-profit tranche, close outright, or size an add-on. Pure
//! decision logic — callers turn the resulting [`TrackerAction`]s into
//! orders via [`crate::manager::ExecutionManager`] and bookkeeping via
//! [`crate::tracker::PositionManager`].

use crate::position::Position;
use breakout_data::{indicators, MarketData};
use breakout_markets::{Side, Symbol, TimestampMs};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Tunables for one position's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionConfig {
    pub tp1_size_pct: f64,
    pub tp2_size_pct: f64,
    /// Breakeven offset applied once TP1 fires, e.g. 0.001 = entry*1.001 (long).
    pub breakeven_buffer_pct: f64,
    pub chandelier_lookback: usize,
    pub chandelier_atr_mult: f64,
    pub max_hold_time_hours: f64,
    pub time_stop_minutes: Option<f64>,
    /// Activity-drop fraction (0..1) above which a position is panic-closed.
    /// `None` disables the check.
    pub activity_panic_drop_fraction: Option<f64>,
    pub no_progress_hours: f64,
    pub no_progress_pnl_r: f64,
    pub add_on_enabled: bool,
    pub add_on_min_pnl_r: f64,
    pub add_on_ema_period: usize,
    pub add_on_proximity_pct: f64,
    pub add_on_max_size_pct: f64,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            tp1_size_pct: 0.5,
            tp2_size_pct: 0.5,
            breakeven_buffer_pct: 0.001,
            chandelier_lookback: 22,
            chandelier_atr_mult: 3.0,
            max_hold_time_hours: 48.0,
            time_stop_minutes: None,
            activity_panic_drop_fraction: None,
            no_progress_hours: 8.0,
            no_progress_pnl_r: 0.3,
            add_on_enabled: false,
            add_on_min_pnl_r: 0.5,
            add_on_ema_period: 9,
            add_on_proximity_pct: 0.005,
            add_on_max_size_pct: 0.25,
        }
    }
}

/// A decision emitted by [`PositionTracker::manage`] for one cycle. The
/// caller is responsible for turning this into a reduce-only (take profit,
/// close) or same-direction (add-on) order and, once filled, relaying the
/// result into [`crate::tracker::PositionManager`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackerAction {
    MoveStop { new_sl: f64, reason: &'static str },
    TakeProfit { qty: f64, reason: &'static str },
    Close { reason: &'static str },
    AddOn { qty: f64, reference_price: f64 },
}

/// Runtime-only companion to a [`Position`]: tracks which lifecycle
/// gates have already fired so they don't re-fire every cycle. Created
/// when a position opens, discarded when it reaches a terminal status.
#[derive(Debug, Clone)]
pub struct PositionTracker {
    pub symbol: Symbol,
    config: PositionConfig,
    tp1_executed: bool,
    tp2_executed: bool,
    breakeven_moved: bool,
    trailing_active: bool,
    add_on_executed: bool,
}

impl PositionTracker {
    pub fn new(symbol: Symbol, config: PositionConfig) -> Self {
        Self {
            symbol,
            config,
            tp1_executed: false,
            tp2_executed: false,
            breakeven_moved: false,
            trailing_active: false,
            add_on_executed: false,
        }
    }

    pub fn tp1_executed(&self) -> bool {
        self.tp1_executed
    }

    pub fn breakeven_moved(&self) -> bool {
        self.breakeven_moved
    }

    /// Unrealized P&L expressed in R (multiples of the position's original
    /// entry-to-stop distance), used by the no-progress and add-on gates.
    pub fn pnl_r(&self, position: &Position, price: f64) -> f64 {
        let r = (position.avg_entry_price - position.sl).abs();
        if r <= 0.0 || position.quantity <= 0.0 {
            return 0.0;
        }
        position.unrealized_pnl_usd(price) / (r * position.quantity)
    }

    fn evaluate_stop(&mut self, position: &Position, market_data: &MarketData) -> Option<TrackerAction> {
        if self.tp1_executed && !self.breakeven_moved {
            let new_sl = match position.side {
                Side::Long => position.avg_entry_price * (1.0 + self.config.breakeven_buffer_pct),
                Side::Short => position.avg_entry_price * (1.0 - self.config.breakeven_buffer_pct),
            };
            self.breakeven_moved = true;
            self.trailing_active = true;
            return Some(TrackerAction::MoveStop { new_sl, reason: "breakeven" });
        }

        if self.breakeven_moved && market_data.candles_5m.len() >= self.config.chandelier_lookback {
            let atr = indicators::atr(&market_data.candles_5m, 14)?;
            let window = &market_data.candles_5m[market_data.candles_5m.len() - self.config.chandelier_lookback..];
            match position.side {
                Side::Long => {
                    let highest_high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
                    let candidate = highest_high - self.config.chandelier_atr_mult * atr;
                    if candidate > position.sl {
                        return Some(TrackerAction::MoveStop { new_sl: candidate, reason: "chandelier_trail" });
                    }
                }
                Side::Short => {
                    let lowest_low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
                    let candidate = lowest_low + self.config.chandelier_atr_mult * atr;
                    if candidate < position.sl {
                        return Some(TrackerAction::MoveStop { new_sl: candidate, reason: "chandelier_trail" });
                    }
                }
            }
        }
        None
    }

    fn evaluate_take_profit(&mut self, position: &Position, price: f64) -> Option<TrackerAction> {
        if !self.tp1_executed {
            let tp1 = position.tp1?;
            let hit = match position.side {
                Side::Long => price >= tp1,
                Side::Short => price <= tp1,
            };
            if hit {
                self.tp1_executed = true;
                let qty = position.quantity * self.config.tp1_size_pct;
                return Some(TrackerAction::TakeProfit { qty, reason: "tp1" });
            }
            return None;
        }

        if !self.tp2_executed {
            let tp2 = position.tp2?;
            let hit = match position.side {
                Side::Long => price >= tp2,
                Side::Short => price <= tp2,
            };
            if hit {
                self.tp2_executed = true;
                let qty = position.quantity * self.config.tp2_size_pct;
                return Some(TrackerAction::TakeProfit { qty, reason: "tp2" });
            }
        }
        None
    }

    fn evaluate_close(
        &self,
        position: &Position,
        now_ms: TimestampMs,
        pnl_r: f64,
        activity_drop_fraction: Option<f64>,
    ) -> Option<TrackerAction> {
        let held_hours = (now_ms - position.opened_ts) as f64 / 3_600_000.0;

        if held_hours > self.config.max_hold_time_hours {
            return Some(TrackerAction::Close { reason: "max_hold_time" });
        }
        if let Some(time_stop_minutes) = self.config.time_stop_minutes {
            if held_hours * 60.0 > time_stop_minutes {
                return Some(TrackerAction::Close { reason: "time_stop" });
            }
        }
        if let (Some(threshold), Some(drop)) = (self.config.activity_panic_drop_fraction, activity_drop_fraction) {
            if drop >= threshold {
                return Some(TrackerAction::Close { reason: "activity_panic" });
            }
        }
        if held_hours > self.config.no_progress_hours && pnl_r < self.config.no_progress_pnl_r && !self.tp1_executed {
            return Some(TrackerAction::Close { reason: "no_progress" });
        }
        None
    }

    fn evaluate_add_on(&mut self, position: &Position, market_data: &MarketData, pnl_r: f64) -> Option<TrackerAction> {
        if !self.config.add_on_enabled || self.add_on_executed {
            return None;
        }
        if pnl_r < self.config.add_on_min_pnl_r {
            return None;
        }
        if market_data.candles_5m.len() < self.config.add_on_ema_period {
            return None;
        }
        let closes = market_data.closes();
        let ema = indicators::ema(&closes, self.config.add_on_ema_period)?;
        let proximity = ((market_data.price - ema) / ema).abs();
        if proximity <= self.config.add_on_proximity_pct {
            self.add_on_executed = true;
            let qty = position.quantity * self.config.add_on_max_size_pct;
            return Some(TrackerAction::AddOn { qty, reference_price: market_data.price });
        }
        None
    }

    /// Evaluate every gate for one cycle and return the actions to apply,
    /// in priority order: a close decision is terminal and short-circuits
    /// everything else. Otherwise stop maintenance runs before
    /// take-profit so a TP1 that fires this cycle doesn't retroactively
    /// trigger this same cycle's breakeven shift — that happens next cycle.
    pub fn manage(
        &mut self,
        position: &Position,
        market_data: &MarketData,
        now_ms: TimestampMs,
        activity_drop_fraction: Option<f64>,
    ) -> Vec<TrackerAction> {
        let pnl_r = self.pnl_r(position, market_data.price);

        if let Some(close) = self.evaluate_close(position, now_ms, pnl_r, activity_drop_fraction) {
            return vec![close];
        }

        let mut actions = Vec::new();
        if let Some(stop) = self.evaluate_stop(position, market_data) {
            actions.push(stop);
        }
        if let Some(tp) = self.evaluate_take_profit(position, market_data.price) {
            actions.push(tp);
        }
        if let Some(add_on) = self.evaluate_add_on(position, market_data, pnl_r) {
            actions.push(add_on);
        }
        actions
    }
}

/// Owns one [`PositionTracker`] per open position, created alongside the
/// position and dropped once it closes.
#[derive(Debug, Default)]
pub struct PositionTrackerStore {
    trackers: IndexMap<Symbol, PositionTracker>,
}

impl PositionTrackerStore {
    pub fn new() -> Self {
        Self { trackers: IndexMap::new() }
    }

    pub fn ensure(&mut self, symbol: &Symbol, config: PositionConfig) -> &mut PositionTracker {
        self.trackers
            .entry(symbol.clone())
            .or_insert_with(|| PositionTracker::new(symbol.clone(), config))
    }

    pub fn get_mut(&mut self, symbol: &Symbol) -> Option<&mut PositionTracker> {
        self.trackers.get_mut(symbol)
    }

    pub fn remove(&mut self, symbol: &Symbol) -> Option<PositionTracker> {
        self.trackers.shift_remove(symbol)
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breakout_markets::{Candle, MarketType, Symbol};

    fn candles(n: usize, high: f64, low: f64, close: f64) -> Vec<Candle> {
        (0..n).map(|i| Candle::new(i as i64, close, high, low, close, 100.0).unwrap()).collect()
    }

    fn market_data(symbol: Symbol, price: f64, candles_5m: Vec<Candle>) -> MarketData {
        MarketData {
            symbol,
            price,
            volume_24h_usd: 1_000_000.0,
            oi_usd: None,
            oi_change_24h: None,
            trades_per_minute: 10.0,
            atr_5m: 2.0,
            atr_15m: 3.0,
            bb_width_pct: 1.0,
            btc_correlation: 0.5,
            l2_depth: None,
            candles_5m,
            timestamp: 0,
            market_type: MarketType::Futures,
        }
    }

    #[test]
    fn tp1_then_breakeven_spans_two_cycles() {
        let symbol = Symbol::new("AAAUSDT").unwrap();
        let config = PositionConfig::default();
        let mut tracker = PositionTracker::new(symbol.clone(), config);
        let position = Position::open(symbol.clone(), Side::Long, 10.0, 100.0, 98.0, Some(101.0), Some(103.0), 0);

        let md = market_data(symbol.clone(), 101.0, candles(5, 101.0, 99.0, 100.0));
        let actions = tracker.manage(&position, &md, 1_000, None);
        assert_eq!(actions, vec![TrackerAction::TakeProfit { qty: 5.0, reason: "tp1" }]);
        assert!(tracker.tp1_executed());
        assert!(!tracker.breakeven_moved());

        let md_next = market_data(symbol, 101.5, candles(5, 101.0, 99.0, 100.0));
        let actions_next = tracker.manage(&position, &md_next, 2_000, None);
        assert!(matches!(actions_next.first(), Some(TrackerAction::MoveStop { reason: "breakeven", .. })));
        assert!(tracker.breakeven_moved());
    }

    #[test]
    fn chandelier_trail_only_moves_stop_upward_for_longs() {
        let symbol = Symbol::new("AAAUSDT").unwrap();
        let config = PositionConfig::default();
        let mut tracker = PositionTracker::new(symbol.clone(), config);
        let mut position = Position::open(symbol.clone(), Side::Long, 10.0, 100.0, 100.1, None, None, 0);
        position.sl = 100.1;

        let high = 110.0;
        let candles_5m = candles(22, high, 100.0, 105.0);
        let md = market_data(symbol, 108.0, candles_5m);
        // Manually mark as past breakeven to exercise the chandelier branch.
        tracker.tp1_executed = true;
        tracker.breakeven_moved = true;
        let actions = tracker.manage(&position, &md, 10_000, None);
        assert!(actions.iter().any(|a| matches!(a, TrackerAction::MoveStop { reason: "chandelier_trail", .. })));
    }

    #[test]
    fn max_hold_time_forces_close() {
        let symbol = Symbol::new("AAAUSDT").unwrap();
        let mut config = PositionConfig::default();
        config.max_hold_time_hours = 1.0;
        let mut tracker = PositionTracker::new(symbol.clone(), config);
        let position = Position::open(symbol.clone(), Side::Long, 10.0, 100.0, 98.0, None, None, 0);
        let md = market_data(symbol, 100.5, candles(5, 101.0, 99.0, 100.0));
        let actions = tracker.manage(&position, &md, 2 * 3_600_000, None);
        assert_eq!(actions, vec![TrackerAction::Close { reason: "max_hold_time" }]);
    }

    #[test]
    fn no_progress_close_requires_elapsed_time_and_low_pnl() {
        let symbol = Symbol::new("AAAUSDT").unwrap();
        let config = PositionConfig::default();
        let mut tracker = PositionTracker::new(symbol.clone(), config);
        let position = Position::open(symbol.clone(), Side::Long, 10.0, 100.0, 98.0, None, None, 0);
        let md = market_data(symbol, 100.1, candles(5, 101.0, 99.0, 100.0));
        let actions = tracker.manage(&position, &md, 9 * 3_600_000, None);
        assert_eq!(actions, vec![TrackerAction::Close { reason: "no_progress" }]);
    }

    #[test]
    fn add_on_requires_profit_and_ema_proximity() {
        let symbol = Symbol::new("AAAUSDT").unwrap();
        let mut config = PositionConfig::default();
        config.add_on_enabled = true;
        let mut tracker = PositionTracker::new(symbol.clone(), config);
        let position = Position::open(symbol.clone(), Side::Long, 10.0, 100.0, 98.0, Some(200.0), Some(300.0), 0);
        let candles_5m = candles(10, 101.0, 99.0, 101.0);
        let md = market_data(symbol, 101.0, candles_5m);
        let actions = tracker.manage(&position, &md, 1_000, None);
        assert!(actions.iter().any(|a| matches!(a, TrackerAction::AddOn { .. })));
    }
}
