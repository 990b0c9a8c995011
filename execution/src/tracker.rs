use crate::position::Position;
use breakout_markets::{Side, Symbol, TimestampMs};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A change applied to an open position, reported to whatever is watching
/// the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PositionUpdate {
    StopMoved { symbol: Symbol, new_sl: f64 },
    TakeProfitMoved { symbol: Symbol, new_tp1: Option<f64>, new_tp2: Option<f64> },
    AddedOn { symbol: Symbol, delta_qty: f64, fill_price: f64 },
    PartiallyClosed { symbol: Symbol, closed_qty: f64, fill_price: f64, realized_pnl_usd: f64 },
    Closed { symbol: Symbol, fill_price: f64, realized_pnl_usd: f64 },
}

/// Error returned when an operation targets a symbol with no open position.
#[derive(Debug, thiserror::Error)]
#[error("no open position for {symbol}")]
pub struct NoOpenPosition {
    pub symbol: Symbol,
}

/// Owns every currently-open [`Position`], keyed by symbol, and turns stop
/// moves, target moves, add-ons, and exits into [`PositionUpdate`]s.
#[derive(Debug, Default)]
pub struct PositionManager {
    positions: IndexMap<Symbol, Position>,
}

impl PositionManager {
    pub fn new() -> Self {
        Self { positions: IndexMap::new() }
    }

    pub fn open(&mut self, position: Position) {
        self.positions.insert(position.symbol.clone(), position);
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn is_open(&self, symbol: &Symbol) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    /// Total open risk across all positions: for each, the notional distance
    /// from entry to stop, signed by quantity.
    pub fn total_open_risk_usd(&self) -> f64 {
        self.positions
            .values()
            .map(|p| (p.avg_entry_price - p.sl).abs() * p.quantity)
            .sum()
    }

    fn require(&mut self, symbol: &Symbol) -> Result<&mut Position, NoOpenPosition> {
        self.positions
            .get_mut(symbol)
            .ok_or_else(|| NoOpenPosition { symbol: symbol.clone() })
    }

    pub fn update_stop(
        &mut self,
        symbol: &Symbol,
        new_sl: f64,
        now_ms: TimestampMs,
    ) -> Result<PositionUpdate, NoOpenPosition> {
        let position = self.require(symbol)?;
        position.sl = new_sl;
        position.last_update_ts = now_ms;
        Ok(PositionUpdate::StopMoved { symbol: symbol.clone(), new_sl })
    }

    pub fn update_take_profit(
        &mut self,
        symbol: &Symbol,
        new_tp1: Option<f64>,
        new_tp2: Option<f64>,
        now_ms: TimestampMs,
    ) -> Result<PositionUpdate, NoOpenPosition> {
        let position = self.require(symbol)?;
        position.tp1 = new_tp1;
        position.tp2 = new_tp2;
        position.last_update_ts = now_ms;
        Ok(PositionUpdate::TakeProfitMoved { symbol: symbol.clone(), new_tp1, new_tp2 })
    }

    pub fn add_on(
        &mut self,
        symbol: &Symbol,
        delta_qty: f64,
        fill_price: f64,
        fees_usd: f64,
        now_ms: TimestampMs,
    ) -> Result<PositionUpdate, NoOpenPosition> {
        let position = self.require(symbol)?;
        position.adjust_quantity(delta_qty.abs(), fill_price, fees_usd, now_ms);
        Ok(PositionUpdate::AddedOn { symbol: symbol.clone(), delta_qty: delta_qty.abs(), fill_price })
    }

    /// Reduce a position by `qty`; closes and removes it from the book if
    /// that consumes the remaining quantity.
    pub fn close(
        &mut self,
        symbol: &Symbol,
        qty: f64,
        fill_price: f64,
        fees_usd: f64,
        now_ms: TimestampMs,
    ) -> Result<PositionUpdate, NoOpenPosition> {
        let position = self.require(symbol)?;
        let closing_qty = qty.min(position.quantity);
        let pnl_before = position.realized_pnl_usd;
        position.adjust_quantity(-closing_qty, fill_price, fees_usd, now_ms);
        let realized_pnl_usd = position.realized_pnl_usd - pnl_before;
        let fully_closed = !position.is_open();

        let update = if fully_closed {
            PositionUpdate::Closed { symbol: symbol.clone(), fill_price, realized_pnl_usd }
        } else {
            PositionUpdate::PartiallyClosed { symbol: symbol.clone(), closed_qty: closing_qty, fill_price, realized_pnl_usd }
        };

        if fully_closed {
            self.positions.shift_remove(symbol);
        }
        Ok(update)
    }

    /// Positions whose quantity-weighted entry-to-stop distance places them
    /// in the given correlation bucket, for exposure accounting.
    pub fn positions_with_side(&self, side: Side) -> impl Iterator<Item = &Position> {
        self.positions.values().filter(move |p| p.side == side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_position(symbol: &Symbol) -> Position {
        Position::open(symbol.clone(), Side::Long, 2.0, 100.0, 95.0, Some(110.0), Some(120.0), 0)
    }

    #[test]
    fn update_stop_moves_the_stop() {
        let symbol = Symbol::new("AAAUSDT").unwrap();
        let mut manager = PositionManager::new();
        manager.open(sample_position(&symbol));
        let update = manager.update_stop(&symbol, 97.0, 10).unwrap();
        assert_eq!(update, PositionUpdate::StopMoved { symbol: symbol.clone(), new_sl: 97.0 });
        assert_eq!(manager.get(&symbol).unwrap().sl, 97.0);
    }

    #[test]
    fn partial_close_keeps_position_open_until_fully_closed() {
        let symbol = Symbol::new("AAAUSDT").unwrap();
        let mut manager = PositionManager::new();
        manager.open(sample_position(&symbol));

        let first = manager.close(&symbol, 1.0, 110.0, 0.1, 10).unwrap();
        assert!(matches!(first, PositionUpdate::PartiallyClosed { .. }));
        assert!(manager.is_open(&symbol));

        let second = manager.close(&symbol, 1.0, 115.0, 0.1, 20).unwrap();
        assert!(matches!(second, PositionUpdate::Closed { .. }));
        assert!(!manager.is_open(&symbol));
    }

    #[test]
    fn operations_on_unknown_symbol_error() {
        let symbol = Symbol::new("ZZZUSDT").unwrap();
        let mut manager = PositionManager::new();
        let result = manager.update_stop(&symbol, 1.0, 0);
        assert!(result.is_err());
    }

    #[test]
    fn total_open_risk_sums_entry_to_stop_distance() {
        let symbol_a = Symbol::new("AAAUSDT").unwrap();
        let symbol_b = Symbol::new("BBBUSDT").unwrap();
        let mut manager = PositionManager::new();
        manager.open(sample_position(&symbol_a));
        manager.open(Position::open(symbol_b, Side::Short, 1.0, 50.0, 52.0, None, None, 0));
        assert!((manager.total_open_risk_usd() - (10.0 + 2.0)).abs() < 1e-9);
    }
}
