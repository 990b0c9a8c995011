use breakout_markets::{PositionStatus, Side, Symbol, TimestampMs};
use serde::{Deserialize, Serialize};

/// An open or closed position in one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: f64,
    pub avg_entry_price: f64,
    pub sl: f64,
    pub tp1: Option<f64>,
    pub tp2: Option<f64>,
    pub realized_pnl_usd: f64,
    pub fees_paid_usd: f64,
    pub status: PositionStatus,
    pub opened_ts: TimestampMs,
    pub last_update_ts: TimestampMs,
}

impl Position {
    pub fn open(
        symbol: Symbol,
        side: Side,
        quantity: f64,
        avg_entry_price: f64,
        sl: f64,
        tp1: Option<f64>,
        tp2: Option<f64>,
        now_ms: TimestampMs,
    ) -> Self {
        Self {
            symbol,
            side,
            quantity,
            avg_entry_price,
            sl,
            tp1,
            tp2,
            realized_pnl_usd: 0.0,
            fees_paid_usd: 0.0,
            status: PositionStatus::Open,
            opened_ts: now_ms,
            last_update_ts: now_ms,
        }
    }

    /// Mark-to-market unrealized P&L at `price`.
    pub fn unrealized_pnl_usd(&self, price: f64) -> f64 {
        self.side.sign() * (price - self.avg_entry_price) * self.quantity
    }

    /// Scale a position's quantity up (add-on) or down (partial close),
    /// folding the delta's realized P&L and fees into the running totals.
    /// A reduction realizes P&L against `avg_entry_price`; an addition
    /// rolls `avg_entry_price` forward to the blended average.
    pub fn adjust_quantity(&mut self, delta_qty: f64, fill_price: f64, fees_usd: f64, now_ms: TimestampMs) {
        if delta_qty < 0.0 {
            let closed_qty = delta_qty.abs().min(self.quantity);
            self.realized_pnl_usd += self.side.sign() * (fill_price - self.avg_entry_price) * closed_qty;
            self.quantity = (self.quantity - closed_qty).max(0.0);
            self.status = if self.quantity <= 1e-9 {
                PositionStatus::Closed
            } else {
                PositionStatus::PartiallyClosed
            };
        } else if delta_qty > 0.0 {
            let new_qty = self.quantity + delta_qty;
            self.avg_entry_price = (self.avg_entry_price * self.quantity + fill_price * delta_qty) / new_qty;
            self.quantity = new_qty;
        }
        self.fees_paid_usd += fees_usd;
        self.last_update_ts = now_ms;
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.status, PositionStatus::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrealized_pnl_sign_follows_side() {
        let symbol = Symbol::new("AAAUSDT").unwrap();
        let long = Position::open(symbol.clone(), Side::Long, 1.0, 100.0, 95.0, None, None, 0);
        assert!((long.unrealized_pnl_usd(110.0) - 10.0).abs() < 1e-9);

        let short = Position::open(symbol, Side::Short, 1.0, 100.0, 105.0, None, None, 0);
        assert!((short.unrealized_pnl_usd(110.0) - -10.0).abs() < 1e-9);
    }

    #[test]
    fn partial_close_realizes_pnl_and_keeps_position_open() {
        let symbol = Symbol::new("AAAUSDT").unwrap();
        let mut pos = Position::open(symbol, Side::Long, 2.0, 100.0, 95.0, None, None, 0);
        pos.adjust_quantity(-1.0, 110.0, 0.1, 10);
        assert!((pos.realized_pnl_usd - 10.0).abs() < 1e-9);
        assert_eq!(pos.status, PositionStatus::PartiallyClosed);
        assert!((pos.quantity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn full_close_marks_closed() {
        let symbol = Symbol::new("AAAUSDT").unwrap();
        let mut pos = Position::open(symbol, Side::Long, 1.0, 100.0, 95.0, None, None, 0);
        pos.adjust_quantity(-1.0, 110.0, 0.1, 10);
        assert_eq!(pos.status, PositionStatus::Closed);
    }

    #[test]
    fn add_on_blends_average_entry_price() {
        let symbol = Symbol::new("AAAUSDT").unwrap();
        let mut pos = Position::open(symbol, Side::Long, 1.0, 100.0, 95.0, None, None, 0);
        pos.adjust_quantity(1.0, 120.0, 0.1, 10);
        assert!((pos.avg_entry_price - 110.0).abs() < 1e-9);
        assert!((pos.quantity - 2.0).abs() < 1e-9);
    }
}
