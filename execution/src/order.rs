use breakout_data::RawFill;
use breakout_markets::{OrderSide, OrderStatus, OrderType, Symbol, TimestampMs};
use serde::{Deserialize, Serialize};

/// One child order actually submitted to the exchange client, and what
/// came back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderSlice {
    pub quantity: f64,
    pub post_only: bool,
    pub filled_qty: f64,
    pub fill_price: f64,
    pub fees_usd: f64,
    pub timed_out: bool,
}

/// Composite view of a (possibly sliced) execution: every child
/// [`OrderSlice`] submitted, aggregated into one weighted-average fill.
/// Mirrors the shape a single unsliced exchange order would have had,
/// so downstream position tracking doesn't need to know slicing
/// happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub requested_qty: f64,
    pub filled_qty: f64,
    pub avg_fill_price: f64,
    pub fees_paid_usd: f64,
    pub status: OrderStatus,
    pub slices: Vec<OrderSlice>,
    pub created_ts: TimestampMs,
    pub last_update_ts: TimestampMs,
}

impl Order {
    pub fn new(symbol: Symbol, side: OrderSide, order_type: OrderType, requested_qty: f64, now_ms: TimestampMs) -> Self {
        Self {
            symbol,
            side,
            order_type,
            requested_qty,
            filled_qty: 0.0,
            avg_fill_price: 0.0,
            fees_paid_usd: 0.0,
            status: OrderStatus::Pending,
            slices: Vec::new(),
            created_ts: now_ms,
            last_update_ts: now_ms,
        }
    }

    /// Fold one more filled child order into the running weighted average.
    pub fn record_fill(&mut self, slice_qty: f64, fill: &RawFill, post_only: bool, now_ms: TimestampMs) {
        let prior_notional = self.filled_qty * self.avg_fill_price;
        let fill_notional = fill.filled_qty * fill.avg_fill_price;
        self.filled_qty += fill.filled_qty;
        self.avg_fill_price = if self.filled_qty > 0.0 {
            (prior_notional + fill_notional) / self.filled_qty
        } else {
            0.0
        };
        self.fees_paid_usd += fill.fees_usd;
        self.last_update_ts = now_ms;
        self.slices.push(OrderSlice {
            quantity: slice_qty,
            post_only,
            filled_qty: fill.filled_qty,
            fill_price: fill.avg_fill_price,
            fees_usd: fill.fees_usd,
            timed_out: false,
        });
        self.status = if self.filled_qty + 1e-9 >= self.requested_qty {
            OrderStatus::Filled
        } else {
            OrderStatus::Open
        };
    }

    pub fn record_timeout(&mut self, slice_qty: f64, now_ms: TimestampMs) {
        self.last_update_ts = now_ms;
        self.slices.push(OrderSlice {
            quantity: slice_qty,
            post_only: false,
            filled_qty: 0.0,
            fill_price: 0.0,
            fees_usd: 0.0,
            timed_out: true,
        });
    }

    pub fn is_fully_filled(&self) -> bool {
        self.filled_qty + 1e-9 >= self.requested_qty
    }

    pub fn remaining_qty(&self) -> f64 {
        (self.requested_qty - self.filled_qty).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breakout_markets::Symbol;

    #[test]
    fn aggregates_weighted_average_across_slices() {
        let symbol = Symbol::new("AAAUSDT").unwrap();
        let mut order = Order::new(symbol, OrderSide::Buy, OrderType::Market, 2.0, 0);
        order.record_fill(
            1.0,
            &RawFill { filled_qty: 1.0, avg_fill_price: 100.0, fees_usd: 0.1 },
            false,
            10,
        );
        order.record_fill(
            1.0,
            &RawFill { filled_qty: 1.0, avg_fill_price: 102.0, fees_usd: 0.1 },
            false,
            20,
        );
        assert!((order.avg_fill_price - 101.0).abs() < 1e-9);
        assert_eq!(order.status, OrderStatus::Filled);
        assert!(order.is_fully_filled());
    }
}
