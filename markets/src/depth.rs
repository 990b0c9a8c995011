use crate::error::MarketsError;
use serde::{Deserialize, Serialize};

/// Aggregated level-2 order-book depth around the top of book.
///
/// Notional within `±0.3%` and `±0.5%` of each side's best price,
/// `spread_bps >= 0`, and `imbalance` is `(bidNotional - askNotional) /
/// (bidNotional + askNotional)` computed over the top-N levels used to
/// build the snapshot, clamped to `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct L2Depth {
    pub best_bid: f64,
    pub best_ask: f64,
    pub bid_depth_0_3pct: f64,
    pub bid_depth_0_5pct: f64,
    pub ask_depth_0_3pct: f64,
    pub ask_depth_0_5pct: f64,
    pub spread_bps: f64,
    pub imbalance: f64,
}

impl L2Depth {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        best_bid: f64,
        best_ask: f64,
        bid_depth_0_3pct: f64,
        bid_depth_0_5pct: f64,
        ask_depth_0_3pct: f64,
        ask_depth_0_5pct: f64,
        spread_bps: f64,
        imbalance: f64,
    ) -> Result<Self, MarketsError> {
        if !best_bid.is_finite() || best_bid <= 0.0 {
            return Err(MarketsError::InvalidPrice(best_bid));
        }
        if !best_ask.is_finite() || best_ask <= 0.0 {
            return Err(MarketsError::InvalidPrice(best_ask));
        }
        for depth in [
            bid_depth_0_3pct,
            bid_depth_0_5pct,
            ask_depth_0_3pct,
            ask_depth_0_5pct,
        ] {
            if !depth.is_finite() || depth < 0.0 {
                return Err(MarketsError::InvalidVolume(depth));
            }
        }
        if !spread_bps.is_finite() || spread_bps < 0.0 {
            return Err(MarketsError::InvalidSpread(spread_bps));
        }
        if !imbalance.is_finite() || !(-1.0..=1.0).contains(&imbalance) {
            return Err(MarketsError::InvalidImbalance(imbalance));
        }
        Ok(Self {
            best_bid,
            best_ask,
            bid_depth_0_3pct,
            bid_depth_0_5pct,
            ask_depth_0_3pct,
            ask_depth_0_5pct,
            spread_bps,
            imbalance,
        })
    }

    /// Sum of `0.3%`-band notional on both sides.
    pub fn total_depth_0_3pct(&self) -> f64 {
        self.bid_depth_0_3pct + self.ask_depth_0_3pct
    }

    /// Sum of `0.5%`-band notional on both sides.
    pub fn total_depth_0_5pct(&self) -> f64 {
        self.bid_depth_0_5pct + self.ask_depth_0_5pct
    }

    /// `0.3%`-band notional on the side that would be hit by an order of the
    /// given direction (buy consumes asks, sell consumes bids).
    pub fn depth_0_3pct_for_side(&self, side: crate::side::OrderSide) -> f64 {
        match side {
            crate::side::OrderSide::Buy => self.ask_depth_0_3pct,
            crate::side::OrderSide::Sell => self.bid_depth_0_3pct,
        }
    }

    pub fn mid_price(&self) -> f64 {
        (self.best_bid + self.best_ask) / 2.0
    }
}
