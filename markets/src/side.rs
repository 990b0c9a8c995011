use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Directional bias of a signal or position.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display, Deserialize, Serialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }

    /// Maps a directional [`Side`] onto the order-placement [`OrderSide`]
    /// needed to *open* that position.
    pub fn to_open_order_side(&self) -> OrderSide {
        match self {
            Side::Long => OrderSide::Buy,
            Side::Short => OrderSide::Sell,
        }
    }

    /// Maps a directional [`Side`] onto the order-placement [`OrderSide`]
    /// needed to *close* (reduce-only) that position.
    pub fn to_close_order_side(&self) -> OrderSide {
        self.to_open_order_side().opposite()
    }
}

/// Exchange order side: the literal `buy`/`sell` leg submitted to the venue.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display, Deserialize, Serialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(&self) -> OrderSide {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}
