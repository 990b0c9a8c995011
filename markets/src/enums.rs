use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Order type submitted to an exchange.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display, Deserialize, Serialize)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

/// Lifecycle status of an exchange order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display, Deserialize, Serialize)]
pub enum OrderStatus {
    Pending,
    Open,
    Filled,
    Cancelled,
    Rejected,
}

/// Lifecycle status of a managed position.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display, Deserialize, Serialize)]
pub enum PositionStatus {
    Open,
    PartiallyClosed,
    Closed,
}

/// Which signal-generation strategy produced a [`crate::Side`]-directed
/// trade idea.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display, Deserialize, Serialize)]
pub enum SignalStrategy {
    Momentum,
    Retest,
}

/// Lifecycle status of a generated signal.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display, Deserialize, Serialize)]
pub enum SignalStatus {
    Pending,
    Active,
    Executed,
    Failed,
    Expired,
    Removed,
}

/// Horizontal level classification produced by the level detector.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display, Deserialize, Serialize)]
pub enum LevelType {
    Support,
    Resistance,
}
