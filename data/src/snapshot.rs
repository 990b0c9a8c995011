use breakout_markets::{L2Depth, TimestampMs};
use serde::{Deserialize, Serialize};

/// Depth-of-book snapshot published by the WS depth task after each applied
/// book update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthSnapshot {
    pub depth: L2Depth,
    pub timestamp: TimestampMs,
}

/// Rolling 60-second trade-flow window published by the WS trade task.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TradeStats {
    pub trades_per_minute: f64,
    pub volume_per_minute: f64,
    pub last_price: f64,
    pub timestamp: TimestampMs,
}
