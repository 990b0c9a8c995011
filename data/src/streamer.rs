//! Real-time market-data streamer: per-symbol depth and trade
//! background tasks, each reconnecting on failure with backoff, publishing
//! [`DepthSnapshot`]/[`TradeStats`] into per-symbol mutex-guarded caches.
//!
//! The wire format of the underlying feed is deliberately abstract —
//! [`DepthFeedConnector`]/[`TradeFeedConnector`] are the seam a concrete
//! venue adapter plugs into; this module only owns book maintenance,
//! reconnection, and the rolling trade window.

use crate::error::DataError;
use crate::snapshot::{DepthSnapshot, TradeStats};
use async_trait::async_trait;
use breakout_markets::{L2Depth, Symbol, TimestampMs};
use parking_lot::Mutex as SyncMutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const TOP_N_DEPTH_LEVELS: usize = 50;
const TOP_N_IMBALANCE_LEVELS: usize = 10;
const TRADE_RING_CAPACITY: usize = 1000;
const TRADE_WINDOW: Duration = Duration::from_secs(60);
const MIN_RECONNECT_BACKOFF: Duration = Duration::from_secs(1);
const MAX_RECONNECT_BACKOFF: Duration = Duration::from_secs(30);

/// One side of the order book.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BookSide {
    Bid,
    Ask,
}

/// A raw depth-of-book update as delivered by a venue's WS stream, already
/// parsed into `(price, size)` pairs by the adapter.
#[derive(Debug, Clone)]
pub enum DepthUpdate {
    /// Full-book replace for one side.
    Snapshot {
        side: BookSide,
        levels: Vec<(f64, f64)>,
    },
    /// Incremental update: `size == 0.0` deletes the price level.
    Delta {
        side: BookSide,
        price: f64,
        size: f64,
    },
}

/// A single public trade print.
#[derive(Debug, Clone, Copy)]
pub struct TradeEvent {
    pub ts: TimestampMs,
    pub price: f64,
    pub qty: f64,
}

/// A live stream of [`DepthUpdate`]s for one symbol.
#[async_trait]
pub trait DepthFeedStream: Send {
    async fn next_update(&mut self) -> Option<DepthUpdate>;
}

/// Establishes [`DepthFeedStream`]s on demand (and again on reconnect).
#[async_trait]
pub trait DepthFeedConnector: Send + Sync {
    async fn connect(&self, symbol: Symbol) -> Result<Box<dyn DepthFeedStream>, DataError>;
}

/// A live stream of [`TradeEvent`]s for one symbol.
#[async_trait]
pub trait TradeFeedStream: Send {
    async fn next_trade(&mut self) -> Option<TradeEvent>;
}

/// Establishes [`TradeFeedStream`]s on demand (and again on reconnect).
#[async_trait]
pub trait TradeFeedConnector: Send + Sync {
    async fn connect(&self, symbol: Symbol) -> Result<Box<dyn TradeFeedStream>, DataError>;
}

/// `MarketStreamer` interface the provider depends on. `ensure_symbol`
/// is idempotent; `stop` cancels every task and clears the registry.
pub trait MarketStreamer: Send + Sync + std::fmt::Debug {
    fn ensure_symbol(&self, symbol: Symbol);
    fn get_depth_snapshot(&self, symbol: &Symbol) -> Option<DepthSnapshot>;
    fn get_trade_stats(&self, symbol: &Symbol) -> Option<TradeStats>;
    fn stop(&self);
}

#[derive(Default)]
struct LocalBook {
    bids: Vec<(f64, f64)>,
    asks: Vec<(f64, f64)>,
}

impl LocalBook {
    fn apply(&mut self, update: DepthUpdate) {
        match update {
            DepthUpdate::Snapshot { side, levels } => {
                let book = self.side_mut(side);
                *book = levels;
                Self::sort_and_truncate(side, book);
            }
            DepthUpdate::Delta { side, price, size } => {
                let book = self.side_mut(side);
                book.retain(|(p, _)| *p != price);
                if size > 0.0 {
                    book.push((price, size));
                }
                Self::sort_and_truncate(side, book);
            }
        }
    }

    fn side_mut(&mut self, side: BookSide) -> &mut Vec<(f64, f64)> {
        match side {
            BookSide::Bid => &mut self.bids,
            BookSide::Ask => &mut self.asks,
        }
    }

    fn sort_and_truncate(side: BookSide, book: &mut Vec<(f64, f64)>) {
        match side {
            // bids: highest price first
            BookSide::Bid => book.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal)),
            // asks: lowest price first
            BookSide::Ask => book.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal)),
        }
        book.truncate(TOP_N_DEPTH_LEVELS);
    }

    /// Recompute a [`L2Depth`] snapshot from the top-50 levels per side
    ///: best bid/ask, spread in bps, notional within ±0.3%/±0.5%
    /// accumulated until the band is exceeded, and imbalance over the
    /// top-10 levels by notional.
    fn snapshot(&self) -> Option<L2Depth> {
        let best_bid = self.bids.first()?.0;
        let best_ask = self.asks.first()?.0;
        if best_bid <= 0.0 || best_ask <= 0.0 || best_ask <= best_bid {
            return None;
        }
        let spread_bps = (best_ask - best_bid) / best_bid * 10_000.0;

        let bid_0_3 = Self::notional_within_band(&self.bids, best_bid, 0.003);
        let bid_0_5 = Self::notional_within_band(&self.bids, best_bid, 0.005);
        let ask_0_3 = Self::notional_within_band(&self.asks, best_ask, 0.003);
        let ask_0_5 = Self::notional_within_band(&self.asks, best_ask, 0.005);

        let bid_top = Self::top_n_notional(&self.bids, TOP_N_IMBALANCE_LEVELS);
        let ask_top = Self::top_n_notional(&self.asks, TOP_N_IMBALANCE_LEVELS);
        let imbalance = breakout_markets::safe_divide(bid_top - ask_top, bid_top + ask_top)
            .unwrap_or(0.0)
            .clamp(-1.0, 1.0);

        L2Depth::new(
            best_bid, best_ask, bid_0_3, bid_0_5, ask_0_3, ask_0_5, spread_bps, imbalance,
        )
        .ok()
    }

    /// Accumulate `price * size` over levels within `pct` of `top_of_book`,
    /// stopping once the band is exceeded.
    fn notional_within_band(levels: &[(f64, f64)], top_of_book: f64, pct: f64) -> f64 {
        let bound = top_of_book * pct;
        let mut total = 0.0;
        for (price, size) in levels {
            if (price - top_of_book).abs() > bound {
                break;
            }
            total += price * size;
        }
        total
    }

    fn top_n_notional(levels: &[(f64, f64)], n: usize) -> f64 {
        levels.iter().take(n).map(|(p, s)| p * s).sum()
    }
}

struct SymbolState {
    depth_cache: Arc<SyncMutex<Option<DepthSnapshot>>>,
    trade_cache: Arc<SyncMutex<TradeStats>>,
    trade_ring: Arc<SyncMutex<VecDeque<(TimestampMs, f64)>>>,
    depth_task: JoinHandle<()>,
    trade_task: JoinHandle<()>,
}

impl Drop for SymbolState {
    fn drop(&mut self) {
        self.depth_task.abort();
        self.trade_task.abort();
    }
}

/// [`MarketStreamer`] implementation maintaining one depth task and one
/// trade task per subscribed symbol.
pub struct WsStreamer {
    depth_connector: Arc<dyn DepthFeedConnector>,
    trade_connector: Arc<dyn TradeFeedConnector>,
    registry: SyncMutex<HashMap<Symbol, SymbolState>>,
}

impl std::fmt::Debug for WsStreamer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsStreamer")
            .field("symbols", &self.registry.lock().len())
            .finish()
    }
}

impl WsStreamer {
    pub fn new(
        depth_connector: Arc<dyn DepthFeedConnector>,
        trade_connector: Arc<dyn TradeFeedConnector>,
    ) -> Self {
        Self {
            depth_connector,
            trade_connector,
            registry: SyncMutex::new(HashMap::new()),
        }
    }

    fn spawn_depth_task(&self, symbol: Symbol) -> (Arc<SyncMutex<Option<DepthSnapshot>>>, JoinHandle<()>) {
        let cache = Arc::new(SyncMutex::new(None));
        let cache_clone = cache.clone();
        let connector = self.depth_connector.clone();
        let handle = tokio::spawn(async move {
            let mut backoff = MIN_RECONNECT_BACKOFF;
            let mut book = LocalBook::default();
            loop {
                match connector.connect(symbol.clone()).await {
                    Ok(mut stream) => {
                        backoff = MIN_RECONNECT_BACKOFF;
                        while let Some(update) = stream.next_update().await {
                            book.apply(update);
                            if let Some(depth) = book.snapshot() {
                                *cache_clone.lock() = Some(DepthSnapshot {
                                    depth,
                                    timestamp: now_ms(),
                                });
                            }
                        }
                        debug!(%symbol, "depth stream ended, reconnecting");
                    }
                    Err(err) => {
                        warn!(%symbol, %err, "depth feed connect failed");
                    }
                }
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_RECONNECT_BACKOFF);
            }
        });
        (cache, handle)
    }

    fn spawn_trade_task(
        &self,
        symbol: Symbol,
    ) -> (
        Arc<SyncMutex<TradeStats>>,
        Arc<SyncMutex<VecDeque<(TimestampMs, f64)>>>,
        JoinHandle<()>,
    ) {
        let cache = Arc::new(SyncMutex::new(TradeStats::default()));
        let ring: Arc<SyncMutex<VecDeque<(TimestampMs, f64)>>> = Arc::new(SyncMutex::new(VecDeque::new()));
        let cache_clone = cache.clone();
        let ring_clone = ring.clone();
        let connector = self.trade_connector.clone();
        let handle = tokio::spawn(async move {
            let mut backoff = MIN_RECONNECT_BACKOFF;
            loop {
                match connector.connect(symbol.clone()).await {
                    Ok(mut stream) => {
                        backoff = MIN_RECONNECT_BACKOFF;
                        while let Some(trade) = stream.next_trade().await {
                            let mut ring = ring_clone.lock();
                            ring.push_back((trade.ts, trade.qty));
                            if ring.len() > TRADE_RING_CAPACITY {
                                ring.pop_front();
                            }
                            let cutoff = trade.ts - TRADE_WINDOW.as_millis() as i64;
                            while matches!(ring.front(), Some((ts, _)) if *ts < cutoff) {
                                ring.pop_front();
                            }
                            let count = ring.len();
                            let volume: f64 = ring.iter().map(|(_, qty)| qty).sum();
                            *cache_clone.lock() = TradeStats {
                                trades_per_minute: count as f64,
                                volume_per_minute: volume,
                                last_price: trade.price,
                                timestamp: trade.ts,
                            };
                        }
                        debug!(%symbol, "trade stream ended, reconnecting");
                    }
                    Err(err) => {
                        warn!(%symbol, %err, "trade feed connect failed");
                    }
                }
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_RECONNECT_BACKOFF);
            }
        });
        (cache, ring, handle)
    }
}

impl MarketStreamer for WsStreamer {
    fn ensure_symbol(&self, symbol: Symbol) {
        let mut registry = self.registry.lock();
        if registry.contains_key(&symbol) {
            return;
        }
        let (depth_cache, depth_task) = self.spawn_depth_task(symbol.clone());
        let (trade_cache, trade_ring, trade_task) = self.spawn_trade_task(symbol.clone());
        registry.insert(
            symbol,
            SymbolState {
                depth_cache,
                trade_cache,
                trade_ring,
                depth_task,
                trade_task,
            },
        );
    }

    fn get_depth_snapshot(&self, symbol: &Symbol) -> Option<DepthSnapshot> {
        self.registry.lock().get(symbol)?.depth_cache.lock().clone()
    }

    fn get_trade_stats(&self, symbol: &Symbol) -> Option<TradeStats> {
        Some(*self.registry.lock().get(symbol)?.trade_cache.lock())
    }

    fn stop(&self) {
        self.registry.lock().clear();
    }
}

fn now_ms() -> TimestampMs {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_book_computes_spread_and_bands() {
        let mut book = LocalBook::default();
        book.apply(DepthUpdate::Snapshot {
            side: BookSide::Bid,
            levels: vec![(100.0, 5.0), (99.7, 5.0), (99.0, 5.0)],
        });
        book.apply(DepthUpdate::Snapshot {
            side: BookSide::Ask,
            levels: vec![(100.2, 5.0), (100.5, 5.0), (101.0, 5.0)],
        });
        let snap = book.snapshot().unwrap();
        assert!((snap.best_bid - 100.0).abs() < 1e-9);
        assert!((snap.best_ask - 100.2).abs() < 1e-9);
        assert!(snap.spread_bps > 0.0);
        // only the 100.0 level is within 0.3% of 100.0
        assert!((snap.bid_depth_0_3pct - 500.0).abs() < 1e-6);
    }

    #[test]
    fn delta_with_zero_size_deletes_level() {
        let mut book = LocalBook::default();
        book.apply(DepthUpdate::Snapshot {
            side: BookSide::Bid,
            levels: vec![(100.0, 5.0)],
        });
        book.apply(DepthUpdate::Delta {
            side: BookSide::Bid,
            price: 100.0,
            size: 0.0,
        });
        assert!(book.bids.is_empty());
    }
}
