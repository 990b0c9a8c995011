use crate::cache::TtlCache;
use crate::exchange_client::ExchangeClient;
use crate::indicators;
use crate::market_data::MarketData;
use crate::streamer::MarketStreamer;
use breakout_markets::{Candle, ContractKind, ContractMeta, L2Depth, MarketType, Symbol};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

const MIN_CANDLES: usize = 20;
const OHLCV_LIMIT: usize = 150;
const OI_TTL: Duration = Duration::from_secs(60);
const BTC_TTL: Duration = Duration::from_secs(30);
const DEFAULT_CONCURRENCY: usize = 10;
const DEFAULT_BTC_CORRELATION: f64 = 0.6;

/// Aggregates REST + WS sources into a [`MarketData`] per symbol.
///
/// Open interest is cached for 60s per symbol; BTC reference candles are
/// cached for 30s and shared across every non-BTC symbol in a cycle.
/// `get_multiple_market_data` fans out with a bounded semaphore (default
/// 10); per-symbol failures are skipped, never propagated.
pub struct MarketDataProvider {
    client: Arc<dyn ExchangeClient>,
    streamer: Option<Arc<dyn MarketStreamer>>,
    contract_meta: dashmap_like::Map<Symbol, ContractMeta>,
    oi_cache: TtlCache<Symbol, Option<f64>>,
    btc_candles: TtlCache<(), Vec<Candle>>,
    concurrency: usize,
    btc_symbol: Symbol,
}

impl std::fmt::Debug for MarketDataProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataProvider")
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

/// A tiny sync-mutex-guarded map; avoids pulling in `dashmap` for a handful
/// of contract-metadata entries refreshed rarely.
mod dashmap_like {
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::hash::Hash;

    pub struct Map<K, V>(Mutex<HashMap<K, V>>);

    impl<K: Eq + Hash + Clone, V: Clone> Map<K, V> {
        pub fn new() -> Self {
            Self(Mutex::new(HashMap::new()))
        }

        pub fn get(&self, k: &K) -> Option<V> {
            self.0.lock().get(k).cloned()
        }

        pub fn insert(&self, k: K, v: V) {
            self.0.lock().insert(k, v);
        }
    }
}

impl MarketDataProvider {
    pub fn new(client: Arc<dyn ExchangeClient>, btc_symbol: Symbol) -> Self {
        Self::with_streamer(client, None, btc_symbol)
    }

    pub fn with_streamer(
        client: Arc<dyn ExchangeClient>,
        streamer: Option<Arc<dyn MarketStreamer>>,
        btc_symbol: Symbol,
    ) -> Self {
        Self {
            client,
            streamer,
            contract_meta: dashmap_like::Map::new(),
            oi_cache: TtlCache::new(OI_TTL),
            btc_candles: TtlCache::new(BTC_TTL),
            concurrency: DEFAULT_CONCURRENCY,
            btc_symbol,
        }
    }

    pub fn register_contract_meta(&self, symbol: Symbol, meta: ContractMeta) {
        self.contract_meta.insert(symbol, meta);
    }

    /// Build a single symbol's [`MarketData`], returning `None` if any
    /// rejection criteria are met (too few candles, no depth, no last
    /// price, or no trade flow).
    pub async fn get_market_data(&self, symbol: &Symbol) -> Option<MarketData> {
        if let Some(streamer) = self.streamer.as_ref() {
            streamer.ensure_symbol(symbol.clone());
        }

        let ticker = match self.client.fetch_ticker(symbol).await {
            Ok(t) => t,
            Err(err) => {
                debug!(%symbol, %err, "ticker fetch failed, skipping symbol");
                return None;
            }
        };

        let candles = match self
            .client
            .fetch_ohlcv(symbol, "5m", OHLCV_LIMIT, None)
            .await
        {
            Ok(c) => c,
            Err(err) => {
                debug!(%symbol, %err, "ohlcv fetch failed, skipping symbol");
                return None;
            }
        };
        if candles.len() < MIN_CANDLES {
            debug!(%symbol, count = candles.len(), "too few candles, skipping symbol");
            return None;
        }

        let l2_depth = self.resolve_depth(symbol).await;
        let (best_bid_ok, best_ask_ok) = l2_depth
            .as_ref()
            .map(|d| (d.best_bid > 0.0, d.best_ask > 0.0))
            .unwrap_or((false, false));
        if l2_depth.is_none() || (!best_bid_ok && !best_ask_ok) {
            debug!(%symbol, "no usable depth, skipping symbol");
            return None;
        }

        if ticker.last <= 0.0 {
            debug!(%symbol, "missing last price, skipping symbol");
            return None;
        }

        let trades_per_minute = self.trades_per_minute(symbol, &candles);
        if trades_per_minute <= 0.0 {
            debug!(%symbol, "no trade flow, skipping symbol");
            return None;
        }

        let closes = candles.iter().map(|c| c.close).collect::<Vec<_>>();
        let atr_5m = indicators::atr(&candles, 14).unwrap_or(0.0);
        let atr_15m = self.estimate_atr_15m(atr_5m, ticker.percentage);
        let bb_width_pct = indicators::bollinger_width_pct(&closes, 20, 2.0).unwrap_or(0.0);
        let btc_correlation = self.btc_correlation(symbol, &closes).await;

        let oi_usd = self.cached_open_interest(symbol).await;
        let volume_24h_usd = ticker.quote_volume.unwrap_or(0.0);
        let market_type = if oi_usd.is_some() {
            MarketType::Futures
        } else {
            MarketType::Unknown
        };

        Some(MarketData {
            symbol: symbol.clone(),
            price: ticker.last,
            volume_24h_usd,
            oi_usd,
            oi_change_24h: None,
            trades_per_minute,
            atr_5m,
            atr_15m,
            bb_width_pct,
            btc_correlation,
            l2_depth,
            candles_5m: candles,
            timestamp: chrono::Utc::now().timestamp_millis(),
            market_type,
        })
    }

    /// Fan out over `symbols` bounded by a semaphore (default 10).
    /// Cancellations are logged at debug level, not treated as errors
    ///.
    pub async fn get_multiple_market_data(&self, symbols: &[Symbol]) -> Vec<MarketData> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(symbols.len());

        for symbol in symbols {
            let symbol = symbol.clone();
            let semaphore = semaphore.clone();
            // SAFETY-free: provider isn't Send across the closure boundary
            // as `&self`, so we clone what we need instead of spawning.
            handles.push(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        debug!(%symbol, "semaphore closed, skipping symbol");
                        return None;
                    }
                };
                self.get_market_data(&symbol).await
            });
        }

        futures::future::join_all(handles)
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    async fn resolve_depth(&self, symbol: &Symbol) -> Option<L2Depth> {
        if let Some(streamer) = &self.streamer {
            if let Some(snapshot) = streamer.get_depth_snapshot(symbol) {
                return Some(self.normalise_depth(symbol, snapshot.depth));
            }
        }
        match self.client.fetch_order_book(symbol, 50).await {
            Ok(Some(depth)) => Some(self.normalise_depth(symbol, depth)),
            Ok(None) => None,
            Err(err) => {
                warn!(%symbol, %err, "order book fetch failed");
                None
            }
        }
    }

    /// Normalise WS/REST depth notional by contract metadata when present
    ///: linear multiplies raw notional by `contractSize`; inverse
    /// treats the raw figure as contract count and converts via
    /// `size/price*contractSize`. Values pass through unchanged when no
    /// metadata is registered.
    fn normalise_depth(&self, symbol: &Symbol, depth: L2Depth) -> L2Depth {
        let Some(meta) = self.contract_meta.get(symbol) else {
            return depth;
        };
        let scale = |raw_notional: f64, ref_price: f64| -> f64 {
            match meta.kind {
                ContractKind::Linear => raw_notional * meta.contract_size,
                ContractKind::Inverse => {
                    breakout_markets::safe_divide(raw_notional, ref_price)
                        .map(|size| size * meta.contract_size)
                        .unwrap_or(raw_notional)
                }
            }
        };
        L2Depth {
            bid_depth_0_3pct: scale(depth.bid_depth_0_3pct, depth.best_bid),
            bid_depth_0_5pct: scale(depth.bid_depth_0_5pct, depth.best_bid),
            ask_depth_0_3pct: scale(depth.ask_depth_0_3pct, depth.best_ask),
            ask_depth_0_5pct: scale(depth.ask_depth_0_5pct, depth.best_ask),
            ..depth
        }
    }

    fn trades_per_minute(&self, symbol: &Symbol, candles: &[Candle]) -> f64 {
        if let Some(streamer) = &self.streamer {
            if let Some(stats) = streamer.get_trade_stats(symbol) {
                if stats.trades_per_minute > 0.0 {
                    return stats.trades_per_minute;
                }
            }
        }
        // Estimate from recent candle volume when WS stats are unavailable.
        candles.last().map(|c| c.volume).unwrap_or(0.0)
    }

    /// `atr_15m` estimated as `1.5 * atr_5m`, falling back to the ticker's
    /// 24h percent change when `atr_5m` is unavailable. See DESIGN.md for
    /// the open-question rationale.
    fn estimate_atr_15m(&self, atr_5m: f64, percentage_24h: Option<f64>) -> f64 {
        if atr_5m > 0.0 {
            1.5 * atr_5m
        } else {
            percentage_24h.unwrap_or(0.0).abs()
        }
    }

    async fn cached_open_interest(&self, symbol: &Symbol) -> Option<f64> {
        if let Some(cached) = self.oi_cache.get(symbol) {
            return cached;
        }
        let oi = match self.client.fetch_open_interest(symbol).await {
            Ok(Some(oi)) => oi.open_interest_value,
            _ => None,
        };
        self.oi_cache.insert(symbol.clone(), oi);
        oi
    }

    async fn btc_correlation(&self, symbol: &Symbol, closes: &[f64]) -> f64 {
        if symbol == &self.btc_symbol {
            return 1.0;
        }
        let btc_candles = match self.btc_candles.get(&()) {
            Some(candles) => candles,
            None => {
                match self
                    .client
                    .fetch_ohlcv(&self.btc_symbol, "5m", OHLCV_LIMIT, None)
                    .await
                {
                    Ok(candles) => {
                        self.btc_candles.insert((), candles.clone());
                        candles
                    }
                    Err(_) => return DEFAULT_BTC_CORRELATION,
                }
            }
        };
        let btc_closes = btc_candles.iter().map(|c| c.close).collect::<Vec<_>>();
        indicators::rolling_correlation(closes, &btc_closes).unwrap_or(DEFAULT_BTC_CORRELATION)
    }
}
