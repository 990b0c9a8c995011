use crate::error::DataError;
use async_trait::async_trait;
use breakout_markets::{Candle, ContractKind, L2Depth, OrderSide, OrderType, Symbol, TimestampMs};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Normalised ticker shape returned by [`ExchangeClient::fetch_ticker`].
/// `extra` is the escape hatch for venue-specific fields the core never
/// interprets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub last: f64,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub quote_volume: Option<f64>,
    pub percentage: Option<f64>,
    #[serde(default)]
    pub extra: serde_json::Value,
}

/// Open-interest reading for a futures instrument.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OpenInterest {
    pub open_interest_value: Option<f64>,
}

/// Per-market metadata returned by [`ExchangeClient::fetch_markets`],
/// filtered by the adapter to active linear USDT swaps (or spot, if
/// configured).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketMeta {
    pub symbol: Symbol,
    pub contract: bool,
    pub kind: Option<ContractKind>,
    pub contract_size: Option<f64>,
    pub active: bool,
    pub status: String,
}

/// Parameters for [`ExchangeClient::create_order`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub symbol: Symbol,
    pub order_type: OrderType,
    pub side: OrderSide,
    pub amount: f64,
    pub price: Option<f64>,
    pub reduce_only: bool,
    pub post_only: bool,
    pub time_in_force: Option<String>,
    /// Reference price used by the paper simulator's fill model; a live
    /// adapter ignores this and fills at whatever the book gives it.
    pub reference_price: f64,
}

/// Raw fill information returned by the adapter; the core maps this onto
/// its own `Order` aggregate (execution crate).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawFill {
    pub filled_qty: f64,
    pub avg_fill_price: f64,
    pub fees_usd: f64,
}

/// External collaborator: REST surface of an exchange, normalised to the
/// shapes in . Every method is expected to pass through a
/// [`breakout_integration::RateLimiter`] classified by endpoint; the core
/// never talks to a venue directly.
#[async_trait]
pub trait ExchangeClient: Send + Sync + std::fmt::Debug {
    async fn fetch_ohlcv(
        &self,
        symbol: &Symbol,
        timeframe: &str,
        limit: usize,
        since: Option<TimestampMs>,
    ) -> Result<Vec<Candle>, DataError>;

    async fn fetch_order_book(&self, symbol: &Symbol, limit: usize) -> Result<Option<L2Depth>, DataError>;

    async fn fetch_ticker(&self, symbol: &Symbol) -> Result<Ticker, DataError>;

    async fn fetch_open_interest(&self, symbol: &Symbol) -> Result<Option<OpenInterest>, DataError>;

    async fn fetch_markets(&self) -> Result<Vec<MarketMeta>, DataError>;

    async fn fetch_balance(&self) -> Result<HashMap<String, f64>, DataError>;

    async fn create_order(&self, request: CreateOrderRequest) -> Result<RawFill, DataError>;

    async fn cancel_order(&self, order_id: &str, symbol: &Symbol) -> Result<bool, DataError>;
}

#[async_trait]
impl<T> ExchangeClient for std::sync::Arc<T>
where
    T: ExchangeClient + ?Sized,
{
    async fn fetch_ohlcv(
        &self,
        symbol: &Symbol,
        timeframe: &str,
        limit: usize,
        since: Option<TimestampMs>,
    ) -> Result<Vec<Candle>, DataError> {
        (**self).fetch_ohlcv(symbol, timeframe, limit, since).await
    }

    async fn fetch_order_book(&self, symbol: &Symbol, limit: usize) -> Result<Option<L2Depth>, DataError> {
        (**self).fetch_order_book(symbol, limit).await
    }

    async fn fetch_ticker(&self, symbol: &Symbol) -> Result<Ticker, DataError> {
        (**self).fetch_ticker(symbol).await
    }

    async fn fetch_open_interest(&self, symbol: &Symbol) -> Result<Option<OpenInterest>, DataError> {
        (**self).fetch_open_interest(symbol).await
    }

    async fn fetch_markets(&self) -> Result<Vec<MarketMeta>, DataError> {
        (**self).fetch_markets().await
    }

    async fn fetch_balance(&self) -> Result<HashMap<String, f64>, DataError> {
        (**self).fetch_balance().await
    }

    async fn create_order(&self, request: CreateOrderRequest) -> Result<RawFill, DataError> {
        (**self).create_order(request).await
    }

    async fn cancel_order(&self, order_id: &str, symbol: &Symbol) -> Result<bool, DataError> {
        (**self).cancel_order(order_id, symbol).await
    }
}

/// In-memory paper-trading simulator implementing [`ExchangeClient`] by
/// filling orders immediately at the caller-supplied reference price
/// adjusted by configured slippage and fees, maintaining a USDT ledger and
/// refusing buys that would exceed the free balance.
#[derive(Debug)]
pub struct PaperExchangeClient {
    ledger: Mutex<HashMap<String, f64>>,
    slippage_bps: f64,
    fee_bps: f64,
    open_orders: Mutex<HashMap<String, bool>>,
}

impl PaperExchangeClient {
    pub fn new(starting_usdt: f64, slippage_bps: f64, fee_bps: f64) -> Self {
        let mut ledger = HashMap::new();
        ledger.insert("USDT".to_string(), starting_usdt);
        Self {
            ledger: Mutex::new(ledger),
            slippage_bps,
            fee_bps,
            open_orders: Mutex::new(HashMap::new()),
        }
    }

    fn slipped_price(&self, side: OrderSide, reference_price: f64) -> f64 {
        let slip = reference_price * self.slippage_bps / 10_000.0;
        match side {
            OrderSide::Buy => reference_price + slip,
            OrderSide::Sell => reference_price - slip,
        }
    }
}

#[async_trait]
impl ExchangeClient for PaperExchangeClient {
    async fn fetch_ohlcv(
        &self,
        _symbol: &Symbol,
        _timeframe: &str,
        _limit: usize,
        _since: Option<TimestampMs>,
    ) -> Result<Vec<Candle>, DataError> {
        Ok(Vec::new())
    }

    async fn fetch_order_book(&self, _symbol: &Symbol, _limit: usize) -> Result<Option<L2Depth>, DataError> {
        Ok(None)
    }

    async fn fetch_ticker(&self, _symbol: &Symbol) -> Result<Ticker, DataError> {
        Err(DataError::Request {
            endpoint: "fetch_ticker".to_string(),
            message: "paper client has no market data source; wrap with a MarketDataProvider feed".to_string(),
        })
    }

    async fn fetch_open_interest(&self, _symbol: &Symbol) -> Result<Option<OpenInterest>, DataError> {
        Ok(None)
    }

    async fn fetch_markets(&self) -> Result<Vec<MarketMeta>, DataError> {
        Ok(Vec::new())
    }

    async fn fetch_balance(&self) -> Result<HashMap<String, f64>, DataError> {
        Ok(self.ledger.lock().clone())
    }

    async fn create_order(&self, request: CreateOrderRequest) -> Result<RawFill, DataError> {
        let fill_price = self.slipped_price(request.side, request.reference_price);
        let notional = fill_price * request.amount;
        let fees_usd = notional * self.fee_bps / 10_000.0;

        let mut ledger = self.ledger.lock();
        let free = *ledger.get("USDT").unwrap_or(&0.0);

        if matches!(request.side, OrderSide::Buy) && !request.reduce_only {
            let required = notional + fees_usd;
            if required > free {
                return Err(DataError::InsufficientBalance {
                    requested: required,
                    free,
                });
            }
            *ledger.entry("USDT".to_string()).or_insert(0.0) -= required;
        } else {
            *ledger.entry("USDT".to_string()).or_insert(0.0) += notional - fees_usd;
        }

        self.open_orders
            .lock()
            .insert(format!("paper-{}-{}", request.symbol, request.amount), true);

        Ok(RawFill {
            filled_qty: request.amount,
            avg_fill_price: fill_price,
            fees_usd,
        })
    }

    async fn cancel_order(&self, order_id: &str, _symbol: &Symbol) -> Result<bool, DataError> {
        Ok(self.open_orders.lock().remove(order_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn paper_client_refuses_buy_exceeding_balance() {
        let client = PaperExchangeClient::new(100.0, 0.0, 0.0);
        let symbol = Symbol::new("BTCUSDT").unwrap();
        let result = client
            .create_order(CreateOrderRequest {
                symbol,
                order_type: OrderType::Market,
                side: OrderSide::Buy,
                amount: 1.0,
                price: None,
                reduce_only: false,
                post_only: false,
                time_in_force: None,
                reference_price: 1000.0,
            })
            .await;
        assert!(matches!(result, Err(DataError::InsufficientBalance { .. })));
    }

    #[tokio::test]
    async fn paper_client_fills_within_balance() {
        let client = PaperExchangeClient::new(10_000.0, 10.0, 10.0);
        let symbol = Symbol::new("BTCUSDT").unwrap();
        let fill = client
            .create_order(CreateOrderRequest {
                symbol,
                order_type: OrderType::Market,
                side: OrderSide::Buy,
                amount: 1.0,
                price: None,
                reduce_only: false,
                post_only: false,
                time_in_force: None,
                reference_price: 100.0,
            })
            .await
            .unwrap();
        assert!(fill.avg_fill_price > 100.0);
        assert!(fill.fees_usd > 0.0);
    }
}
