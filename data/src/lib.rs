#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations)]

//! Market-data provider: REST/WS adapters, indicator math, and the
//! aggregation pipeline that builds a [`market_data::MarketData`] per
//! symbol.

pub mod cache;
pub mod dqa;
pub mod error;
pub mod exchange_client;
pub mod indicators;
pub mod market_data;
pub mod provider;
pub mod snapshot;
pub mod streamer;

pub use dqa::DqaMetrics;
pub use error::DataError;
pub use exchange_client::{
    CreateOrderRequest, ExchangeClient, MarketMeta, OpenInterest, PaperExchangeClient, RawFill,
    Ticker,
};
pub use market_data::MarketData;
pub use provider::MarketDataProvider;
pub use snapshot::{DepthSnapshot, TradeStats};
pub use streamer::{MarketStreamer, WsStreamer};
