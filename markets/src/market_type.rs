use serde::{Deserialize, Serialize};

/// Whether an instrument is a spot market, a futures/perpetual contract, or
/// unknown (the provider could not classify it, e.g. a delisted symbol).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Deserialize, Serialize)]
pub enum MarketType {
    Spot,
    Futures,
    #[default]
    Unknown,
}

/// Contract settlement style for a futures instrument, used to normalise
/// WS-reported depth notional back to USD.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum ContractKind {
    Linear,
    Inverse,
}

/// Per-market contract metadata used to normalise raw exchange quantities
/// into USD notional. Absent metadata means "use values as-is".
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ContractMeta {
    pub kind: ContractKind,
    pub contract_size: f64,
}

impl ContractMeta {
    /// Convert a raw `(price, size)` pair into USD notional:
    /// linear multiplies by `contractSize`; inverse converts
    /// `size / price * contractSize`.
    pub fn notional_usd(&self, price: f64, size: f64) -> Option<f64> {
        if price <= 0.0 || !price.is_finite() || size < 0.0 || !size.is_finite() {
            return None;
        }
        let notional = match self.kind {
            ContractKind::Linear => price * size * self.contract_size,
            ContractKind::Inverse => (size / price) * self.contract_size,
        };
        notional.is_finite().then_some(notional)
    }
}
