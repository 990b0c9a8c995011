use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Identifies the venue a [`crate::Symbol`] trades on.
///
/// Kept as a closed enum (rather than a free-form string) so that
/// venue-specific quirks — contract multipliers, rate-limit categories —
/// can be matched on exhaustively at the adapter boundary.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum ExchangeId {
    Binance,
    Bybit,
    Okx,
    Kraken,
    GateIo,
    /// Deterministic exchange used by paper-trading and tests.
    Paper,
}

impl ExchangeId {
    /// Whether this venue's perpetual contracts are linear (quoted/settled
    /// in the quote asset) as opposed to inverse (settled in the base asset).
    ///
    /// All currently supported venues are linear-only; inverse contracts are
    /// a documented extension point (see [`crate::market_type::ContractKind`]).
    pub fn is_linear_only(&self) -> bool {
        true
    }
}

impl Display for ExchangeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExchangeId::Binance => "binance",
            ExchangeId::Bybit => "bybit",
            ExchangeId::Okx => "okx",
            ExchangeId::Kraken => "kraken",
            ExchangeId::GateIo => "gateio",
            ExchangeId::Paper => "paper",
        };
        write!(f, "{name}")
    }
}
