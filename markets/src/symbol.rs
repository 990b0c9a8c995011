use crate::error::MarketsError;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::str::FromStr;

/// A normalised instrument ticker, e.g. `"BTCUSDT"`.
///
/// Cheap to clone (backed by [`SmolStr`]) since it is threaded through every
/// pipeline stage from scan to execution.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display, Serialize, Deserialize)]
pub struct Symbol(SmolStr);

impl Symbol {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, MarketsError> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(MarketsError::EmptySymbol);
        }
        Ok(Self(SmolStr::new(raw.to_ascii_uppercase())))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for Symbol {
    type Err = MarketsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Symbol::new(s)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
