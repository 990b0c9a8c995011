use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fraction of closed trades that were winners, in `[0, 1]`, as `wins/total`.
///
/// Returns `None` when there are no trades (`total = 0`) or the division
/// would overflow.
///
/// Reference: <https://www.investopedia.com/terms/w/win-loss-ratio.asp>
#[derive(Debug, Clone, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
pub struct WinRate {
    pub value: Decimal,
}

impl WinRate {
    /// Computes the [`WinRate`] from the winning-trade count and the total.
    pub fn calculate(wins: Decimal, total: Decimal) -> Option<Self> {
        if total == Decimal::ZERO {
            None
        } else {
            let value = wins.abs().checked_div(total.abs())?;
            Some(Self { value })
        }
    }
}
