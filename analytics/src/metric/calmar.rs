use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Annualized return divided by maximum drawdown: a tail-risk-adjusted
/// return measure.
#[derive(Debug, Clone, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
pub struct CalmarRatio {
    pub value: Decimal,
}

impl CalmarRatio {
    /// `max_drawdown_pct` is expected non-negative (e.g. `0.1` for a 10%
    /// drawdown). Returns `None` when there is no return history to rank.
    pub fn calculate(annualized_return: Decimal, max_drawdown_pct: Decimal) -> Option<Self> {
        if max_drawdown_pct.is_zero() {
            return Some(Self { value: Decimal::MAX });
        }
        Some(Self {
            value: annualized_return.checked_div(max_drawdown_pct.abs())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn calculates_ratio_of_return_to_drawdown() {
        let calmar = CalmarRatio::calculate(dec!(0.20), dec!(0.10)).unwrap();
        assert_eq!(calmar.value, dec!(2.0));
    }

    #[test]
    fn zero_drawdown_yields_max() {
        let calmar = CalmarRatio::calculate(dec!(0.20), dec!(0.0)).unwrap();
        assert_eq!(calmar.value, Decimal::MAX);
    }
}
