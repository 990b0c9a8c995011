use crate::time::TimeInterval;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sharpe variant that penalizes only downside volatility.
#[derive(Debug, Clone, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
pub struct SortinoRatio<Interval> {
    pub value: Decimal,
    pub interval: Interval,
}

impl<Interval> SortinoRatio<Interval>
where
    Interval: TimeInterval,
{
    pub fn calculate(
        risk_free_return: Decimal,
        mean_return: Decimal,
        downside_deviation: Decimal,
        returns_period: Interval,
    ) -> Self {
        if downside_deviation.is_zero() {
            Self {
                value: Decimal::MAX,
                interval: returns_period,
            }
        } else {
            let excess_returns = mean_return - risk_free_return;
            Self {
                value: excess_returns.checked_div(downside_deviation).unwrap(),
                interval: returns_period,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Daily;
    use rust_decimal_macros::dec;

    #[test]
    fn calculates_ratio_against_downside_deviation() {
        let sortino = SortinoRatio::calculate(dec!(0.0015), dec!(0.0025), dec!(0.02), Daily);
        assert_eq!(sortino.value, dec!(0.05));
    }

    #[test]
    fn zero_downside_deviation_yields_max() {
        let sortino = SortinoRatio::calculate(dec!(0.001), dec!(0.002), dec!(0.0), Daily);
        assert_eq!(sortino.value, Decimal::MAX);
    }
}
