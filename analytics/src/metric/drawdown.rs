use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A completed peak-to-trough-to-recovery equity move.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Drawdown {
    pub peak: Decimal,
    pub trough: Decimal,
    pub peak_ts: DateTime<Utc>,
    pub trough_ts: DateTime<Utc>,
    pub recovery_ts: DateTime<Utc>,
}

impl Drawdown {
    /// Magnitude of the drawdown as a fraction of the peak (e.g. `0.1` for
    /// a 10% decline).
    pub fn magnitude_pct(&self) -> Decimal {
        if self.peak.is_zero() {
            Decimal::ZERO
        } else {
            (self.peak - self.trough) / self.peak
        }
    }
}

/// Tracks a running equity curve and emits a [`Drawdown`] each time the
/// curve recovers to a new high after dipping below the prior one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawdownGenerator {
    peak: Decimal,
    peak_ts: DateTime<Utc>,
    trough: Decimal,
    trough_ts: DateTime<Utc>,
}

impl DrawdownGenerator {
    pub fn init(start_value: Decimal, ts: DateTime<Utc>) -> Self {
        Self {
            peak: start_value,
            peak_ts: ts,
            trough: start_value,
            trough_ts: ts,
        }
    }

    /// Feed the next equity observation. Returns the just-closed
    /// [`Drawdown`] when `value` recovers to or past the running peak
    /// after a dip below it; otherwise updates internal state and returns
    /// `None`.
    pub fn update(&mut self, value: Decimal, ts: DateTime<Utc>) -> Option<Drawdown> {
        if value >= self.peak {
            let closed = if self.trough < self.peak {
                Some(Drawdown {
                    peak: self.peak,
                    trough: self.trough,
                    peak_ts: self.peak_ts,
                    trough_ts: self.trough_ts,
                    recovery_ts: ts,
                })
            } else {
                None
            };
            self.peak = value;
            self.peak_ts = ts;
            self.trough = value;
            self.trough_ts = ts;
            closed
        } else {
            if value < self.trough {
                self.trough = value;
                self.trough_ts = ts;
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn emits_on_recovery_above_prior_peak() {
        let t0 = DateTime::<Utc>::MIN_UTC;
        let mut gen = DrawdownGenerator::init(dec!(100), t0);
        assert!(gen.update(dec!(90), t0 + chrono::TimeDelta::days(1)).is_none());
        let dd = gen.update(dec!(120), t0 + chrono::TimeDelta::days(2)).unwrap();
        assert_eq!(dd.peak, dec!(100));
        assert_eq!(dd.trough, dec!(90));
    }

    #[test]
    fn no_drawdown_while_only_making_new_highs() {
        let t0 = DateTime::<Utc>::MIN_UTC;
        let mut gen = DrawdownGenerator::init(dec!(100), t0);
        assert!(gen.update(dec!(110), t0 + chrono::TimeDelta::days(1)).is_none());
        assert!(gen.update(dec!(120), t0 + chrono::TimeDelta::days(2)).is_none());
    }
}
