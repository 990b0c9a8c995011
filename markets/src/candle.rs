use crate::error::MarketsError;
use crate::TimestampMs;
use serde::{Deserialize, Serialize};

/// A single OHLCV bar.
///
/// Construction enforces basic sanity invariants: `open/high/low/close > 0`,
/// `volume >= 0`, `low <= min(open, close, high)`, `high >= max(open, close, low)`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Candle {
    pub ts: TimestampMs,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(
        ts: TimestampMs,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, MarketsError> {
        for price in [open, high, low, close] {
            if !price.is_finite() || price <= 0.0 {
                return Err(MarketsError::InvalidPrice(price));
            }
        }
        if !volume.is_finite() || volume < 0.0 {
            return Err(MarketsError::InvalidVolume(volume));
        }
        if low > open.min(close).min(high) || high < open.max(close).max(low) {
            return Err(MarketsError::InconsistentCandle {
                open,
                high,
                low,
                close,
            });
        }
        Ok(Self {
            ts,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// `(high + low + close) / 3`
    pub fn typical(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// `(high + low) / 2`
    pub fn hl2(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// `(open + high + low + close) / 4`
    pub fn ohlc4(&self) -> f64 {
        (self.open + self.high + self.low + self.close) / 4.0
    }

    /// True range against the previous candle's close, i.e. the input to
    /// Wilder's ATR.
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        match prev_close {
            None => self.high - self.low,
            Some(prev_close) => {
                let a = self.high - self.low;
                let b = (self.high - prev_close).abs();
                let c = (self.low - prev_close).abs();
                a.max(b).max(c)
            }
        }
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// `|close - open| / (high - low)`, or `0.0` for a zero-range bar.
    pub fn body_ratio(&self) -> f64 {
        let range = self.range();
        if range <= 0.0 {
            0.0
        } else {
            self.body() / range
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inconsistent_ohlc() {
        assert!(Candle::new(0, 100.0, 90.0, 80.0, 95.0, 10.0).is_err());
    }

    #[test]
    fn rejects_non_positive_price() {
        assert!(Candle::new(0, 0.0, 1.0, 0.0, 1.0, 10.0).is_err());
    }

    #[test]
    fn accepts_valid_candle() {
        let c = Candle::new(0, 100.0, 105.0, 99.0, 102.0, 50.0).unwrap();
        assert!((c.typical() - (105.0 + 99.0 + 102.0) / 3.0).abs() < 1e-9);
    }
}
