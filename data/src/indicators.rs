//! Shared indicator math: ATR, Bollinger width, VWAP, rolling Pearson
//! correlation, and the robust-to-outliers helpers the scanner and level
//! detector build on (median, volume surge).

use breakout_markets::{safe_divide, Candle};

/// Wilder's ATR(n): an EMA of true range seeded by the simple average of
/// the first `period` true ranges. Returns `None` if fewer than `period + 1`
/// candles are available (the first true range needs a previous close).
pub fn atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }
    let mut true_ranges = Vec::with_capacity(candles.len() - 1);
    for window in candles.windows(2) {
        let [prev, cur] = window else { unreachable!() };
        true_ranges.push(cur.true_range(Some(prev.close)));
    }

    let seed: f64 = true_ranges[..period].iter().sum::<f64>() / period as f64;
    let mut atr = seed;
    for tr in &true_ranges[period..] {
        atr = (atr * (period as f64 - 1.0) + tr) / period as f64;
    }
    Some(atr)
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Median, robust to outliers (used for volume-surge ratios).
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Bollinger Band width percentage: `(upper - lower) / middle * 100` on a
/// `(period, sigma)` configuration, computed over the trailing `period`
/// closes.
pub fn bollinger_width_pct(closes: &[f64], period: usize, sigma: f64) -> Option<f64> {
    if closes.len() < period || period == 0 {
        return None;
    }
    let window = &closes[closes.len() - period..];
    let middle = mean(window);
    let sd = stdev(window);
    let upper = middle + sigma * sd;
    let lower = middle - sigma * sd;
    safe_divide(upper - lower, middle).map(|ratio| ratio * 100.0)
}

/// Cumulative VWAP over the given candles: `sum(typical * volume) / sum(volume)`.
pub fn vwap(candles: &[Candle]) -> Option<f64> {
    let mut pv = 0.0;
    let mut vol = 0.0;
    for c in candles {
        pv += c.typical() * c.volume;
        vol += c.volume;
    }
    safe_divide(pv, vol)
}

/// Rolling Pearson correlation between two equal-length close-price series,
/// using `period = min(20, n)` trailing observations.
pub fn rolling_correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len().min(b.len());
    if n < 2 {
        return None;
    }
    let period = n.min(20);
    let a = &a[a.len() - period..];
    let b = &b[b.len() - period..];

    let mean_a = mean(a);
    let mean_b = mean(b);
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..period {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    safe_divide(cov, (var_a * var_b).sqrt()).map(|c| c.clamp(-1.0, 1.0))
}

/// `v[-12:]` median divided by `v[-24:-12]` median, on 5-minute volumes.
/// Returns `None` if fewer than 24 bars are available.
pub fn volume_surge_1h(volumes: &[f64]) -> Option<f64> {
    if volumes.len() < 24 {
        return None;
    }
    let recent = &volumes[volumes.len() - 12..];
    let prior = &volumes[volumes.len() - 24..volumes.len() - 12];
    safe_divide(median(recent), median(prior))
}

/// `v[-1] / median(v[-21:-1])`. Returns `None` if
/// fewer than 21 bars are available.
pub fn volume_surge_5m(volumes: &[f64]) -> Option<f64> {
    if volumes.len() < 21 {
        return None;
    }
    let last = *volumes.last().unwrap();
    let prior = &volumes[volumes.len() - 21..volumes.len() - 1];
    safe_divide(last, median(prior))
}

/// Exponential moving average over `period` bars, seeded by the simple
/// average of the first `period` values. Returns `None` if fewer than
/// `period` values are available. Used by the position manager's add-on
/// sizing gate (proximity to EMA(9)).
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let seed = mean(&values[..period]);
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut value = seed;
    for v in &values[period..] {
        value = alpha * v + (1.0 - alpha) * value;
    }
    Some(value)
}
