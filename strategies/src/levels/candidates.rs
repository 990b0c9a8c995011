use super::{LevelDetectorConfig, TradingLevel};
use breakout_markets::Candle;

/// A single raw touch price before merging — just "this candle came near
/// this price", with no notion yet of support/resistance or strength.
#[derive(Debug, Clone, Copy)]
pub(super) struct RawCandidate {
    pub price: f64,
    pub volume: f64,
}

/// A cluster of raw candidates collapsed into one proposed level price.
#[derive(Debug, Clone, Copy)]
pub(super) struct MergedCandidate {
    pub price: f64,
}

/// Generate raw level candidates from three independent views of the same
/// candle history: the Donchian channel boundary, local swing
/// highs/lows, and high-volume price buckets (a coarse volume profile).
pub(super) fn generate(candles: &[Candle], config: &LevelDetectorConfig) -> Vec<RawCandidate> {
    let mut raw = Vec::new();
    raw.extend(donchian_candidates(candles, config.donchian_window));
    raw.extend(swing_candidates(candles, config.swing_lookback));
    raw.extend(volume_profile_candidates(candles));
    raw
}

fn donchian_candidates(candles: &[Candle], window: usize) -> Vec<RawCandidate> {
    if candles.is_empty() {
        return Vec::new();
    }
    let window = window.min(candles.len());
    let slice = &candles[candles.len() - window..];

    let highest = slice.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let lowest = slice.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    let volume_at = |target: f64, pick_high: bool| {
        slice
            .iter()
            .filter(|c| if pick_high { c.high == target } else { c.low == target })
            .map(|c| c.volume)
            .sum()
    };

    vec![
        RawCandidate { price: highest, volume: volume_at(highest, true) },
        RawCandidate { price: lowest, volume: volume_at(lowest, false) },
    ]
}

/// A swing high/low is a candle whose high (low) exceeds (is below) every
/// candle within `lookback` positions on both sides.
fn swing_candidates(candles: &[Candle], lookback: usize) -> Vec<RawCandidate> {
    let mut out = Vec::new();
    if candles.len() <= lookback * 2 {
        return out;
    }
    for i in lookback..candles.len() - lookback {
        let window = &candles[i - lookback..=i + lookback];
        let this = &candles[i];
        if window.iter().all(|c| c.high <= this.high) {
            out.push(RawCandidate { price: this.high, volume: this.volume });
        }
        if window.iter().all(|c| c.low >= this.low) {
            out.push(RawCandidate { price: this.low, volume: this.volume });
        }
    }
    out
}

/// Coarse volume profile: bucket closes into a fixed number of price bins
/// and propose a candidate at the center of each bin carrying a
/// disproportionate share of total volume.
fn volume_profile_candidates(candles: &[Candle]) -> Vec<RawCandidate> {
    const BINS: usize = 20;
    if candles.is_empty() {
        return Vec::new();
    }
    let lowest = candles.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    let highest = candles.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    if highest <= lowest {
        return Vec::new();
    }
    let bin_width = (highest - lowest) / BINS as f64;
    let mut volume_by_bin = vec![0.0; BINS];
    for candle in candles {
        let idx = (((candle.close - lowest) / bin_width) as usize).min(BINS - 1);
        volume_by_bin[idx] += candle.volume;
    }
    let total_volume: f64 = volume_by_bin.iter().sum();
    if total_volume <= 0.0 {
        return Vec::new();
    }
    let avg = total_volume / BINS as f64;
    volume_by_bin
        .iter()
        .enumerate()
        .filter(|(_, &v)| v > avg * 1.5)
        .map(|(idx, &v)| RawCandidate {
            price: lowest + bin_width * (idx as f64 + 0.5),
            volume: v,
        })
        .collect()
}

/// Collapse raw candidates within `tolerance` of each other into a single
/// merged price, volume-weighted so high-volume touches pull the level
/// toward themselves.
pub(super) fn merge(raw: Vec<RawCandidate>, tolerance: f64) -> Vec<MergedCandidate> {
    if tolerance <= 0.0 || raw.is_empty() {
        return raw.into_iter().map(|c| MergedCandidate { price: c.price }).collect();
    }

    let mut sorted = raw;
    sorted.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal));

    let mut clusters: Vec<Vec<RawCandidate>> = Vec::new();
    for candidate in sorted {
        match clusters.last_mut() {
            Some(cluster) if (candidate.price - cluster.last().unwrap().price).abs() <= tolerance => {
                cluster.push(candidate);
            }
            _ => clusters.push(vec![candidate]),
        }
    }

    clusters
        .into_iter()
        .map(|cluster| {
            let total_volume: f64 = cluster.iter().map(|c| c.volume).sum();
            let price = if total_volume > 0.0 {
                cluster.iter().map(|c| c.price * c.volume).sum::<f64>() / total_volume
            } else {
                cluster.iter().map(|c| c.price).sum::<f64>() / cluster.len() as f64
            };
            MergedCandidate { price }
        })
        .collect()
}

/// Drop levels whose price is within `tolerance` of a stronger level,
/// keeping only the strongest representative of each cluster.
pub(super) fn remove_overlapping(mut levels: Vec<TradingLevel>, tolerance: f64) -> Vec<TradingLevel> {
    levels.sort_by(|a, b| b.strength.partial_cmp(&a.strength).unwrap_or(std::cmp::Ordering::Equal));
    let mut kept: Vec<TradingLevel> = Vec::new();
    for level in levels {
        let overlaps = kept.iter().any(|k| (k.price - level.price).abs() <= tolerance);
        if !overlaps {
            kept.push(level);
        }
    }
    kept
}
