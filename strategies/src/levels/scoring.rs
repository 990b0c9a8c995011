use super::candidates::MergedCandidate;
use super::TradingLevel;
use breakout_markets::{Candle, LevelType, Symbol};

/// One candle's interaction with a candidate level price.
struct Touch {
    index: usize,
    ts: i64,
    volume: f64,
    /// `true` when the candle closed through the level by more than the
    /// touch tolerance instead of respecting it.
    pierced: bool,
}

/// Validate a merged candidate against the candle history and, if it has
/// enough touches, score it into a [`TradingLevel`]. The level's
/// type (support vs resistance) is decided by its position relative to the
/// current price.
pub(super) fn validate_and_score(
    symbol: &Symbol,
    candidate: MergedCandidate,
    candles: &[Candle],
    tolerance: f64,
    min_touches: usize,
) -> Option<TradingLevel> {
    let price = candidate.price;
    let touches = find_touches(candles, price, tolerance);
    if touches.len() < min_touches {
        return None;
    }

    let current_price = candles.last()?.close;
    let level_type = if price <= current_price {
        LevelType::Support
    } else {
        LevelType::Resistance
    };

    let first_touch_ts = touches.first().map(|t| t.ts).unwrap_or_default();
    let last_touch_ts = touches.last().map(|t| t.ts).unwrap_or_default();
    let volume_at_level: f64 = touches.iter().map(|t| t.volume).sum();
    let pierce_count = touches.iter().filter(|t| t.pierced).count();

    let touch_strength = (touches.len() as f64 / 10.0).clamp(0.0, 1.0);

    let span_ms = (last_touch_ts - first_touch_ts).max(0) as f64;
    let history_span_ms = candles
        .last()
        .map(|c| (c.ts - candles.first().map(|f| f.ts).unwrap_or(c.ts)).max(1) as f64)
        .unwrap_or(1.0);
    let time_strength = (span_ms / history_span_ms).clamp(0.0, 1.0);

    let avg_touch_volume = volume_at_level / touches.len() as f64;
    let avg_candle_volume = breakout_markets::safe_divide(
        candles.iter().map(|c| c.volume).sum(),
        candles.len() as f64,
    )
    .unwrap_or(0.0);
    let volume_strength = if avg_candle_volume <= 0.0 {
        0.0
    } else {
        (avg_touch_volume / avg_candle_volume / 2.0).clamp(0.0, 1.0)
    };

    let pierce_penalty = 1.0 - breakout_markets::safe_divide(pierce_count as f64, touches.len() as f64)
        .unwrap_or(0.0);

    let mut strength =
        0.4 * touch_strength + 0.2 * time_strength + 0.2 * volume_strength + 0.2 * pierce_penalty;

    let is_round_number = is_round_number(price);
    if is_round_number {
        strength += 0.05;
    }
    if approached_directionally(candles, &touches, price) {
        strength += 0.05;
    }
    strength = strength.clamp(0.0, 1.0);

    Some(TradingLevel {
        symbol: symbol.clone(),
        level_type,
        price,
        touches: touches.len(),
        strength,
        first_touch_ts,
        last_touch_ts,
        volume_at_level,
        is_round_number,
    })
}

fn find_touches(candles: &[Candle], price: f64, tolerance: f64) -> Vec<Touch> {
    candles
        .iter()
        .enumerate()
        .filter_map(|(index, candle)| {
            let distance_to_low = (candle.low - price).abs();
            let distance_to_high = (candle.high - price).abs();
            let touched = distance_to_low <= tolerance || distance_to_high <= tolerance;
            if !touched {
                return None;
            }
            let pierced = (candle.close - price).abs() > tolerance
                && ((price < candle.close && candle.low < price - tolerance)
                    || (price > candle.close && candle.high > price + tolerance));
            Some(Touch {
                index,
                ts: candle.ts,
                volume: candle.volume,
                pierced,
            })
        })
        .collect()
}

/// A level price is "round" if it sits close to a clean decimal step
/// relative to its own magnitude (e.g. `45000` or `1.50`, not `45123.7`).
fn is_round_number(price: f64) -> bool {
    if price <= 0.0 {
        return false;
    }
    let magnitude = 10f64.powf(price.abs().log10().floor());
    let step = magnitude / 10.0;
    let remainder = price % step;
    remainder < step * 0.02 || (step - remainder) < step * 0.02
}

/// Whether the candles immediately before the first touch moved toward the
/// level monotonically, i.e. the approach looked directional rather than
/// noisy chop.
fn approached_directionally(candles: &[Candle], touches: &[Touch], price: f64) -> bool {
    let Some(first) = touches.first() else { return false };
    if first.index < 3 {
        return false;
    }
    let window = &candles[first.index - 3..first.index];
    let moving_toward_level = window.windows(2).all(|pair| {
        let (a, b) = (pair[0].close, pair[1].close);
        if price >= a {
            b >= a
        } else {
            b <= a
        }
    });
    moving_toward_level
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64, close: f64, volume: f64) -> Candle {
        Candle::new(ts, close, close + 1.0, close - 1.0, close, volume).unwrap()
    }

    #[test]
    fn round_number_detection() {
        assert!(is_round_number(45_000.0));
        assert!(is_round_number(1.50));
        assert!(!is_round_number(45_123.7));
    }

    #[test]
    fn insufficient_touches_returns_none() {
        let candles = vec![candle(0, 100.0, 10.0), candle(300_000, 101.0, 10.0)];
        let symbol = Symbol::new("AAAUSDT").unwrap();
        let result = validate_and_score(&symbol, MergedCandidate { price: 100.0 }, &candles, 0.5, 3);
        assert!(result.is_none());
    }
}
