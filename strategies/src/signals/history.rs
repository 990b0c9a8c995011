use breakout_markets::{Side, Symbol, TimestampMs};
use std::collections::VecDeque;

const RETENTION_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// One recorded momentum breakout, kept so a later retest can confirm the
/// level was actually broken first.
#[derive(Debug, Clone, Copy)]
struct BreakoutRecord {
    symbol_hash: u64,
    level_price: f64,
    side: Side,
    ts: TimestampMs,
}

/// Rolling 7-day log of momentum breakouts, the retest strategy's only
/// dependency on the momentum strategy having fired earlier.
#[derive(Debug, Default)]
pub struct BreakoutHistory {
    records: VecDeque<BreakoutRecord>,
}

fn hash_symbol(symbol: &Symbol) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    symbol.as_str().hash(&mut hasher);
    hasher.finish()
}

impl BreakoutHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, symbol: &Symbol, level_price: f64, side: Side, ts: TimestampMs) {
        self.records.push_back(BreakoutRecord {
            symbol_hash: hash_symbol(symbol),
            level_price,
            side,
            ts,
        });
        self.prune(ts);
    }

    fn prune(&mut self, now_ms: TimestampMs) {
        while let Some(front) = self.records.front() {
            if now_ms - front.ts > RETENTION_MS {
                self.records.pop_front();
            } else {
                break;
            }
        }
    }

    /// Whether a breakout of `side` near `level_price` was recorded for
    /// `symbol` within `lookback_ms` of `now_ms`.
    pub fn has_recent_breakout(
        &self,
        symbol: &Symbol,
        level_price: f64,
        tolerance: f64,
        side: Side,
        now_ms: TimestampMs,
        lookback_ms: i64,
    ) -> bool {
        let symbol_hash = hash_symbol(symbol);
        self.records.iter().any(|record| {
            record.symbol_hash == symbol_hash
                && record.side == side
                && (record.level_price - level_price).abs() <= tolerance
                && now_ms - record.ts <= lookback_ms
        })
    }

    /// Hours since the most recent matching breakout within
    /// `[min_hours, max_hours]` of `now_ms`, if any. Used both to gate the
    /// retest strategy and to compute its recency-based confidence bonus.
    pub fn hours_since_recent_breakout(
        &self,
        symbol: &Symbol,
        level_price: f64,
        tolerance: f64,
        side: Side,
        now_ms: TimestampMs,
        min_hours: f64,
        max_hours: f64,
    ) -> Option<f64> {
        let symbol_hash = hash_symbol(symbol);
        self.records
            .iter()
            .filter(|record| {
                record.symbol_hash == symbol_hash
                    && record.side == side
                    && (record.level_price - level_price).abs() <= tolerance
            })
            .filter_map(|record| {
                let hours = (now_ms - record.ts) as f64 / 3_600_000.0;
                (hours >= min_hours && hours <= max_hours).then_some(hours)
            })
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_recent_breakout_within_tolerance() {
        let mut history = BreakoutHistory::new();
        let symbol = Symbol::new("AAAUSDT").unwrap();
        history.record(&symbol, 100.0, Side::Long, 1_000);
        assert!(history.has_recent_breakout(&symbol, 100.2, 0.5, Side::Long, 2_000, 10_000));
        assert!(!history.has_recent_breakout(&symbol, 105.0, 0.5, Side::Long, 2_000, 10_000));
        assert!(!history.has_recent_breakout(&symbol, 100.2, 0.5, Side::Short, 2_000, 10_000));
    }

    #[test]
    fn prunes_entries_older_than_retention() {
        let mut history = BreakoutHistory::new();
        let symbol = Symbol::new("AAAUSDT").unwrap();
        history.record(&symbol, 100.0, Side::Long, 0);
        history.record(&symbol, 200.0, Side::Long, RETENTION_MS + 1);
        assert_eq!(history.records.len(), 1);
    }
}
