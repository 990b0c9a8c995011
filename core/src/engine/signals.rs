use super::Engine;
use breakout_markets::TimestampMs;
use breakout_strategies::{ScanMetrics, ScanResult, Signal};
use itertools::Itertools;

impl Engine {
    /// Generates at most one signal per symbol: every leveled symbol
    /// without an open position is evaluated against both strategies,
    /// and [`select_best_signal`] resolves a same-symbol momentum/retest
    /// tie.
    pub(super) fn run_signal_generation(&self, results: &[ScanResult], now_ms: TimestampMs) -> Vec<Signal> {
        let mut raw = Vec::new();
        for result in results {
            if self.positions.is_open(&result.symbol) {
                continue;
            }
            let metrics = ScanMetrics::compute(&result.market_data);

            let signals = self.signal_generator.generate(
                &result.market_data,
                &metrics,
                &result.levels,
                now_ms,
                Some(result.correlation_id.clone()),
            );
            raw.extend(signals);
        }

        raw.into_iter()
            .into_group_map_by(|signal| signal.symbol.clone())
            .into_values()
            .filter_map(|group| select_best_signal(group, self.config.strategy_priority))
            .collect()
    }
}

/// Picks the highest-confidence signal in a same-symbol group; a tie goes
/// to whichever matches `priority`, and otherwise to the first generated.
fn select_best_signal(signals: Vec<Signal>, priority: breakout_markets::SignalStrategy) -> Option<Signal> {
    signals.into_iter().fold(None, |best: Option<Signal>, candidate| match best {
        None => Some(candidate),
        Some(current) => {
            if candidate.confidence > current.confidence {
                Some(candidate)
            } else if (candidate.confidence - current.confidence).abs() < f64::EPSILON
                && candidate.strategy == priority
                && current.strategy != priority
            {
                Some(candidate)
            } else {
                Some(current)
            }
        }
    })
}
