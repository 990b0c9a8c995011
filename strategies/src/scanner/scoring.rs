use crate::scanner::config::ScoreWeights;
use crate::scanner::metrics::ScanMetrics;
use indexmap::IndexMap;

/// Per-symbol scoring output: named components (already weighted) and
/// their sum, clamped to `[-10, 10]`.
#[derive(Debug, Clone)]
pub struct ScanScore {
    pub components: IndexMap<String, f64>,
    pub total: f64,
}

/// Raw (pre-z-score) value of each scoring input for one symbol.
struct RawInputs {
    vol_surge: f64,
    oi_delta: f64,
    atr_quality: f64,
    correlation_quality: f64,
    trades_log: f64,
}

fn raw_inputs(metrics: &ScanMetrics) -> RawInputs {
    RawInputs {
        // average of the two surge ratios: a single "how hot is volume
        // right now" figure that both cadences contribute to.
        vol_surge: (metrics.vol_surge_1h + metrics.vol_surge_5m) / 2.0,
        oi_delta: metrics.oi_delta_24h,
        atr_quality: metrics.atr_quality,
        // peaks at 1.0 when |correlation| == 0.5, decays to 0 at the
        // extremes.
        correlation_quality: 1.0 - 2.0 * (metrics.btc_correlation.abs() - 0.5).abs(),
        trades_log: (metrics.trades_per_minute.max(0.0) + 1.0).ln(),
    }
}

fn zscore(value: f64, mean: f64, stdev: f64) -> f64 {
    if stdev <= 1e-9 {
        0.0
    } else {
        ((value - mean) / stdev).clamp(-3.0, 3.0)
    }
}

fn mean_stdev(values: &[f64]) -> (f64, f64) {
    let mean = breakout_data::indicators::mean(values);
    (mean, breakout_data::indicators::stdev(values))
}

/// Score every symbol in the batch against each other,: each
/// input is z-scored across the batch, clipped to `[-3, 3]`, weighted, and
/// summed. The batch framing is what "normalized z-scores" needs a
/// population for — see DESIGN.md.
pub fn score_batch(metrics: &[ScanMetrics], weights: &ScoreWeights) -> Vec<ScanScore> {
    let inputs: Vec<RawInputs> = metrics.iter().map(raw_inputs).collect();

    let vol_surge_stats = mean_stdev(&inputs.iter().map(|i| i.vol_surge).collect::<Vec<_>>());
    let oi_delta_stats = mean_stdev(&inputs.iter().map(|i| i.oi_delta).collect::<Vec<_>>());
    let atr_quality_stats = mean_stdev(&inputs.iter().map(|i| i.atr_quality).collect::<Vec<_>>());
    let correlation_stats =
        mean_stdev(&inputs.iter().map(|i| i.correlation_quality).collect::<Vec<_>>());
    let trades_stats = mean_stdev(&inputs.iter().map(|i| i.trades_log).collect::<Vec<_>>());

    inputs
        .iter()
        .map(|input| {
            let mut components = IndexMap::new();
            let mut push = |name: &str, weight: f64, z: f64| {
                components.insert(name.to_string(), weight * z);
            };

            push(
                "vol_surge",
                weights.vol_surge,
                zscore(input.vol_surge, vol_surge_stats.0, vol_surge_stats.1),
            );
            push(
                "oi_delta",
                weights.oi_delta,
                zscore(input.oi_delta, oi_delta_stats.0, oi_delta_stats.1),
            );
            push(
                "atr_quality",
                weights.atr_quality,
                zscore(input.atr_quality, atr_quality_stats.0, atr_quality_stats.1),
            );
            push(
                "correlation",
                weights.correlation,
                zscore(input.correlation_quality, correlation_stats.0, correlation_stats.1),
            );
            push(
                "trades_per_minute",
                weights.trades_per_minute,
                zscore(input.trades_log, trades_stats.0, trades_stats.1),
            );

            let total: f64 = components.values().sum();
            ScanScore {
                components,
                total: total.clamp(-10.0, 10.0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(vol_1h: f64, vol_5m: f64, corr: f64, trades: f64) -> ScanMetrics {
        ScanMetrics {
            vol_surge_1h: vol_1h,
            vol_surge_5m: vol_5m,
            atr_quality: 0.5,
            oi_delta_24h: 0.0,
            bb_width_pct: 1.0,
            btc_correlation: corr,
            trades_per_minute: trades,
            liquidity_score: 0.5,
        }
    }

    #[test]
    fn identical_batch_scores_zero() {
        let batch = vec![metrics(2.0, 2.0, 0.5, 100.0); 5];
        let weights = ScoreWeights::default();
        let scores = score_batch(&batch, &weights);
        for score in scores {
            assert!(score.total.abs() < 1e-9);
        }
    }

    #[test]
    fn higher_surge_scores_higher() {
        let batch = vec![
            metrics(1.0, 1.0, 0.5, 100.0),
            metrics(5.0, 5.0, 0.5, 100.0),
        ];
        let weights = ScoreWeights::default();
        let scores = score_batch(&batch, &weights);
        assert!(scores[1].total > scores[0].total);
    }
}
