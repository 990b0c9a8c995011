pub mod config;
pub mod filters;
pub mod metrics;
pub mod scoring;

use crate::levels::TradingLevel;
use breakout_data::MarketData;
use breakout_markets::{Symbol, TimestampMs};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub use config::{LiquidityFilters, ScannerConfig, ScoreWeights, VolatilityFilters};
pub use filters::{FilterDetail, FilterOutcome};
pub use metrics::ScanMetrics;
pub use scoring::ScanScore;

/// One symbol's place in a completed scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub symbol: Symbol,
    /// Final combined score, clamped to `[-10, 10]`.
    pub score: f64,
    /// 1-based rank within the retained candidate set, best first.
    pub rank: usize,
    pub market_data: MarketData,
    pub filter_results: indexmap::IndexMap<String, bool>,
    pub filter_details: indexmap::IndexMap<String, FilterDetail>,
    pub score_components: indexmap::IndexMap<String, f64>,
    /// Populated by the level detector in a later pipeline stage; always
    /// empty coming out of the scanner itself.
    pub levels: Vec<TradingLevel>,
    pub timestamp: TimestampMs,
    /// `"<symbol>:<epoch_ms>"`, threaded through downstream stages for
    /// tracing correlation.
    pub correlation_id: String,
}

/// Stateless filter-then-score pipeline over a batch of [`MarketData`]
///. Holds only configuration; `scan` is pure given its inputs.
#[derive(Debug, Clone)]
pub struct Scanner {
    config: ScannerConfig,
}

impl Scanner {
    pub fn new(config: ScannerConfig) -> Self {
        if !config.weights.is_within_expected_range() {
            tracing::warn!(
                sum = config.weights.sum(),
                "scanner score weights sum outside the expected [0.8, 1.2] range"
            );
        }
        Self { config }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Run the full scan: whitelist/blacklist, optional top-N-by-volume
    /// pre-filter, per-symbol filter + score evaluation, ranking, and
    /// truncation to `max_candidates`.
    pub fn scan(&self, market_data: &[MarketData], now_ms: TimestampMs) -> Vec<ScanResult> {
        let candidates = self.pre_filter(market_data);
        if candidates.is_empty() {
            return Vec::new();
        }

        let metrics: Vec<ScanMetrics> = candidates.iter().map(|md| ScanMetrics::compute(md)).collect();
        let scores = scoring::score_batch(&metrics, &self.config.weights);

        let mut results: Vec<ScanResult> = candidates
            .iter()
            .zip(metrics.iter())
            .zip(scores.iter())
            .map(|((md, metric), score)| {
                let outcome = filters::evaluate(md, metric, &self.config);
                ScanResult {
                    symbol: md.symbol.clone(),
                    score: score.total,
                    rank: 0,
                    market_data: (*md).clone(),
                    filter_results: outcome.results,
                    filter_details: outcome.details,
                    score_components: score.components.clone(),
                    levels: Vec::new(),
                    timestamp: now_ms,
                    correlation_id: format!("{}:{now_ms}", md.symbol.as_str()),
                }
            })
            .filter(|result| result.filter_results.values().all(|&p| p))
            .collect();

        // Descending score; equal scores keep their original relative order
        // (stable sort on the pre-ranking index).
        let mut indexed: Vec<(usize, ScanResult)> = results.drain(..).enumerate().collect();
        indexed.sort_by(|(ia, a), (ib, b)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(ia.cmp(ib))
        });

        let mut ranked: Vec<ScanResult> = indexed.into_iter().map(|(_, r)| r).collect();
        ranked.truncate(self.config.max_candidates);
        for (i, result) in ranked.iter_mut().enumerate() {
            result.rank = i + 1;
        }
        ranked
    }

    /// Apply whitelist/blacklist membership and the optional top-N-by-24h-
    /// volume cap, before any per-symbol computation runs.
    fn pre_filter<'a>(&self, market_data: &'a [MarketData]) -> Vec<&'a MarketData> {
        let blacklist: HashSet<&Symbol> = self
            .config
            .blacklist
            .as_ref()
            .map(|list| list.iter().collect())
            .unwrap_or_default();

        let mut candidates: Vec<&MarketData> = market_data
            .iter()
            .filter(|md| {
                if blacklist.contains(&md.symbol) {
                    return false;
                }
                match &self.config.whitelist {
                    Some(whitelist) => whitelist.contains(&md.symbol),
                    None => true,
                }
            })
            .collect();

        if let Some(top_n) = self.config.top_n_by_volume {
            candidates.sort_by(|a, b| {
                b.volume_24h_usd
                    .partial_cmp(&a.volume_24h_usd)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            candidates.truncate(top_n);
        }

        candidates
    }
}
