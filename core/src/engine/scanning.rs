use super::Engine;
use crate::error::EngineError;
use breakout_analytics::{append_serializable, DiagnosticRecord, RecordKind};
use breakout_markets::TimestampMs;
use breakout_strategies::ScanResult;
use tracing::debug;

impl Engine {
    /// Fetches market data for every tracked symbol and runs it through
    /// the scanner. Per-symbol data failures are absorbed by the provider
    /// (it simply omits the symbol); an empty universe is not an error.
    pub(super) async fn run_scanning(&mut self, now_ms: TimestampMs) -> Result<Vec<ScanResult>, EngineError> {
        let market_data = self.provider.get_multiple_market_data(&self.symbols).await;
        debug!(
            requested = self.symbols.len(),
            available = market_data.len(),
            "scan fetch complete"
        );

        self.market_data_cache = market_data.iter().map(|md| (md.symbol.clone(), md.clone())).collect();

        let results = self.scanner.scan(&market_data, now_ms);
        for result in &results {
            self.diagnostics.record(
                DiagnosticRecord::new(now_ms, "scanner", "scan")
                    .with_symbol(result.symbol.clone())
                    .with_correlation_id(result.correlation_id.clone())
                    .with_metric("score", result.score, None)
                    .with_outcome(true, None),
            );
            append_serializable(self.persistence.as_ref(), RecordKind::ScanResult, result);
        }
        Ok(results)
    }
}
