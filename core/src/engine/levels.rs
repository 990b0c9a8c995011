use super::Engine;
use breakout_markets::TimestampMs;
use breakout_strategies::ScanResult;

impl Engine {
    /// Attaches the strongest recent levels to each scanned symbol, ready
    /// for the signal generator.
    pub(super) fn run_level_building(&self, mut results: Vec<ScanResult>, now_ms: TimestampMs) -> Vec<ScanResult> {
        for result in &mut results {
            let levels = self.level_detector.detect(&result.market_data);
            let levels = self.level_detector.recent(levels, now_ms);
            let mut levels = self.level_detector.strongest(levels);
            levels.truncate(self.config.levels_per_symbol);
            result.levels = levels;
        }
        results
    }
}
