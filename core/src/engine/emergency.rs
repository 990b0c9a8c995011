use super::Engine;
use super::CycleState;
use breakout_analytics::{append_serializable, DiagnosticRecord, RecordKind};
use breakout_execution::ExecutionRequest;
use breakout_markets::{Symbol, TimestampMs};
use tracing::{error, warn};

impl Engine {
    /// Flattens every open position with reduce-only market exits and
    /// parks the engine in `STOPPED`. Entered from the kill switch or
    /// from [`Engine::on_subsystem_error`] once the consecutive-error
    /// budget is exhausted; no new entries are accepted from here on.
    pub(super) async fn run_emergency(&mut self, now_ms: TimestampMs) {
        error!(cycle = self.cycle_count, "entering emergency: flattening all open positions");
        self.diagnostics.increment_reason("emergency_triggered");
        self.diagnostics.record(
            DiagnosticRecord::new(now_ms, "engine", "emergency").with_outcome(true, Some("kill_switch_or_error_budget".to_string())),
        );

        let symbols: Vec<Symbol> = self.positions.open_positions().map(|p| p.symbol.clone()).collect();
        let market_data = self.provider.get_multiple_market_data(&symbols).await;
        let by_symbol: indexmap::IndexMap<Symbol, breakout_data::MarketData> =
            market_data.into_iter().map(|md| (md.symbol.clone(), md)).collect();

        for symbol in &symbols {
            let Some(position) = self.positions.get(symbol).cloned() else { continue };
            let reference_price = by_symbol.get(symbol).map(|md| md.price).unwrap_or(position.avg_entry_price);
            let depth = by_symbol.get(symbol).and_then(|md| md.l2_depth);

            let request = ExecutionRequest {
                symbol: symbol.clone(),
                side: position.side.to_close_order_side(),
                quantity: position.quantity,
                reference_price,
                depth,
                reduce_only: true,
            };

            let (result, exec_err) = match self.execution.execute(request, now_ms).await {
                Ok(order) => (order, None),
                Err((err, order)) => (order, Some(err)),
            };
            if result.filled_qty > 0.0 {
                if let Ok(update) =
                    self.positions.close(symbol, result.filled_qty, result.avg_fill_price, result.fees_paid_usd, now_ms)
                {
                    append_serializable(self.persistence.as_ref(), RecordKind::Position, &update);
                }
            }
            match exec_err {
                Some(err) => warn!(%symbol, error = %err, "emergency flatten order failed"),
                None if result.filled_qty <= 0.0 => warn!(%symbol, "emergency flatten produced zero fill"),
                None => {}
            }
        }

        self.trackers = breakout_execution::PositionTrackerStore::new();
        self.state = CycleState::Stopped;
    }
}
