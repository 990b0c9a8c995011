use super::Engine;
use breakout_analytics::{append_serializable, DiagnosticRecord, RecordKind};
use breakout_data::MarketData;
use breakout_execution::{ExecutionRequest, PositionUpdate, TrackerAction};
use breakout_markets::{Symbol, TimestampMs};
use breakout_risk::correlation_bucket;
use indexmap::IndexMap;

impl Engine {
    /// Fetches fresh market data for every open position and turns each
    /// tracker's lifecycle decisions into reduce-only or same-direction
    /// orders. Trackers for positions that close this cycle are dropped
    /// once every action has been applied.
    pub(super) async fn run_managing(&mut self, now_ms: TimestampMs) {
        let symbols: Vec<Symbol> = self.positions.open_positions().map(|p| p.symbol.clone()).collect();
        if symbols.is_empty() {
            self.trackers = breakout_execution::PositionTrackerStore::new();
            return;
        }

        let fetched = self.provider.get_multiple_market_data(&symbols).await;
        let by_symbol: IndexMap<Symbol, MarketData> =
            fetched.into_iter().map(|md| (md.symbol.clone(), md)).collect();

        for symbol in &symbols {
            let Some(market_data) = by_symbol.get(symbol) else {
                continue;
            };
            let Some(position) = self.positions.get(symbol).cloned() else {
                continue;
            };

            let actions = {
                let tracker = self.trackers.ensure(symbol, self.config.position);
                tracker.manage(&position, market_data, now_ms, None)
            };

            for action in actions {
                self.apply_tracker_action(symbol, action, market_data, now_ms).await;
            }
        }

        for symbol in &symbols {
            if !self.positions.is_open(symbol) {
                self.trackers.remove(symbol);
            }
        }
    }

    async fn apply_tracker_action(
        &mut self,
        symbol: &Symbol,
        action: TrackerAction,
        market_data: &MarketData,
        now_ms: TimestampMs,
    ) {
        match action {
            TrackerAction::MoveStop { new_sl, reason } => {
                if let Ok(update) = self.positions.update_stop(symbol, new_sl, now_ms) {
                    self.diagnostics.record(
                        DiagnosticRecord::new(now_ms, "position_manager", "update_stop")
                            .with_symbol(symbol.clone())
                            .with_metric("new_sl", new_sl, None)
                            .with_outcome(true, Some(reason.to_string())),
                    );
                    append_serializable(self.persistence.as_ref(), RecordKind::Position, &update);
                }
            }
            TrackerAction::TakeProfit { qty, reason } => {
                self.reduce(symbol, qty, reason, market_data, now_ms).await;
            }
            TrackerAction::Close { reason } => {
                let Some(position) = self.positions.get(symbol) else { return };
                let qty = position.quantity;
                self.reduce(symbol, qty, reason, market_data, now_ms).await;
            }
            TrackerAction::AddOn { qty, reference_price } => {
                self.add_on(symbol, qty, reference_price, market_data, now_ms).await;
            }
        }
    }

    async fn reduce(
        &mut self,
        symbol: &Symbol,
        qty: f64,
        reason: &'static str,
        market_data: &MarketData,
        now_ms: TimestampMs,
    ) {
        let Some(position) = self.positions.get(symbol).cloned() else { return };
        let request = ExecutionRequest {
            symbol: symbol.clone(),
            side: position.side.to_close_order_side(),
            quantity: qty,
            reference_price: market_data.price,
            depth: market_data.l2_depth,
            reduce_only: true,
        };

        let (order, exec_err) = match self.execution.execute(request, now_ms).await {
            Ok(order) => (order, None),
            Err((err, order)) => (order, Some(err)),
        };
        if let Some(err) = &exec_err {
            self.diagnostics.increment_reason("management_reduce_failed");
            self.diagnostics.record(
                DiagnosticRecord::new(now_ms, "execution", reason)
                    .with_symbol(symbol.clone())
                    .with_outcome(false, Some(err.to_string())),
            );
        }
        if order.filled_qty <= 0.0 {
            return;
        }

        let bucket = correlation_bucket(symbol, market_data.btc_correlation);
        match self.positions.close(symbol, order.filled_qty, order.avg_fill_price, order.fees_paid_usd, now_ms) {
            Ok(update @ PositionUpdate::Closed { realized_pnl_usd, .. }) => {
                self.portfolio_monitor.record_position_close(bucket, order.filled_qty * order.avg_fill_price);
                self.equity += realized_pnl_usd;
                self.diagnostics.record(
                    DiagnosticRecord::new(now_ms, "position_manager", reason)
                        .with_symbol(symbol.clone())
                        .with_metric("filled_qty", order.filled_qty, Some(qty))
                        .with_outcome(true, None),
                );
                append_serializable(self.persistence.as_ref(), RecordKind::Position, &update);
            }
            Ok(update @ PositionUpdate::PartiallyClosed { realized_pnl_usd, .. }) => {
                self.portfolio_monitor.record_position_close(bucket, order.filled_qty * order.avg_fill_price);
                self.equity += realized_pnl_usd;
                self.diagnostics.record(
                    DiagnosticRecord::new(now_ms, "position_manager", reason)
                        .with_symbol(symbol.clone())
                        .with_metric("filled_qty", order.filled_qty, Some(qty))
                        .with_outcome(true, None),
                );
                append_serializable(self.persistence.as_ref(), RecordKind::Position, &update);
            }
            _ => {}
        }
    }

    async fn add_on(
        &mut self,
        symbol: &Symbol,
        qty: f64,
        reference_price: f64,
        market_data: &MarketData,
        now_ms: TimestampMs,
    ) {
        let Some(position) = self.positions.get(symbol).cloned() else { return };
        let request = ExecutionRequest {
            symbol: symbol.clone(),
            side: position.side.to_open_order_side(),
            quantity: qty,
            reference_price,
            depth: market_data.l2_depth,
            reduce_only: false,
        };

        let (order, exec_err) = match self.execution.execute(request, now_ms).await {
            Ok(order) => (order, None),
            Err((err, order)) => (order, Some(err)),
        };
        if let Some(err) = &exec_err {
            self.diagnostics.increment_reason("management_add_on_failed");
            self.diagnostics.record(
                DiagnosticRecord::new(now_ms, "execution", "add_on")
                    .with_symbol(symbol.clone())
                    .with_outcome(false, Some(err.to_string())),
            );
        }
        if order.filled_qty <= 0.0 {
            return;
        }

        if let Ok(update) = self.positions.add_on(symbol, order.filled_qty, order.avg_fill_price, order.fees_paid_usd, now_ms) {
            let bucket = correlation_bucket(symbol, market_data.btc_correlation);
            self.portfolio_monitor.record_position_open(bucket, order.filled_qty * order.avg_fill_price);
            self.diagnostics.record(
                DiagnosticRecord::new(now_ms, "position_manager", "add_on")
                    .with_symbol(symbol.clone())
                    .with_metric("filled_qty", order.filled_qty, Some(qty))
                    .with_outcome(true, None),
            );
            append_serializable(self.persistence.as_ref(), RecordKind::Position, &update);
        }
    }
}
