use super::sizing::SizedSignal;
use super::Engine;
use crate::error::EngineError;
use breakout_analytics::{append_serializable, DiagnosticRecord, RecordKind};
use breakout_execution::{ExecutionRequest, Position};
use breakout_markets::TimestampMs;

impl Engine {
    /// Submits the approved signal's opening order and, once filled,
    /// opens the position, the tracker, and the portfolio's correlation
    /// exposure for it.
    pub(super) async fn run_execution(&mut self, sized: SizedSignal, now_ms: TimestampMs) -> Result<(), EngineError> {
        let request = ExecutionRequest {
            symbol: sized.signal.symbol.clone(),
            side: sized.signal.side.to_open_order_side(),
            quantity: sized.quantity,
            reference_price: sized.signal.entry,
            depth: sized.depth,
            reduce_only: false,
        };

        let (order, exec_err) = match self.execution.execute(request, now_ms).await {
            Ok(order) => (order, None),
            Err((err, order)) => (order, Some(err)),
        };
        if order.filled_qty <= 0.0 {
            self.diagnostics.increment_reason("execution_zero_fill");
            return match exec_err {
                Some(err) => Err(err.into()),
                None => Ok(()),
            };
        }

        let position = Position::open(
            sized.signal.symbol.clone(),
            sized.signal.side,
            order.filled_qty,
            order.avg_fill_price,
            sized.signal.sl,
            sized.signal.tp1,
            sized.signal.tp2,
            now_ms,
        );
        self.positions.open(position.clone());
        self.trackers.ensure(&sized.signal.symbol, self.config.position);
        self.portfolio_monitor.record_position_open(sized.bucket, sized.notional_usd);

        self.diagnostics.record(
            DiagnosticRecord::new(now_ms, "execution", "open")
                .with_symbol(sized.signal.symbol.clone())
                .with_metric("filled_qty", order.filled_qty, Some(sized.quantity))
                .with_outcome(true, None),
        );
        append_serializable(self.persistence.as_ref(), RecordKind::Position, &position);

        match exec_err {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}
