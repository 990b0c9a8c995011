use super::Engine;
use crate::error::EngineError;
use breakout_analytics::{append_serializable, DiagnosticRecord, RecordKind};
use breakout_data::MarketData;
use breakout_markets::L2Depth;
use breakout_risk::{correlation_bucket, RiskMetrics};
use breakout_strategies::Signal;

/// A signal that cleared every risk gate, carrying the quantity it was
/// approved for and the correlation bucket it will draw exposure from.
#[derive(Debug, Clone)]
pub struct SizedSignal {
    pub signal: Signal,
    pub quantity: f64,
    pub notional_usd: f64,
    pub risk_usd: f64,
    pub bucket: String,
    pub depth: Option<L2Depth>,
}

impl Engine {
    /// Sizes and risk-gates one signal against its originating symbol's
    /// latest market data. Returns `Ok(None)` for a clean rejection
    /// (invalid size, correlation limit, depth starved to zero) and
    /// `Err` only for a subsystem failure the caller should count
    /// against the error budget.
    pub(super) fn run_sizing(
        &mut self,
        signal: &Signal,
        market_data: &MarketData,
        risk_metrics: &RiskMetrics,
    ) -> Result<Option<SizedSignal>, EngineError> {
        if risk_metrics.daily_limit_breached || risk_metrics.position_count_breached {
            let reason = if risk_metrics.daily_limit_breached {
                "daily_limit_breached"
            } else {
                "position_count_breached"
            };
            self.diagnostics.increment_reason(reason);
            self.diagnostics.record(
                DiagnosticRecord::new(signal.timestamp, "risk", "portfolio_limit")
                    .with_symbol(signal.symbol.clone())
                    .with_outcome(false, Some(reason.to_string())),
            );
            return Ok(None);
        }

        let size = match self.risk_manager.size_position(
            self.equity,
            signal.entry,
            signal.sl,
            signal.side,
            market_data.l2_depth.as_ref(),
        ) {
            Ok(size) => size,
            Err(err) => {
                self.diagnostics.increment_reason("sizing_rejected");
                self.diagnostics.record(
                    DiagnosticRecord::new(signal.timestamp, "risk", "sizing")
                        .with_symbol(signal.symbol.clone())
                        .with_outcome(false, Some(err.to_string())),
                );
                return Ok(None);
            }
        };

        if self.portfolio_monitor.absolute_correlation_breached(market_data.btc_correlation) {
            self.diagnostics.increment_reason("absolute_correlation_breached");
            self.diagnostics.record(
                DiagnosticRecord::new(signal.timestamp, "risk", "correlation")
                    .with_symbol(signal.symbol.clone())
                    .with_outcome(false, Some("absolute_correlation_breached".to_string())),
            );
            return Ok(None);
        }

        let bucket = correlation_bucket(&signal.symbol, market_data.btc_correlation);
        if self.portfolio_monitor.correlation_limit_breached(&bucket, size.notional_usd, self.equity) {
            self.diagnostics.increment_reason("correlation_limit_breached");
            self.diagnostics.record(
                DiagnosticRecord::new(signal.timestamp, "risk", "correlation")
                    .with_symbol(signal.symbol.clone())
                    .with_outcome(false, Some("correlation_limit_breached".to_string())),
            );
            return Ok(None);
        }

        let reduce = self.portfolio_monitor.should_reduce_risk(self.equity);
        let (quantity, notional_usd, risk_usd) = if reduce {
            (size.quantity * 0.5, size.notional_usd * 0.5, size.risk_usd * 0.5)
        } else {
            (size.quantity, size.notional_usd, size.risk_usd)
        };

        append_serializable(self.persistence.as_ref(), RecordKind::Signal, signal);

        Ok(Some(SizedSignal {
            signal: signal.clone(),
            quantity,
            notional_usd,
            risk_usd,
            bucket,
            depth: market_data.l2_depth,
        }))
    }
}
