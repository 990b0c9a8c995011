use thiserror::Error;

/// Failures from position sizing or portfolio monitoring.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    #[error("entry {entry} and stop {sl} must differ to size a position")]
    ZeroStopDistance { entry: f64, sl: f64 },

    #[error("equity must be positive, got {equity}")]
    NonPositiveEquity { equity: f64 },

    #[error("sized quantity rounded down to zero (risk_usd={risk_usd}, distance={distance})")]
    QuantityRoundedToZero { risk_usd: f64, distance: f64 },

    #[error("sized notional {notional_usd} fell below the minimum {min_notional}")]
    BelowMinNotional { notional_usd: f64, min_notional: f64 },

    #[error("realized risk_pct {risk_pct} exceeds {risk_per_trade_pct} by more than 10%")]
    RiskPctOutOfBounds { risk_pct: f64, risk_per_trade_pct: f64 },
}
