//! Performance metrics computed over closed-trade history, backing the
//! "performance metrics" persistence record.
//!
//! # Example
//!
//! ```rust
//! use breakout_analytics::metric::sharpe::SharpeRatio;
//! use breakout_analytics::time::Daily;
//! use rust_decimal_macros::dec;
//!
//! let sharpe = SharpeRatio::calculate(dec!(0.0015), dec!(0.0025), dec!(0.02), Daily);
//! assert_eq!(sharpe.value, dec!(0.05));
//! ```

/// Annualized return divided by maximum drawdown.
pub mod calmar;

/// Peak-to-trough equity loss tracking.
pub mod drawdown;

/// Profit Factor: gross profit / gross loss.
pub mod profit_factor;

/// Risk-adjusted return over a [`crate::time::TimeInterval`].
pub mod sharpe;

/// Sharpe variant penalizing only downside deviation.
pub mod sortino;

/// Fraction of closed trades that were winners.
pub mod win_rate;
