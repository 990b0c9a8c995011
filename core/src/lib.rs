//! Cycle orchestrator for the breakout range-trading engine: wires the
//! market-data provider, scanner, level detector, signal generator, risk
//! manager, and execution/position managers into the single state machine
//! described in the engine module, and owns every position and tracker
//! for its lifetime.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations)]

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod shutdown;

pub use config::EngineConfig;
pub use engine::{CycleState, Engine, SizedSignal};
pub use error::EngineError;
pub use shutdown::Shutdown;
