//! The cycle orchestrator: drives one symbol universe through
//! `Scanning -> LevelBuilding -> SignalWait -> Sizing -> Execution ->
//! Managing` and back to `Scanning`, with an `Emergency` branch that can
//! be entered from any state when the portfolio kill switch trips or the
//! consecutive-error budget is exhausted.

mod emergency;
mod execution;
mod levels;
mod managing;
mod scanning;
mod signals;
mod sizing;

use breakout_data::MarketData;
use indexmap::IndexMap;

pub use sizing::SizedSignal;

use crate::config::EngineConfig;
use crate::error::EngineError;
use breakout_analytics::{DiagnosticsSink, PersistenceSink};
use breakout_data::{ExchangeClient, MarketDataProvider};
use breakout_execution::{ExecutionManager, PositionManager, PositionTrackerStore};
use breakout_markets::{Symbol, TimestampMs};
use breakout_risk::{PortfolioMonitor, RiskManager};
use breakout_strategies::{LevelDetector, Scanner, SignalGenerator};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Where the engine currently is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Initializing,
    Scanning,
    LevelBuilding,
    SignalWait,
    Sizing,
    Execution,
    Managing,
    Emergency,
    Stopped,
}

/// Owns every tracker and position for the engine's lifetime; the only
/// thing shared with the outside world is the exchange client (via the
/// market-data provider and the execution manager) and the diagnostics
/// and persistence sinks.
pub struct Engine {
    config: EngineConfig,
    provider: MarketDataProvider,
    scanner: Scanner,
    level_detector: LevelDetector,
    signal_generator: SignalGenerator,
    risk_manager: RiskManager,
    portfolio_monitor: PortfolioMonitor,
    execution: ExecutionManager<Arc<dyn ExchangeClient>>,
    positions: PositionManager,
    trackers: PositionTrackerStore,
    diagnostics: Arc<dyn DiagnosticsSink>,
    persistence: Arc<dyn PersistenceSink>,
    state: CycleState,
    cycle_count: u64,
    consecutive_errors: u32,
    symbols: Vec<Symbol>,
    equity: f64,
    /// This cycle's scanned market data, keyed by symbol, kept around so
    /// the sizing stage can look up the depth and correlation the
    /// originating scan saw without re-fetching it.
    market_data_cache: IndexMap<Symbol, MarketData>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        client: Arc<dyn ExchangeClient>,
        symbols: Vec<Symbol>,
        diagnostics: Arc<dyn DiagnosticsSink>,
        persistence: Arc<dyn PersistenceSink>,
        now_ms: TimestampMs,
    ) -> Self {
        let provider = MarketDataProvider::new(client.clone(), config.btc_symbol.clone());
        let scanner = Scanner::new(config.scanner.clone());
        let level_detector = LevelDetector::new(config.levels);
        let signal_generator = SignalGenerator::new(config.signals.clone());
        let risk_manager = RiskManager::new(config.sizing);
        let portfolio_monitor = PortfolioMonitor::new(config.portfolio, config.starting_equity, now_ms);
        let execution = ExecutionManager::new(client, config.execution);

        Self {
            equity: config.starting_equity,
            config,
            provider,
            scanner,
            level_detector,
            signal_generator,
            risk_manager,
            portfolio_monitor,
            execution,
            positions: PositionManager::new(),
            trackers: PositionTrackerStore::new(),
            diagnostics,
            persistence,
            state: CycleState::Initializing,
            cycle_count: 0,
            consecutive_errors: 0,
            symbols,
            market_data_cache: IndexMap::new(),
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }

    pub fn open_positions_count(&self) -> usize {
        self.positions.open_positions().count()
    }

    /// Runs cycles until `shutdown` is set. `shutdown` carrying `true`
    /// is checked between cycles, never mid-cycle: a cycle in progress
    /// always runs to completion (including `EMERGENCY`'s flatten) before
    /// the engine stops.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                info!("shutdown requested, stopping before next cycle");
                self.state = CycleState::Stopped;
                return;
            }

            self.tick().await;

            if self.state == CycleState::Stopped {
                return;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.scan_interval) => {}
                _ = shutdown.changed() => {}
            }
        }
    }

    /// Runs exactly one full cycle, advancing `state` through each stage
    /// and returning once the cycle lands back on `Scanning` (or
    /// `Stopped`, if `EMERGENCY` decided the engine is done).
    pub async fn tick(&mut self) {
        self.cycle_count += 1;
        let now_ms = now_ms();

        self.portfolio_monitor.roll_day_if_needed(self.equity, now_ms);
        let open_risk = self.positions.total_open_risk_usd();
        let risk_metrics =
            self.portfolio_monitor
                .evaluate(self.equity, open_risk, self.positions.open_count());

        if risk_metrics.kill_switch_active {
            self.state = CycleState::Emergency;
            self.run_emergency(now_ms).await;
            return;
        }

        self.state = CycleState::Scanning;
        let scan_results = match self.run_scanning(now_ms).await {
            Ok(results) => {
                self.consecutive_errors = 0;
                results
            }
            Err(err) => {
                self.on_subsystem_error(err, now_ms).await;
                return;
            }
        };

        self.state = CycleState::LevelBuilding;
        let leveled = self.run_level_building(scan_results, now_ms);

        self.state = CycleState::SignalWait;
        let mut signals = self.run_signal_generation(&leveled, now_ms);
        signals.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));

        self.state = CycleState::Sizing;
        for signal in signals {
            if self.portfolio_monitor.kill_switch_active() {
                break;
            }
            let Some(market_data) = self.market_data_cache.get(&signal.symbol).cloned() else {
                continue;
            };
            match self.run_sizing(&signal, &market_data, &risk_metrics) {
                Ok(Some(sized)) => {
                    self.state = CycleState::Execution;
                    if let Err(err) = self.run_execution(sized, now_ms).await {
                        self.on_subsystem_error(err, now_ms).await;
                        if self.state == CycleState::Stopped {
                            return;
                        }
                    } else {
                        self.consecutive_errors = 0;
                    }
                    self.state = CycleState::Sizing;
                }
                Ok(None) => {
                    // rejected by risk gating; diagnostics already recorded.
                }
                Err(err) => {
                    self.on_subsystem_error(err, now_ms).await;
                    if self.state == CycleState::Stopped {
                        return;
                    }
                }
            }
        }

        self.state = CycleState::Managing;
        self.run_managing(now_ms).await;

        self.state = CycleState::Scanning;
    }

    async fn on_subsystem_error(&mut self, err: EngineError, now_ms: TimestampMs) {
        self.consecutive_errors += 1;
        warn!(error = %err, consecutive = self.consecutive_errors, "subsystem error");
        self.diagnostics.increment_reason(&format!("engine_error:{err}"));

        if self.consecutive_errors >= self.config.max_consecutive_errors {
            error!(
                consecutive = self.consecutive_errors,
                "consecutive error budget exhausted, forcing emergency flatten"
            );
            self.state = CycleState::Emergency;
            self.run_emergency(now_ms).await;
        }
    }
}

fn now_ms() -> TimestampMs {
    chrono::Utc::now().timestamp_millis()
}
