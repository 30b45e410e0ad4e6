//! Simulation session manager
//!
//! Owns the single live (provider, strategy, engine) tuple and its
//! lifecycle: start tears down any prior session before constructing the
//! new one, stop is idempotent and joins every background task before
//! returning, resume rebuilds the live components from the retained
//! session config, and boot-restore loads the most recent snapshot in a
//! stopped state so the operator must explicitly resume.
//!
//! All ticks for a session flow through one processing loop: the provider
//! pushes onto an mpsc channel, the loop runs strategy and engine strictly
//! sequentially per tick. The API layer only reads snapshots and issues
//! lifecycle commands through this manager.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::providers::{
    PollingProvider, PriceSource, SharedProvider, SimulatedProvider,
};
use crate::services::bars::BarStore;
use crate::services::engine::{ExecutionFailure, SizingPolicy, TradingEngine};
use crate::services::portfolio::Portfolio;
use crate::services::snapshots::{SessionSnapshot, SnapshotStore};
use crate::services::strategies::{self, Strategy};
use crate::types::{
    PortfolioSnapshot, ProviderConfig, RiskAlert, RiskLimits, SessionConfig, SimSymbol,
    StrategyInfo, TradeRecord,
};

/// Buffered ticks between the provider and the processing loop.
const TICK_CHANNEL_CAPACITY: usize = 256;

/// Partial risk thresholds from a start request; absent values fall back
/// to the configured defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RiskOverrides {
    pub stop_loss_pct: Option<f64>,
    pub max_position_pct: Option<f64>,
    pub max_drawdown_pct: Option<f64>,
}

/// A validated-on-arrival start request.
#[derive(Debug, Clone, Deserialize)]
pub struct StartCommand {
    pub strategy_id: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
    pub initial_capital: Option<f64>,
    pub risk_parameters: Option<RiskOverrides>,
    /// "simulated" (default) or "polling".
    pub data_provider: Option<String>,
    pub polling_interval_secs: Option<u64>,
    /// Knobs for the simulated walk.
    pub sim_initial_price: Option<f64>,
    pub sim_volatility: Option<f64>,
    pub sim_interval_ms: Option<u64>,
}

/// Status payload served to the API layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub portfolio_status: Option<PortfolioSnapshot>,
    pub recent_trades: Vec<TradeRecord>,
    pub active_strategy: Option<StrategyInfo>,
    pub is_simulation_running: bool,
    pub risk_alerts: Vec<RiskAlert>,
    pub execution_failures: Vec<ExecutionFailure>,
    pub run_id: Option<String>,
}

/// Live background tasks of a running session.
struct LiveSession {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

/// Retained + live session state.
#[derive(Default)]
struct SessionState {
    engine: Option<Arc<StdMutex<TradingEngine>>>,
    run_id: Option<String>,
    config: Option<SessionConfig>,
    live: Option<LiveSession>,
}

/// Process-wide session manager. Exactly one live portfolio/engine pair
/// exists at a time; all mutation happens through this object.
pub struct SessionManager {
    config: Arc<Config>,
    store: Arc<SnapshotStore>,
    bars: Arc<BarStore>,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(config: Arc<Config>, store: Arc<SnapshotStore>, bars: Arc<BarStore>) -> Self {
        Self {
            config,
            store,
            bars,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Restore the most recent persisted session, stopped. Called once at
    /// process startup; an explicit resume is required to go live again.
    pub async fn load_at_boot(&self) {
        let Some(snapshot) = self.store.load_latest() else {
            info!("No persisted session found at boot");
            return;
        };

        let mut state = self.state.lock().await;
        info!(
            "Restored session {} from snapshot saved at {} (stopped; resume to go live)",
            snapshot.run_id, snapshot.saved_at
        );
        state.engine = Some(Arc::new(StdMutex::new(TradingEngine::from_record(
            snapshot.engine,
        ))));
        state.run_id = Some(snapshot.run_id);
        state.config = Some(snapshot.config);
        state.live = None;
    }

    /// Start a fresh session, discarding any prior one entirely.
    ///
    /// Validation happens before any existing state is touched: a bad
    /// request leaves the previous session exactly as it was.
    pub async fn start(&self, command: StartCommand) -> Result<String, AppError> {
        // Build and validate every component input first.
        let strategy = strategies::build(&command.strategy_id, &command.parameters)?;
        let symbol = strategy.symbol().to_string();

        let initial_capital = command
            .initial_capital
            .unwrap_or(self.config.initial_capital);
        if !(initial_capital > 0.0 && initial_capital.is_finite()) {
            return Err(AppError::BadRequest(format!(
                "initial_capital must be positive, got {}",
                initial_capital
            )));
        }

        let risk_limits = self.resolve_risk_limits(command.risk_parameters.as_ref())?;
        let provider_config = self.resolve_provider_config(&command, &symbol)?;
        // Constructing the provider validates credentials for polling.
        let (provider, price_source) = self.build_provider(&provider_config)?;

        let session_config = SessionConfig {
            strategy_id: command.strategy_id.clone(),
            parameters: command.parameters.clone(),
            initial_capital,
            risk_limits,
            provider: provider_config,
        };

        let mut state = self.state.lock().await;

        // Full teardown of the previous session before any construction.
        self.halt_live(&mut state).await;
        state.engine = None;
        state.run_id = None;
        state.config = None;
        self.bars.clear();

        let portfolio = Portfolio::new(initial_capital)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let engine = Arc::new(StdMutex::new(TradingEngine::new(
            portfolio,
            risk_limits,
            self.sizing_policy(),
            self.config.alert_capacity,
        )));
        engine.lock().unwrap().set_price_source(price_source);

        let run_id = uuid::Uuid::new_v4().to_string();
        let live = self.spawn_live(provider, strategy, engine.clone(), &run_id, &session_config);

        state.engine = Some(engine);
        state.run_id = Some(run_id.clone());
        state.config = Some(session_config);
        state.live = Some(live);

        info!(
            "Started session {} with strategy '{}' on {} ({} capital)",
            run_id, command.strategy_id, symbol, initial_capital
        );
        Ok(format!(
            "Simulation started: strategy '{}' on {} with {:.2} initial capital (run {})",
            command.strategy_id, symbol, initial_capital, run_id
        ))
    }

    /// Stop the running session, keeping portfolio and engine state for
    /// inspection or resume. Idempotent.
    pub async fn stop(&self) -> Result<String, AppError> {
        let mut state = self.state.lock().await;

        if state.live.is_none() {
            return Ok("Simulation is not running".to_string());
        }

        self.halt_live(&mut state).await;
        self.write_snapshot(&state);

        info!(
            "Stopped session {}; portfolio and trade log retained",
            state.run_id.as_deref().unwrap_or("?")
        );
        Ok("Simulation stopped; portfolio and trade log retained".to_string())
    }

    /// Resume the stopped session with a fresh provider and strategy built
    /// from the retained config.
    pub async fn resume(&self) -> Result<String, AppError> {
        let mut state = self.state.lock().await;

        if state.live.is_some() {
            return Err(AppError::Conflict(
                "Simulation is already running".to_string(),
            ));
        }
        let (Some(engine), Some(run_id), Some(config)) = (
            state.engine.clone(),
            state.run_id.clone(),
            state.config.clone(),
        ) else {
            return Err(AppError::BadRequest(
                "No stopped session to resume".to_string(),
            ));
        };

        let strategy = strategies::build(&config.strategy_id, &config.parameters)?;
        let (provider, price_source) = self.build_provider(&config.provider)?;
        engine.lock().unwrap().set_price_source(price_source);

        let live = self.spawn_live(provider, strategy, engine, &run_id, &config);
        state.live = Some(live);

        info!("Resumed session {}", run_id);
        Ok(format!("Simulation resumed (run {})", run_id))
    }

    /// Current status, always served from in-memory state.
    pub async fn status(&self) -> SessionStatus {
        let state = self.state.lock().await;
        let is_running = state.live.is_some();

        let (portfolio_status, recent_trades, risk_alerts, execution_failures) =
            match &state.engine {
                Some(engine) => {
                    let engine = engine.lock().unwrap();
                    (
                        Some(engine.snapshot(is_running)),
                        engine.recent_trades(20),
                        engine.alerts().to_vec(),
                        engine.failures().to_vec(),
                    )
                }
                None => (None, Vec::new(), Vec::new(), Vec::new()),
            };

        let active_strategy = state.config.as_ref().map(|config| StrategyInfo {
            name: strategies::descriptors()
                .iter()
                .find(|d| d.id == config.strategy_id)
                .map(|d| d.name.to_string())
                .unwrap_or_else(|| config.strategy_id.clone()),
            parameters: config.parameters.clone(),
        });

        SessionStatus {
            portfolio_status,
            recent_trades,
            active_strategy,
            is_simulation_running: is_running,
            risk_alerts,
            execution_failures,
            run_id: state.run_id.clone(),
        }
    }

    /// Whether a session is currently live.
    pub async fn is_running(&self) -> bool {
        self.state.lock().await.live.is_some()
    }

    // ==========================================================================
    // Internals
    // ==========================================================================

    fn sizing_policy(&self) -> SizingPolicy {
        match self.config.trade_cash_fraction {
            Some(fraction) => SizingPolicy::CashFraction { fraction },
            None => SizingPolicy::FixedQuantity {
                quantity: self.config.trade_quantity,
            },
        }
    }

    fn resolve_risk_limits(
        &self,
        overrides: Option<&RiskOverrides>,
    ) -> Result<RiskLimits, AppError> {
        let defaults = &self.config.risk_defaults;
        let mut limits = RiskLimits {
            stop_loss_pct: defaults.stop_loss_pct,
            max_position_pct: defaults.max_position_pct,
            max_drawdown_pct: defaults.max_drawdown_pct,
        };
        if let Some(overrides) = overrides {
            if let Some(v) = overrides.stop_loss_pct {
                limits.stop_loss_pct = v;
            }
            if let Some(v) = overrides.max_position_pct {
                limits.max_position_pct = v;
            }
            if let Some(v) = overrides.max_drawdown_pct {
                limits.max_drawdown_pct = v;
            }
        }
        limits.validate().map_err(AppError::BadRequest)?;
        Ok(limits)
    }

    fn resolve_provider_config(
        &self,
        command: &StartCommand,
        symbol: &str,
    ) -> Result<ProviderConfig, AppError> {
        match command.data_provider.as_deref().unwrap_or("simulated") {
            "simulated" => Ok(ProviderConfig::Simulated {
                symbols: vec![SimSymbol {
                    symbol: symbol.to_string(),
                    initial_price: command.sim_initial_price.unwrap_or(100.0),
                    volatility: command.sim_volatility.unwrap_or(0.01),
                    interval_ms: command.sim_interval_ms.unwrap_or(1000).max(10),
                }],
            }),
            "polling" => Ok(ProviderConfig::Polling {
                symbols: vec![symbol.to_string()],
                poll_interval_secs: command
                    .polling_interval_secs
                    .unwrap_or(self.config.poll_interval_secs),
            }),
            other => Err(AppError::BadRequest(format!(
                "Unknown data provider '{}'; expected 'simulated' or 'polling'",
                other
            ))),
        }
    }

    fn build_provider(
        &self,
        config: &ProviderConfig,
    ) -> Result<(SharedProvider, Arc<dyn PriceSource>), AppError> {
        match config {
            ProviderConfig::Simulated { symbols } => {
                let provider = Arc::new(SimulatedProvider::new(symbols.clone()));
                Ok((provider.clone(), provider))
            }
            ProviderConfig::Polling {
                symbols,
                poll_interval_secs,
            } => {
                let api_key = self.config.quote_api_key.clone().ok_or_else(|| {
                    AppError::BadRequest(
                        "QUOTE_API_KEY must be configured for the polling provider".to_string(),
                    )
                })?;
                let provider = Arc::new(PollingProvider::new(
                    self.config.quote_api_url.clone(),
                    api_key,
                    symbols.clone(),
                    *poll_interval_secs,
                ));
                Ok((provider.clone(), provider))
            }
        }
    }

    /// Spawn the provider, tick-processing, and persistence tasks.
    fn spawn_live(
        &self,
        provider: SharedProvider,
        mut strategy: Box<dyn Strategy>,
        engine: Arc<StdMutex<TradingEngine>>,
        run_id: &str,
        session_config: &SessionConfig,
    ) -> LiveSession {
        let (shutdown_tx, _) = watch::channel(false);
        let (tick_tx, mut tick_rx) = mpsc::channel(TICK_CHANNEL_CAPACITY);
        let mut tasks = Vec::new();

        // Provider task: sole producer of ticks.
        {
            let shutdown_rx = shutdown_tx.subscribe();
            let provider = provider.clone();
            tasks.push(tokio::spawn(async move {
                provider.run(tick_tx, shutdown_rx).await;
            }));
        }

        // Tick loop: strictly sequential strategy -> engine processing.
        {
            let mut shutdown_rx = shutdown_tx.subscribe();
            let engine = engine.clone();
            let bars = self.bars.clone();
            tasks.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        result = shutdown_rx.changed() => {
                            if result.is_err() || *shutdown_rx.borrow() {
                                break;
                            }
                        }
                        maybe_tick = tick_rx.recv() => {
                            let Some(tick) = maybe_tick else { break };
                            bars.record_tick(&tick);
                            let signal = strategy.on_tick(&tick);
                            let mut engine = engine.lock().unwrap();
                            engine.observe_tick(&tick);
                            if let Some(event) = signal {
                                engine.process_signal(&event);
                            }
                        }
                    }
                }
                debug!("Tick loop stopped");
            }));
        }

        // Periodic persistence: best-effort relative to the trading logic.
        {
            let mut shutdown_rx = shutdown_tx.subscribe();
            let engine = engine.clone();
            let store = self.store.clone();
            let run_id = run_id.to_string();
            let session_config = session_config.clone();
            let persist_interval = Duration::from_secs(self.config.persist_interval_secs.max(1));
            tasks.push(tokio::spawn(async move {
                let mut ticker = interval(persist_interval);
                // The first interval tick fires immediately; skip it.
                ticker.tick().await;
                loop {
                    tokio::select! {
                        result = shutdown_rx.changed() => {
                            if result.is_err() || *shutdown_rx.borrow() {
                                break;
                            }
                        }
                        _ = ticker.tick() => {
                            let snapshot = SessionSnapshot {
                                run_id: run_id.clone(),
                                engine: engine.lock().unwrap().to_record(),
                                config: session_config.clone(),
                                saved_at: chrono::Utc::now().timestamp_millis(),
                            };
                            if let Err(e) = store.save(&snapshot) {
                                warn!("Periodic snapshot save failed: {}", e);
                            }
                        }
                    }
                }
                debug!("Persistence task stopped");
            }));
        }

        LiveSession {
            shutdown: shutdown_tx,
            tasks,
        }
    }

    /// Signal shutdown and join every live task. After this returns no
    /// background activity from the session remains.
    async fn halt_live(&self, state: &mut SessionState) {
        if let Some(live) = state.live.take() {
            let _ = live.shutdown.send(true);
            for task in live.tasks {
                if let Err(e) = task.await {
                    error!("Session task join error: {}", e);
                }
            }
        }
        if let Some(engine) = &state.engine {
            engine.lock().unwrap().clear_price_source();
        }
    }

    /// Write a snapshot of the retained session, logging failures.
    fn write_snapshot(&self, state: &SessionState) {
        let (Some(engine), Some(run_id), Some(config)) =
            (&state.engine, &state.run_id, &state.config)
        else {
            return;
        };

        let snapshot = SessionSnapshot {
            run_id: run_id.clone(),
            engine: engine.lock().unwrap().to_record(),
            config: config.clone(),
            saved_at: chrono::Utc::now().timestamp_millis(),
        };
        if let Err(e) = self.store.save(&snapshot) {
            error!("Final snapshot save failed: {}", e);
        }
    }
}
