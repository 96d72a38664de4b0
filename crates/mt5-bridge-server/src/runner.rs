/*
[INPUT]:  StrategyConfig + StrategyPolicy, shared BridgeState, OrderGateway, CancellationToken
[OUTPUT]: One cancellable auto-trading loop placing tagged market orders
[POS]:    Execution layer - strategy run lifecycle (start -> cycle -> stop)
[UPDATE]: When changing cycle steps, cadence or stop semantics
[UPDATE]: 2026-10-16 Cancellable sleeps so shutdown does not wait a full backoff
[UPDATE]: 2026-10-17 Bounded wait for the loop on process shutdown
[UPDATE]: 2026-10-18 Cycle faults carry the error's retry classification
*/

use std::sync::Arc;
use std::time::Duration;

use mt5_bridge_adapter::PositionFilter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::gateway::{OrderGateway, OrderRequest};
use crate::state::BridgeState;
use crate::strategy::{BOT_MAGIC, StrategyConfig, StrategyPolicy, protective_levels};

pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(15);

/// Loop cadence: `cycle_interval` between evaluations, `backoff` after a
/// full position book or a failed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerTiming {
    pub cycle_interval: Duration,
    pub backoff: Duration,
}

impl Default for RunnerTiming {
    fn default() -> Self {
        Self {
            cycle_interval: Duration::from_secs(5),
            backoff: Duration::from_secs(10),
        }
    }
}

/// What one cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Disconnected,
    CapReached { open: usize },
    NoQuote,
    NoSignal,
    Placed { ticket: u64 },
}

impl CycleOutcome {
    pub fn delay(&self, timing: &RunnerTiming) -> Duration {
        match self {
            CycleOutcome::CapReached { .. } => timing.backoff,
            CycleOutcome::Disconnected
            | CycleOutcome::NoQuote
            | CycleOutcome::NoSignal
            | CycleOutcome::Placed { .. } => timing.cycle_interval,
        }
    }
}

/// Owns the auto-trading slot: at most one loop at a time.
#[derive(Debug, Clone)]
pub struct StrategyRunner {
    state: Arc<BridgeState>,
    gateway: OrderGateway,
    timing: RunnerTiming,
    shutdown: CancellationToken,
}

impl StrategyRunner {
    pub fn new(
        state: Arc<BridgeState>,
        gateway: OrderGateway,
        timing: RunnerTiming,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            state,
            gateway,
            timing,
            shutdown,
        }
    }

    /// Start a run with the policy named by `config.strategy`.
    pub async fn start(&self, config: StrategyConfig) -> Result<Uuid> {
        self.launch(config, None).await
    }

    /// Start a run driven by a caller-supplied policy. The config is still
    /// validated, including its strategy name.
    pub async fn start_with_policy(
        &self,
        config: StrategyConfig,
        policy: Box<dyn StrategyPolicy>,
    ) -> Result<Uuid> {
        self.launch(config, Some(policy)).await
    }

    async fn launch(
        &self,
        config: StrategyConfig,
        policy: Option<Box<dyn StrategyPolicy>>,
    ) -> Result<Uuid> {
        let run_id = Uuid::new_v4();
        let token = self.shutdown.child_token();
        let kind = self
            .state
            .activate_strategy(config.clone(), run_id, token.clone())
            .await?;
        let policy = policy.unwrap_or_else(|| kind.policy());

        let run = RunLoop {
            run_id,
            state: self.state.clone(),
            gateway: self.gateway.clone(),
            timing: self.timing,
            config,
            policy,
            shutdown: token,
        };
        let handle = tokio::spawn(run.run());
        self.state.attach_run_handle(run_id, handle).await;
        Ok(run_id)
    }

    /// Request the active run to stop. Returns immediately; idempotent.
    pub async fn stop(&self) {
        if self.state.request_stop().await {
            info!("auto trading stop requested");
        }
    }

    /// Stop the active run and wait for the loop to exit, aborting it after `timeout`.
    pub async fn shutdown_and_wait(&self, timeout: Duration) {
        self.shutdown.cancel();
        self.state.request_stop().await;
        let Some(mut handle) = self.state.take_run_handle().await else {
            return;
        };
        tokio::select! {
            res = &mut handle => {
                if let Err(join_err) = res {
                    warn!(error = %join_err, "strategy loop ended abnormally");
                }
            }
            _ = tokio::time::sleep(timeout) => {
                handle.abort();
                warn!(timeout = ?timeout, "strategy loop did not stop in time; aborted");
            }
        }
    }
}

struct RunLoop {
    run_id: Uuid,
    state: Arc<BridgeState>,
    gateway: OrderGateway,
    timing: RunnerTiming,
    config: StrategyConfig,
    policy: Box<dyn StrategyPolicy>,
    shutdown: CancellationToken,
}

impl RunLoop {
    async fn run(mut self) {
        info!(
            run_id = %self.run_id,
            symbol = %self.config.symbol,
            strategy = %self.config.strategy,
            max_trades = self.config.max_trades,
            "auto trading started"
        );

        while !self.shutdown.is_cancelled() {
            let delay = match self.cycle().await {
                Ok(outcome) => {
                    debug!(run_id = %self.run_id, ?outcome, "strategy cycle");
                    outcome.delay(&self.timing)
                }
                Err(err) => {
                    warn!(
                        run_id = %self.run_id,
                        fault = "transient",
                        retryable = err.is_transient(),
                        code = err.code(),
                        error = %err,
                        "strategy cycle failed"
                    );
                    self.timing.backoff
                }
            };

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.state.mark_stopped(self.run_id).await;
        info!(run_id = %self.run_id, "auto trading stopped");
    }

    async fn cycle(&mut self) -> Result<CycleOutcome> {
        if !self.state.is_connected().await {
            return Ok(CycleOutcome::Disconnected);
        }

        let symbol = &self.config.symbol;
        let open = self
            .state
            .session_positions(PositionFilter::Symbol(symbol.clone()))
            .await?
            .len();
        if open >= self.config.max_trades as usize {
            return Ok(CycleOutcome::CapReached { open });
        }

        let Some(tick) = self.state.session_tick(symbol).await? else {
            return Ok(CycleOutcome::NoQuote);
        };
        let Some(signal) = self.policy.evaluate(&self.config, &tick) else {
            return Ok(CycleOutcome::NoSignal);
        };

        let entry = tick.entry_price(signal.direction);
        let (sl, tp) = protective_levels(&self.config, signal.direction, entry);
        let request = OrderRequest {
            symbol: symbol.clone(),
            direction: signal.direction,
            volume: self.config.lot_size,
            price: Some(entry),
            stop_loss: Some(sl),
            take_profit: Some(tp),
            comment: self.config.order_comment(),
            magic: BOT_MAGIC,
        };
        let placed = self.gateway.place_order(&request).await?;
        info!(
            run_id = %self.run_id,
            direction = %signal.direction,
            volume = %self.config.lot_size,
            symbol = %symbol,
            price = %placed.open_price,
            "auto trade placed"
        );
        Ok(CycleOutcome::Placed { ticket: placed.ticket })
    }
}
