/*
[INPUT]:  Boxed BrokerClient, per-call deadline
[OUTPUT]: Single exclusion boundary over session, strategy slot and terminal calls
[POS]:    State layer - the only owner of mutable bridge state
[UPDATE]: When adding shared state or new guarded terminal calls
[UPDATE]: 2026-10-14 Bound every terminal call with a deadline
*/

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mt5_bridge_adapter::{
    AccountInfo, BrokerClient, LastError, Position, PositionFilter, Tick, TradeInstruction,
    TradeResult,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use crate::error::{BridgeError, Result};
use crate::strategy::{StrategyConfig, StrategyKind};

/// Account snapshot cached by the session.
pub type AccountSnapshot = AccountInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyRunState {
    Idle,
    Running,
    /// Stop requested; the loop has not observed it yet
    Stopping,
}

#[derive(Debug, Clone, Default)]
enum Session {
    #[default]
    Disconnected,
    Connected {
        account: AccountSnapshot,
        since: DateTime<Utc>,
    },
}

#[derive(Debug)]
struct ActiveRun {
    id: Uuid,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct StrategySlot {
    state: StrategyRunState,
    config: Option<StrategyConfig>,
    run: Option<ActiveRun>,
}

struct Inner {
    broker: Box<dyn BrokerClient>,
    session: Session,
    strategy: StrategySlot,
    terminal_ready: Option<bool>,
}

impl Inner {
    fn require_session(&self) -> Result<()> {
        match self.session {
            Session::Connected { .. } => Ok(()),
            Session::Disconnected => Err(BridgeError::NotConnected),
        }
    }
}

/// Point-in-time copy of the shared state, taken under one lock.
#[derive(Debug, Clone)]
pub struct StateView {
    pub connected: bool,
    pub account: Option<AccountSnapshot>,
    pub connected_since: Option<DateTime<Utc>>,
    pub strategy_state: StrategyRunState,
    pub strategy_config: Option<StrategyConfig>,
    pub terminal_ready: Option<bool>,
}

/// Shared bridge state.
///
/// Session, strategy slot and the broker terminal sit behind one mutex. A
/// terminal call holds the lock for that single call only, bounded by
/// `call_timeout`.
pub struct BridgeState {
    inner: Mutex<Inner>,
    call_timeout: Duration,
}

impl std::fmt::Debug for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeState")
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl BridgeState {
    pub fn new(broker: Box<dyn BrokerClient>, call_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                broker,
                session: Session::Disconnected,
                strategy: StrategySlot {
                    state: StrategyRunState::Idle,
                    config: None,
                    run: None,
                },
                terminal_ready: None,
            }),
            call_timeout,
        }
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = mt5_bridge_adapter::Result<T>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result.map_err(BridgeError::from),
            Err(_) => {
                warn!(operation, timeout = ?self.call_timeout, "broker call timed out");
                Err(BridgeError::BrokerTimeout {
                    operation,
                    after: self.call_timeout,
                })
            }
        }
    }

    // Session

    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.require_session().is_ok()
    }

    pub async fn ensure_connected(&self) -> Result<()> {
        self.inner.lock().await.require_session()
    }

    pub(crate) async fn set_connected(&self, account: AccountSnapshot) {
        let mut inner = self.inner.lock().await;
        inner.session = Session::Connected {
            account,
            since: Utc::now(),
        };
    }

    /// Replace the cached account; no-op when the session went away meanwhile.
    pub(crate) async fn refresh_account(&self, account: AccountSnapshot) {
        let mut inner = self.inner.lock().await;
        if let Session::Connected { account: cached, .. } = &mut inner.session {
            *cached = account;
        }
    }

    pub(crate) async fn reset_session(&self) -> bool {
        let mut inner = self.inner.lock().await;
        let was_connected = inner.require_session().is_ok();
        inner.session = Session::Disconnected;
        was_connected
    }

    pub(crate) async fn set_terminal_ready(&self, ready: bool) {
        self.inner.lock().await.terminal_ready = Some(ready);
    }

    // Terminal calls that do not need a session

    pub(crate) async fn terminal_initialize(&self) -> Result<bool> {
        let inner = self.inner.lock().await;
        self.bounded("initialize", inner.broker.initialize()).await
    }

    pub(crate) async fn terminal_login(&self, account: u64, password: &str, server: &str) -> Result<bool> {
        let inner = self.inner.lock().await;
        self.bounded("login", inner.broker.login(account, password, server))
            .await
    }

    pub(crate) async fn terminal_last_error(&self) -> Result<LastError> {
        let inner = self.inner.lock().await;
        self.bounded("last_error", inner.broker.last_error()).await
    }

    pub(crate) async fn terminal_account_info(&self) -> Result<Option<AccountInfo>> {
        let inner = self.inner.lock().await;
        self.bounded("account_info", inner.broker.account_info()).await
    }

    pub(crate) async fn terminal_shutdown(&self) -> Result<()> {
        let inner = self.inner.lock().await;
        self.bounded("shutdown", inner.broker.shutdown()).await
    }

    // Terminal calls that fail fast with NotConnected

    pub(crate) async fn session_account_info(&self) -> Result<Option<AccountInfo>> {
        let inner = self.inner.lock().await;
        inner.require_session()?;
        self.bounded("account_info", inner.broker.account_info()).await
    }

    pub(crate) async fn session_tick(&self, symbol: &str) -> Result<Option<Tick>> {
        let inner = self.inner.lock().await;
        inner.require_session()?;
        self.bounded("tick", inner.broker.tick(symbol)).await
    }

    pub(crate) async fn session_positions(&self, filter: PositionFilter) -> Result<Vec<Position>> {
        let inner = self.inner.lock().await;
        inner.require_session()?;
        self.bounded("positions", inner.broker.positions(filter)).await
    }

    pub(crate) async fn session_send_order(&self, instruction: &TradeInstruction) -> Result<TradeResult> {
        let inner = self.inner.lock().await;
        inner.require_session()?;
        self.bounded("send_order", inner.broker.send_order(instruction))
            .await
    }

    // Strategy slot

    /// Claim the slot for a new run. Checked in order: session present,
    /// slot idle, config valid.
    pub(crate) async fn activate_strategy(
        &self,
        config: StrategyConfig,
        run_id: Uuid,
        shutdown: CancellationToken,
    ) -> Result<StrategyKind> {
        let mut inner = self.inner.lock().await;
        inner.require_session()?;
        if inner.strategy.state != StrategyRunState::Idle {
            return Err(BridgeError::AlreadyRunning);
        }
        let kind = config.validate()?;

        inner.strategy = StrategySlot {
            state: StrategyRunState::Running,
            config: Some(config),
            run: Some(ActiveRun {
                id: run_id,
                shutdown,
                handle: None,
            }),
        };
        Ok(kind)
    }

    pub(crate) async fn attach_run_handle(&self, run_id: Uuid, handle: JoinHandle<()>) {
        let mut inner = self.inner.lock().await;
        match inner.strategy.run.as_mut() {
            Some(run) if run.id == run_id => run.handle = Some(handle),
            // The run already finished; its handle has nothing left to await.
            _ => {}
        }
    }

    /// Cancel the active run, if any. Returns whether a run was signalled.
    pub(crate) async fn request_stop(&self) -> bool {
        let mut inner = self.inner.lock().await;
        let Some(run) = inner.strategy.run.as_ref() else {
            return false;
        };
        run.shutdown.cancel();
        if inner.strategy.state == StrategyRunState::Running {
            inner.strategy.state = StrategyRunState::Stopping;
        }
        true
    }

    /// Called by the loop on exit; releases the slot for `run_id` only.
    pub(crate) async fn mark_stopped(&self, run_id: Uuid) {
        let mut inner = self.inner.lock().await;
        let owns_slot = inner
            .strategy
            .run
            .as_ref()
            .is_some_and(|run| run.id == run_id);
        if owns_slot {
            inner.strategy.run = None;
            inner.strategy.state = StrategyRunState::Idle;
        }
    }

    pub(crate) async fn take_run_handle(&self) -> Option<JoinHandle<()>> {
        let mut inner = self.inner.lock().await;
        inner.strategy.run.as_mut().and_then(|run| run.handle.take())
    }

    pub async fn view(&self) -> StateView {
        let inner = self.inner.lock().await;
        let (account, connected_since) = match &inner.session {
            Session::Connected { account, since } => (Some(account.clone()), Some(*since)),
            Session::Disconnected => (None, None),
        };
        StateView {
            connected: account.is_some(),
            account,
            connected_since,
            strategy_state: inner.strategy.state,
            strategy_config: inner.strategy.config.clone(),
            terminal_ready: inner.terminal_ready,
        }
    }
}
