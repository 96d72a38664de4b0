/*
[INPUT]:  Account credentials, shared BridgeState
[OUTPUT]: Terminal session lifecycle (connect, disconnect) and account queries
[POS]:    Session layer - owns the single logical terminal login
[UPDATE]: When changing login flow or session invariants
[UPDATE]: 2026-10-15 Re-authentication keeps the old session on failure
[UPDATE]: 2026-10-18 Unreachable terminal during connect is a connection failure
*/

use std::sync::Arc;

use mt5_bridge_adapter::{Position, PositionFilter};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{BridgeError, Result};
use crate::state::{AccountSnapshot, BridgeState};

/// Credentials for a terminal login.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub account: u64,
    pub password: String,
    pub server: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("password", &"<redacted>")
            .field("server", &self.server)
            .finish()
    }
}

/// Manages the one terminal session the bridge holds.
#[derive(Debug, Clone)]
pub struct SessionManager {
    state: Arc<BridgeState>,
    // Serializes whole connect/disconnect sequences, not single calls.
    login_lock: Arc<Mutex<()>>,
}

impl SessionManager {
    pub fn new(state: Arc<BridgeState>) -> Self {
        Self {
            state,
            login_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Attach to the terminal without logging in. Records the outcome for status.
    pub async fn probe_terminal(&self) -> bool {
        let ready = match self.state.terminal_initialize().await {
            Ok(ready) => ready,
            Err(err) => {
                warn!(error = %err, "terminal probe failed");
                false
            }
        };
        self.state.set_terminal_ready(ready).await;
        if ready {
            info!("terminal initialized");
        } else {
            warn!("terminal not available; connect will retry initialization");
        }
        ready
    }

    /// Initialize the terminal, log in and cache the account snapshot.
    ///
    /// Connecting while already connected re-authenticates. On any failure
    /// the previous session, if there was one, is left untouched.
    pub async fn connect(&self, credentials: &Credentials) -> Result<AccountSnapshot> {
        let _guard = self.login_lock.lock().await;
        info!(account = credentials.account, server = %credentials.server, "connecting to terminal");

        let initialized = match self.state.terminal_initialize().await {
            Ok(initialized) => initialized,
            Err(err) => {
                self.state.set_terminal_ready(false).await;
                return Err(unreachable_terminal("initialize", err));
            }
        };
        self.state.set_terminal_ready(initialized).await;
        if !initialized {
            let detail = self.describe_last_error("initialize").await;
            warn!(%detail, "terminal initialization failed");
            return Err(BridgeError::ConnectionFailed {
                reason: "failed to initialize terminal".to_string(),
            });
        }

        let authorized = self
            .state
            .terminal_login(credentials.account, &credentials.password, &credentials.server)
            .await
            .map_err(|err| unreachable_terminal("login", err))?;
        if !authorized {
            let reason = format!("login failed: {}", self.describe_last_error("login").await);
            warn!(account = credentials.account, %reason, "terminal login refused");
            return Err(BridgeError::ConnectionFailed { reason });
        }

        let account = self
            .state
            .terminal_account_info()
            .await
            .map_err(|err| unreachable_terminal("account_info", err))?
            .ok_or_else(|| BridgeError::ConnectionFailed {
                reason: "failed to get account info".to_string(),
            })?;

        self.state.set_connected(account.clone()).await;
        info!(
            account = account.login,
            balance = %account.balance,
            currency = %account.currency,
            "terminal session established"
        );
        Ok(account)
    }

    /// Tear down the session. Idempotent; terminal shutdown errors are logged only.
    pub async fn disconnect(&self) {
        let _guard = self.login_lock.lock().await;
        let was_connected = self.state.reset_session().await;
        if let Err(err) = self.state.terminal_shutdown().await {
            warn!(error = %err, "terminal shutdown failed");
        }
        if was_connected {
            info!("terminal session closed");
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.state.is_connected().await
    }

    pub async fn ensure_connected(&self) -> Result<()> {
        self.state.ensure_connected().await
    }

    /// Fresh account figures from the terminal; refreshes the cached snapshot.
    pub async fn account_info(&self) -> Result<AccountSnapshot> {
        let account = self
            .state
            .session_account_info()
            .await?
            .ok_or(BridgeError::AccountUnavailable)?;
        self.state.refresh_account(account.clone()).await;
        Ok(account)
    }

    pub async fn positions(&self) -> Result<Vec<Position>> {
        self.state.session_positions(PositionFilter::All).await
    }

    async fn describe_last_error(&self, step: &str) -> String {
        match self.state.terminal_last_error().await {
            Ok(last) => last.to_string(),
            Err(err) => format!("last_error unavailable after {step}: {err}"),
        }
    }
}

/// Transport failures during connect surface as a failed connection.
fn unreachable_terminal(step: &'static str, err: BridgeError) -> BridgeError {
    warn!(step, code = err.code(), error = %err, "terminal unreachable during connect");
    BridgeError::ConnectionFailed {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mt5_bridge_adapter::{ClientConfig, PaperBroker, PaperCall, PaperConfig, TerminalClient};
    use std::time::Duration;

    fn setup() -> (Arc<PaperBroker>, SessionManager) {
        let paper = Arc::new(PaperBroker::new());
        let state = Arc::new(BridgeState::new(Box::new(paper.clone()), Duration::from_secs(10)));
        (paper, SessionManager::new(state))
    }

    fn credentials() -> Credentials {
        Credentials {
            account: 5001,
            password: "secret".to_string(),
            server: "Paper-Demo".to_string(),
        }
    }

    #[tokio::test]
    async fn test_connect_caches_account() {
        let (_paper, session) = setup();
        let account = session.connect(&credentials()).await.unwrap();
        assert_eq!(account.login, 5001);
        assert!(session.is_connected().await);
    }

    #[tokio::test]
    async fn test_connect_reports_terminal_reason() {
        let (paper, session) = setup();
        paper.set_accept_login(false);

        let err = session.connect(&credentials()).await.unwrap_err();
        match err {
            BridgeError::ConnectionFailed { reason } => {
                assert!(reason.starts_with("login failed: "));
                assert!(reason.contains("Authorization failed"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!session.is_connected().await);
    }

    #[tokio::test]
    async fn test_unreachable_terminal_clears_health_flag() {
        let (paper, session) = setup();
        paper.set_terminal_available(false);

        let err = session.connect(&credentials()).await.unwrap_err();
        assert_eq!(err.to_string(), "connection failed: failed to initialize terminal");
        assert_eq!(paper.call_count(PaperCall::Login), 0);
        assert!(!session.probe_terminal().await);
    }

    #[tokio::test]
    async fn test_gateway_down_is_connection_failure() {
        let client = TerminalClient::with_config(ClientConfig::default(), "http://127.0.0.1:9").unwrap();
        let state = Arc::new(BridgeState::new(Box::new(client), Duration::from_secs(10)));
        let session = SessionManager::new(state);

        let err = session.connect(&credentials()).await.unwrap_err();
        assert_eq!(err.code(), "connection_failed");
        assert!(matches!(err, BridgeError::ConnectionFailed { .. }));
        assert_eq!(session.state.view().await.terminal_ready, Some(false));
        assert!(!session.is_connected().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_terminal_is_connection_failure() {
        let paper = Arc::new(PaperBroker::with_config(PaperConfig {
            latency: Duration::from_secs(60),
            ..PaperConfig::default()
        }));
        let state = Arc::new(BridgeState::new(Box::new(paper.clone()), Duration::from_secs(10)));
        let session = SessionManager::new(state);

        let err = session.connect(&credentials()).await.unwrap_err();
        match &err {
            BridgeError::ConnectionFailed { reason } => assert!(reason.contains("timed out")),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(session.state.view().await.terminal_ready, Some(false));
        assert_eq!(paper.call_count(PaperCall::Login), 0);
    }

    #[tokio::test]
    async fn test_failed_reconnect_keeps_existing_session() {
        let (paper, session) = setup();
        session.connect(&credentials()).await.unwrap();

        paper.set_accept_login(false);
        assert!(session.connect(&credentials()).await.is_err());
        assert!(session.is_connected().await);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (paper, session) = setup();
        session.disconnect().await;
        session.connect(&credentials()).await.unwrap();
        session.disconnect().await;
        session.disconnect().await;
        assert!(!session.is_connected().await);
        assert_eq!(paper.call_count(PaperCall::Shutdown), 3);
    }

    #[tokio::test]
    async fn test_queries_require_session() {
        let (paper, session) = setup();
        assert!(matches!(session.positions().await, Err(BridgeError::NotConnected)));
        assert!(matches!(session.account_info().await, Err(BridgeError::NotConnected)));
        assert_eq!(paper.call_count(PaperCall::Positions), 0);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let rendered = format!("{:?}", credentials());
        assert!(!rendered.contains("secret"));
    }
}
