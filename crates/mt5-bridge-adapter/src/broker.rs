/*
[INPUT]:  Terminal connectivity implementations (HTTP gateway, paper terminal)
[OUTPUT]: BrokerClient trait consumed by the bridge core
[POS]:    Broker layer - terminal connectivity abstraction
[UPDATE]: When the terminal contract gains or changes calls
*/

use std::sync::Arc;

use async_trait::async_trait;

use crate::http::{Result, TerminalClient};
use crate::types::{
    AccountInfo, LastError, LoginRequest, Position, PositionFilter, Tick, TradeInstruction,
    TradeResult,
};

/// Capability offered by a broker terminal.
///
/// Implementations are not assumed to tolerate concurrent calls; callers
/// serialize access.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Attach to the terminal. `false` means the terminal is unreachable.
    async fn initialize(&self) -> Result<bool>;

    /// Log into `account` on `server`. `false` means the terminal refused;
    /// see `last_error` for the reason.
    async fn login(&self, account: u64, password: &str, server: &str) -> Result<bool>;

    async fn last_error(&self) -> Result<LastError>;

    async fn account_info(&self) -> Result<Option<AccountInfo>>;

    /// Latest bid/ask, `None` if the symbol has no quote.
    async fn tick(&self, symbol: &str) -> Result<Option<Tick>>;

    async fn positions(&self, filter: PositionFilter) -> Result<Vec<Position>>;

    async fn send_order(&self, instruction: &TradeInstruction) -> Result<TradeResult>;

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl BrokerClient for TerminalClient {
    async fn initialize(&self) -> Result<bool> {
        self.initialize_terminal().await
    }

    async fn login(&self, account: u64, password: &str, server: &str) -> Result<bool> {
        let req = LoginRequest {
            server: server.to_string(),
            login: account,
            password: password.to_string(),
        };
        self.login_account(&req).await
    }

    async fn last_error(&self) -> Result<LastError> {
        self.query_last_error().await
    }

    async fn account_info(&self) -> Result<Option<AccountInfo>> {
        self.query_account_info().await
    }

    async fn tick(&self, symbol: &str) -> Result<Option<Tick>> {
        self.query_tick(symbol).await
    }

    async fn positions(&self, filter: PositionFilter) -> Result<Vec<Position>> {
        self.query_positions(&filter).await
    }

    async fn send_order(&self, instruction: &TradeInstruction) -> Result<TradeResult> {
        self.submit_order(instruction).await
    }

    async fn shutdown(&self) -> Result<()> {
        self.shutdown_terminal().await
    }
}

/// Shared handles delegate, so a caller can keep inspecting the terminal it
/// handed to the bridge.
#[async_trait]
impl<T: BrokerClient + ?Sized> BrokerClient for Arc<T> {
    async fn initialize(&self) -> Result<bool> {
        (**self).initialize().await
    }

    async fn login(&self, account: u64, password: &str, server: &str) -> Result<bool> {
        (**self).login(account, password, server).await
    }

    async fn last_error(&self) -> Result<LastError> {
        (**self).last_error().await
    }

    async fn account_info(&self) -> Result<Option<AccountInfo>> {
        (**self).account_info().await
    }

    async fn tick(&self, symbol: &str) -> Result<Option<Tick>> {
        (**self).tick(symbol).await
    }

    async fn positions(&self, filter: PositionFilter) -> Result<Vec<Position>> {
        (**self).positions(filter).await
    }

    async fn send_order(&self, instruction: &TradeInstruction) -> Result<TradeResult> {
        (**self).send_order(instruction).await
    }

    async fn shutdown(&self) -> Result<()> {
        (**self).shutdown().await
    }
}
