/*
[INPUT]:  Shared BridgeState
[OUTPUT]: Read-only StatusSnapshot for the status endpoint
[POS]:    Status layer - composes session and strategy state
[UPDATE]: When new state needs to be surfaced to clients
*/

use std::sync::Arc;

use serde::Serialize;

use crate::state::{BridgeState, StrategyRunState};
use crate::strategy::StrategyConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    #[serde(rename = "mt5_connected")]
    pub connected: bool,
    #[serde(rename = "auto_trading_active")]
    pub strategy_active: bool,
    /// Config of the last activation, kept after the run stops.
    #[serde(rename = "auto_trading_settings")]
    pub strategy_config: Option<StrategyConfig>,
    pub strategy_state: StrategyRunState,
    /// `None` until the terminal has been probed.
    pub terminal_ready: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct StatusAggregator {
    state: Arc<BridgeState>,
}

impl StatusAggregator {
    pub fn new(state: Arc<BridgeState>) -> Self {
        Self { state }
    }

    pub async fn snapshot(&self) -> StatusSnapshot {
        let view = self.state.view().await;
        StatusSnapshot {
            connected: view.connected,
            strategy_active: view.strategy_state == StrategyRunState::Running,
            strategy_config: view.strategy_config,
            strategy_state: view.strategy_state,
            terminal_ready: view.terminal_ready,
        }
    }
}
