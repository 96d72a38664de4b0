/*
[INPUT]:  BrokerClient implementation, call deadline, runner timing, root CancellationToken
[OUTPUT]: Bridge handle wiring session, gateway, runner and status over one BridgeState
[POS]:    Composition root for the trading core
[UPDATE]: When adding components that share BridgeState
*/

use std::sync::Arc;
use std::time::Duration;

use mt5_bridge_adapter::BrokerClient;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::gateway::OrderGateway;
use crate::runner::{RunnerTiming, SHUTDOWN_TIMEOUT, StrategyRunner};
use crate::session::SessionManager;
use crate::state::BridgeState;
use crate::status::StatusAggregator;

/// Cheap-to-clone handle over the trading core.
#[derive(Debug, Clone)]
pub struct Bridge {
    pub session: SessionManager,
    pub gateway: OrderGateway,
    pub runner: StrategyRunner,
    pub status: StatusAggregator,
}

impl Bridge {
    pub fn new(
        broker: Box<dyn BrokerClient>,
        call_timeout: Duration,
        timing: RunnerTiming,
        shutdown: CancellationToken,
    ) -> Self {
        let state = Arc::new(BridgeState::new(broker, call_timeout));
        let gateway = OrderGateway::new(state.clone());
        Self {
            session: SessionManager::new(state.clone()),
            runner: StrategyRunner::new(state.clone(), gateway.clone(), timing, shutdown),
            status: StatusAggregator::new(state),
            gateway,
        }
    }

    /// Stop the strategy loop, then drop the terminal session.
    pub async fn shutdown(&self) {
        self.runner.shutdown_and_wait(SHUTDOWN_TIMEOUT).await;
        self.session.disconnect().await;
        info!("bridge shutdown complete");
    }
}
