/*
[INPUT]:  Paper terminal, runner timing
[OUTPUT]: Shared fixtures for bridge integration tests
[POS]:    Test utilities
[UPDATE]: When fixtures need new knobs
*/

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use mt5_bridge_adapter::PaperBroker;
use mt5_bridge_server::{Bridge, Credentials, RunnerTiming};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

pub const CALL_TIMEOUT: Duration = Duration::from_secs(10);

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("valid decimal")
}

pub fn credentials() -> Credentials {
    Credentials {
        account: 5001,
        password: "paper-pass".to_string(),
        server: "Paper-Demo".to_string(),
    }
}

/// Bridge over a paper terminal the test keeps a handle to.
pub fn paper_bridge() -> (Arc<PaperBroker>, Bridge) {
    let paper = Arc::new(PaperBroker::new());
    let bridge = Bridge::new(
        Box::new(paper.clone()),
        CALL_TIMEOUT,
        RunnerTiming::default(),
        CancellationToken::new(),
    );
    (paper, bridge)
}

pub async fn connected_bridge() -> (Arc<PaperBroker>, Bridge) {
    let (paper, bridge) = paper_bridge();
    bridge
        .session
        .connect(&credentials())
        .await
        .expect("paper login succeeds");
    (paper, bridge)
}
