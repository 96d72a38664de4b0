/*
[INPUT]:  Test configuration and mock gateway requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for mt5-bridge-adapter tests

use mt5_bridge_adapter::{ClientConfig, TerminalClient};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Setup a mock terminal gateway for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Session id handed out by `mount_login`
pub fn mock_session_id() -> String {
    "sess-7f3a9c".to_string()
}

/// Accept any login and hand out `mock_session_id`
pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "session_id": mock_session_id(),
        })))
        .mount(server)
        .await;
}

pub fn client_for(server: &MockServer) -> TerminalClient {
    TerminalClient::with_config(ClientConfig::default(), &server.uri())
        .expect("client should build for mock server")
}
