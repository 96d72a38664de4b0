/*
[INPUT]:  Mock terminal gateway responses
[OUTPUT]: Test results for the HTTP BrokerClient implementation
[POS]:    Integration tests - terminal gateway endpoints
[UPDATE]: When gateway endpoints change
*/

mod common;

use std::str::FromStr;

use common::{client_for, mock_session_id, mount_login, setup_mock_server};
use mt5_bridge_adapter::{
    BrokerClient, ClientConfig, Direction, PositionFilter, TerminalClient, TerminalError,
    TradeInstruction, TRADE_RETCODE_DONE,
};
use rust_decimal::Decimal;
use tokio_test::assert_ok;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("valid decimal")
}

#[test]
fn test_client_creation() {
    let client = assert_ok!(TerminalClient::new());
    assert!(client.session_id().is_none());
}

#[test]
fn test_client_rejects_bad_base_url() {
    let err = TerminalClient::with_config(ClientConfig::default(), "not a url").unwrap_err();
    assert!(matches!(err, TerminalError::UrlParse(_)));
}

#[tokio::test]
async fn test_login_stores_session_and_account_uses_it() {
    let server = setup_mock_server().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/account/info"))
        .and(header("authorization", format!("Bearer {}", mock_session_id()).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "account": {
                "login": 5001,
                "name": "Demo Account 5001",
                "server": "Demo-Server",
                "company": "MetaQuotes Ltd.",
                "currency": "USD",
                "balance": 10000.0,
                "equity": 10012.5,
                "margin": 110.0,
                "margin_free": 9902.5,
                "margin_level": 9102.27,
                "leverage": 100
            }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(assert_ok!(client.login(5001, "secret", "Demo-Server").await));
    assert_eq!(client.session_id(), Some(mock_session_id()));

    let account = assert_ok!(client.account_info().await).expect("account present");
    assert_eq!(account.login, 5001);
    assert_eq!(account.equity, dec("10012.5"));
    assert_eq!(account.free_margin, dec("9902.5"));
}

#[tokio::test]
async fn test_refused_login_returns_false_and_reports_last_error() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "error": "Authorization failed"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/terminal/last_error"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": -6,
            "message": "Terminal: Authorization failed"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(!assert_ok!(client.login(5001, "wrong", "Demo-Server").await));
    assert!(client.session_id().is_none());

    let last_error = assert_ok!(client.last_error().await);
    assert_eq!(last_error.code, -6);
}

#[tokio::test]
async fn test_send_order_posts_instruction() {
    let server = setup_mock_server().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(body_partial_json(serde_json::json!({
            "action": "deal",
            "symbol": "EURUSD",
            "type": "BUY",
            "deviation": 20,
            "type_filling": "ioc",
            "magic": 12345
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "retcode": TRADE_RETCODE_DONE,
            "order": 555001,
            "price": 1.0952,
            "comment": "Request executed"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(assert_ok!(client.login(5001, "secret", "Demo-Server").await));

    let instruction = TradeInstruction::market_deal("EURUSD", Direction::Buy, dec("0.10"), dec("1.0952"))
        .with_tag(12345, "");
    let result = assert_ok!(client.send_order(&instruction).await);
    assert!(result.is_done());
    assert_eq!(result.order, 555001);
    assert_eq!(result.price, dec("1.0952"));
}

#[tokio::test]
async fn test_positions_by_ticket_and_gateway_errors() {
    let server = setup_mock_server().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/positions"))
        .and(query_param("ticket", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "positions": []
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/positions"))
        .and(query_param("symbol", "USDJPY"))
        .respond_with(ResponseTemplate::new(503).set_body_string("terminal busy"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(assert_ok!(client.login(5001, "secret", "Demo-Server").await));

    let none = assert_ok!(client.positions(PositionFilter::Ticket(42)).await);
    assert!(none.is_empty());

    let err = client
        .positions(PositionFilter::Symbol("USDJPY".to_string()))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    match err {
        TerminalError::Gateway { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "terminal busy");
        }
        other => panic!("expected gateway error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_shutdown_drops_session() {
    let server = setup_mock_server().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/terminal/shutdown"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(assert_ok!(client.login(5001, "secret", "Demo-Server").await));
    assert_ok!(client.shutdown().await);
    assert!(client.session_id().is_none());
}
