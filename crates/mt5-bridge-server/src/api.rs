/*
[INPUT]:  HTTP JSON requests from the web dashboard
[OUTPUT]: `{"success": ...}` envelopes over the bridge components
[POS]:    Transport layer - axum router
[UPDATE]: When adding endpoints or changing wire shapes
*/

//! REST endpoints.
//!
//! Domain failures are reported in the body (`success: false` plus `error`
//! and `code`) with HTTP 200, so the dashboard only inspects one field.
//! - `POST /connect`, `POST /disconnect`
//! - `POST /place_order`, `POST /close_order`
//! - `POST /account_info`, `POST /positions`
//! - `POST /start_auto_trading`, `POST /stop_auto_trading`
//! - `GET /status`, `GET /health`

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::bridge::Bridge;
use crate::error::BridgeError;
use crate::gateway::OrderRequest;
use crate::session::Credentials;
use crate::status::StatusSnapshot;
use crate::strategy::StrategyConfig;

#[derive(Debug)]
pub struct ApiFailure(BridgeError);

impl From<BridgeError> for ApiFailure {
    fn from(err: BridgeError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiFailure {
    fn from(rejection: JsonRejection) -> Self {
        Self(BridgeError::InvalidRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let err = self.0;
        warn!(code = err.code(), error = %err, "request failed");
        Json(json!({
            "success": false,
            "error": err.to_string(),
            "code": err.code(),
        }))
        .into_response()
    }
}

type ApiResult = Result<Response, ApiFailure>;

#[derive(Serialize)]
struct Success<T> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

fn success<T: Serialize>(body: T) -> ApiResult {
    Ok(Json(Success {
        success: true,
        body,
    })
    .into_response())
}

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub server: String,
    pub account_number: u64,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CloseOrderRequest {
    pub ticket: u64,
}

async fn connect(
    State(bridge): State<Bridge>,
    body: Result<Json<ConnectRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = body?;
    let credentials = Credentials {
        account: request.account_number,
        password: request.password,
        server: request.server,
    };
    let account = bridge.session.connect(&credentials).await?;
    success(json!({ "account_info": account }))
}

async fn disconnect(State(bridge): State<Bridge>) -> ApiResult {
    bridge.session.disconnect().await;
    success(json!({ "message": "Disconnected" }))
}

async fn place_order(
    State(bridge): State<Bridge>,
    body: Result<Json<OrderRequest>, JsonRejection>,
) -> ApiResult {
    // Disconnected callers get NotConnected even when the body is malformed.
    bridge.session.ensure_connected().await?;
    let Json(request) = body?;
    let placed = bridge.gateway.place_order(&request).await?;
    success(json!({ "trade_info": placed }))
}

async fn close_order(
    State(bridge): State<Bridge>,
    body: Result<Json<CloseOrderRequest>, JsonRejection>,
) -> ApiResult {
    bridge.session.ensure_connected().await?;
    let Json(request) = body?;
    let closed = bridge.gateway.close_order(request.ticket).await?;
    success(closed)
}

async fn account_info(State(bridge): State<Bridge>) -> ApiResult {
    let account = bridge.session.account_info().await?;
    success(json!({ "account_info": account }))
}

async fn positions(State(bridge): State<Bridge>) -> ApiResult {
    let positions = bridge.session.positions().await?;
    success(json!({ "positions": positions }))
}

async fn start_auto_trading(
    State(bridge): State<Bridge>,
    body: Result<Json<StrategyConfig>, JsonRejection>,
) -> ApiResult {
    let Json(config) = body?;
    let run_id = bridge.runner.start(config).await?;
    success(json!({ "message": "Auto trading started", "run_id": run_id.to_string() }))
}

async fn stop_auto_trading(State(bridge): State<Bridge>) -> ApiResult {
    bridge.runner.stop().await;
    success(json!({ "message": "Auto trading stopped" }))
}

async fn status(State(bridge): State<Bridge>) -> Json<StatusSnapshot> {
    Json(bridge.status.snapshot().await)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Build the router; `enable_cors` allows any origin, method and header.
pub fn create_router(bridge: Bridge, enable_cors: bool) -> Router {
    let router = Router::new()
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
        .route("/place_order", post(place_order))
        .route("/close_order", post(close_order))
        .route("/account_info", post(account_info))
        .route("/positions", post(positions))
        .route("/start_auto_trading", post(start_auto_trading))
        .route("/stop_auto_trading", post(stop_auto_trading))
        .route("/status", get(status))
        .route("/health", get(health_check))
        .with_state(bridge);

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_envelope_shape() {
        let response = ApiFailure(BridgeError::NotConnected).into_response();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
