/*
[INPUT]:  Terminal gateway endpoints and session bearer token
[OUTPUT]: Typed account, market, position and trade results
[POS]:    HTTP layer - terminal gateway endpoints
[UPDATE]: When adding new endpoints or changing request parameters
[UPDATE]: 2026-10-18 Symbols are encoded by the URL and query builders
*/

use crate::http::{Result, TerminalClient, TerminalError};
use crate::types::{
    AccountInfo, AccountResponse, LastError, LoginRequest, LoginResponse, Position,
    PositionFilter, PositionsResponse, SuccessResponse, Tick, TradeInstruction, TradeResult,
};
use reqwest::Method;

impl TerminalClient {
    /// Attach to the terminal
    ///
    /// POST /terminal/initialize
    pub async fn initialize_terminal(&self) -> Result<bool> {
        let builder = self.request(Method::POST, "/terminal/initialize")?;
        let response: SuccessResponse = self.send_json(builder).await?;
        Ok(response.success)
    }

    /// Log into a trading account; stores the issued session id
    ///
    /// POST /auth/login
    pub async fn login_account(&self, req: &LoginRequest) -> Result<bool> {
        let builder = self.request(Method::POST, "/auth/login")?.json(req);
        let response: LoginResponse = self.send_json(builder).await?;
        if !response.success {
            tracing::debug!(
                login = req.login,
                server = %req.server,
                error = ?response.error,
                "gateway rejected login"
            );
            self.set_session_id(None);
            return Ok(false);
        }

        let session_id = response.session_id.ok_or_else(|| {
            TerminalError::InvalidResponse("login succeeded without session_id".to_string())
        })?;
        self.set_session_id(Some(session_id));
        Ok(true)
    }

    /// GET /terminal/last_error
    pub async fn query_last_error(&self) -> Result<LastError> {
        let builder = self.request(Method::GET, "/terminal/last_error")?;
        self.send_json(builder).await
    }

    /// GET /account/info
    pub async fn query_account_info(&self) -> Result<Option<AccountInfo>> {
        let builder = self.session_request(Method::GET, "/account/info")?;
        let response: Option<AccountResponse> = self.send_optional_json(builder).await?;
        Ok(response.map(|response| response.account))
    }

    /// GET /symbols/{symbol}/tick
    pub async fn query_tick(&self, symbol: &str) -> Result<Option<Tick>> {
        let builder =
            self.session_segments_request(Method::GET, &["symbols", symbol, "tick"])?;
        self.send_optional_json(builder).await
    }

    /// GET /positions?ticket={ticket} | ?symbol={symbol}
    pub async fn query_positions(&self, filter: &PositionFilter) -> Result<Vec<Position>> {
        let mut builder = self.session_request(Method::GET, "/positions")?;
        if let Some(pair) = filter.query_pair() {
            builder = builder.query(&[pair]);
        }
        let response: PositionsResponse = self.send_json(builder).await?;
        Ok(response.positions)
    }

    /// POST /orders
    pub async fn submit_order(&self, instruction: &TradeInstruction) -> Result<TradeResult> {
        let builder = self.session_request(Method::POST, "/orders")?.json(instruction);
        self.send_json(builder).await
    }

    /// Detach from the terminal and drop the session
    ///
    /// POST /terminal/shutdown
    pub async fn shutdown_terminal(&self) -> Result<()> {
        let builder = self.request(Method::POST, "/terminal/shutdown")?;
        let _: SuccessResponse = self.send_json(builder).await?;
        self.set_session_id(None);
        Ok(())
    }
}
