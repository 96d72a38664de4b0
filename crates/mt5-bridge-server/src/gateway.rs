/*
[INPUT]:  OrderRequest / position ticket, shared BridgeState
[OUTPUT]: Market deals submitted to the terminal (open and close)
[POS]:    Execution layer - validates and prices ad-hoc and strategy orders
[UPDATE]: When changing order defaults, price resolution or retcode handling
[UPDATE]: 2026-10-15 Validate volume/symbol/price before touching the terminal
*/

use std::sync::Arc;

use mt5_bridge_adapter::{Direction, PositionFilter, TradeInstruction, TradeResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{BridgeError, Result};
use crate::state::BridgeState;

/// Magic number tagged on manual orders.
pub const MANUAL_MAGIC: u64 = 12345;
pub const CLOSE_COMMENT: &str = "Close position";

fn default_magic() -> u64 {
    MANUAL_MAGIC
}

/// Market order request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    #[serde(rename = "trade_type", alias = "type")]
    pub direction: Direction,
    #[serde(with = "rust_decimal::serde::float")]
    pub volume: Decimal,
    /// Resolved from the live quote when absent.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub stop_loss: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub take_profit: Option<Decimal>,
    #[serde(default)]
    pub comment: String,
    #[serde(default = "default_magic", rename = "magic_number")]
    pub magic: u64,
}

impl OrderRequest {
    pub fn market(symbol: impl Into<String>, direction: Direction, volume: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            direction,
            volume,
            price: None,
            stop_loss: None,
            take_profit: None,
            comment: String::new(),
            magic: MANUAL_MAGIC,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(BridgeError::InvalidRequest("symbol must not be empty".to_string()));
        }
        if self.volume <= Decimal::ZERO {
            return Err(BridgeError::InvalidRequest(format!(
                "volume must be positive, got {}",
                self.volume
            )));
        }
        if let Some(price) = self.price {
            if price <= Decimal::ZERO {
                return Err(BridgeError::InvalidRequest(format!(
                    "price must be positive, got {price}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlacedOrder {
    pub ticket: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub open_price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClosedOrder {
    #[serde(with = "rust_decimal::serde::float")]
    pub close_price: Decimal,
    /// Profit as read before the close was submitted.
    #[serde(with = "rust_decimal::serde::float")]
    pub profit: Decimal,
}

/// Places and closes market deals on behalf of API callers and the strategy loop.
#[derive(Debug, Clone)]
pub struct OrderGateway {
    state: Arc<BridgeState>,
}

impl OrderGateway {
    pub fn new(state: Arc<BridgeState>) -> Self {
        Self { state }
    }

    pub async fn place_order(&self, request: &OrderRequest) -> Result<PlacedOrder> {
        self.state.ensure_connected().await?;
        request.validate()?;

        let price = match request.price {
            Some(price) => price,
            None => self
                .state
                .session_tick(&request.symbol)
                .await?
                .ok_or_else(|| BridgeError::PriceUnavailable {
                    symbol: request.symbol.clone(),
                })?
                .entry_price(request.direction),
        };

        let instruction =
            TradeInstruction::market_deal(&request.symbol, request.direction, request.volume, price)
                .with_tag(request.magic, &request.comment)
                .with_levels(request.stop_loss, request.take_profit);

        let result = self.state.session_send_order(&instruction).await?;
        ensure_done(&result, "order")?;

        info!(
            symbol = %request.symbol,
            direction = %request.direction,
            volume = %request.volume,
            ticket = result.order,
            price = %result.price,
            magic = request.magic,
            "order placed"
        );
        Ok(PlacedOrder {
            ticket: result.order,
            open_price: result.price,
        })
    }

    pub async fn close_order(&self, ticket: u64) -> Result<ClosedOrder> {
        self.state.ensure_connected().await?;

        let position = self
            .state
            .session_positions(PositionFilter::Ticket(ticket))
            .await?
            .into_iter()
            .find(|position| position.ticket == ticket)
            .ok_or(BridgeError::PositionNotFound { ticket })?;

        let tick = self
            .state
            .session_tick(&position.symbol)
            .await?
            .ok_or_else(|| BridgeError::PriceUnavailable {
                symbol: position.symbol.clone(),
            })?;

        let instruction = TradeInstruction::market_deal(
            &position.symbol,
            position.direction.opposite(),
            position.volume,
            tick.exit_price(position.direction),
        )
        .with_tag(position.magic, CLOSE_COMMENT)
        .closing(ticket);

        let result = self.state.session_send_order(&instruction).await?;
        ensure_done(&result, "close")?;

        info!(
            ticket,
            symbol = %position.symbol,
            close_price = %result.price,
            profit = %position.profit,
            "position closed"
        );
        Ok(ClosedOrder {
            close_price: result.price,
            profit: position.profit,
        })
    }
}

fn ensure_done(result: &TradeResult, what: &str) -> Result<()> {
    if result.is_done() {
        return Ok(());
    }
    warn!(retcode = result.retcode, comment = %result.comment, "{what} rejected by terminal");
    Err(BridgeError::OrderRejected {
        retcode: result.retcode,
        broker_message: result.comment.clone(),
    })
}
