/*
[INPUT]:  Terminal trade-request schema and serde requirements
[OUTPUT]: Typed Rust request structs with serialization support
[POS]:    Data layer - type definitions for terminal communication
[UPDATE]: When terminal schema changes or new types added
*/

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::{Direction, FillPolicy, OrderTime, TradeAction};

/// Maximum price deviation, in points, accepted for market deals.
pub const DEFAULT_DEVIATION_POINTS: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub server: String,
    pub login: u64,
    pub password: String,
}

/// Trade request submitted to the terminal (`order_send`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeInstruction {
    pub action: TradeAction,
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub volume: Decimal,
    #[serde(rename = "type")]
    pub direction: Direction,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sl: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tp: Option<Decimal>,
    /// Ticket of the position this deal closes, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,
    pub deviation: u32,
    pub magic: u64,
    pub comment: String,
    pub type_time: OrderTime,
    pub type_filling: FillPolicy,
}

impl TradeInstruction {
    /// Immediate-or-cancel market deal with the default deviation tolerance.
    pub fn market_deal(
        symbol: impl Into<String>,
        direction: Direction,
        volume: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            action: TradeAction::Deal,
            symbol: symbol.into(),
            volume,
            direction,
            price,
            sl: None,
            tp: None,
            position: None,
            deviation: DEFAULT_DEVIATION_POINTS,
            magic: 0,
            comment: String::new(),
            type_time: OrderTime::Gtc,
            type_filling: FillPolicy::Ioc,
        }
    }

    pub fn with_tag(mut self, magic: u64, comment: impl Into<String>) -> Self {
        self.magic = magic;
        self.comment = comment.into();
        self
    }

    /// Attach protective levels; absent or zero levels are left unset.
    pub fn with_levels(mut self, sl: Option<Decimal>, tp: Option<Decimal>) -> Self {
        self.sl = sl.filter(|level| !level.is_zero());
        self.tp = tp.filter(|level| !level.is_zero());
        self
    }

    pub fn closing(mut self, ticket: u64) -> Self {
        self.position = Some(ticket);
        self
    }
}

/// Selection passed to `positions_get`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PositionFilter {
    #[default]
    All,
    Ticket(u64),
    Symbol(String),
}

impl PositionFilter {
    /// Query parameter used by the HTTP terminal gateway, left for the
    /// request builder to encode.
    pub fn query_pair(&self) -> Option<(&'static str, String)> {
        match self {
            PositionFilter::All => None,
            PositionFilter::Ticket(ticket) => Some(("ticket", ticket.to_string())),
            PositionFilter::Symbol(symbol) => Some(("symbol", symbol.clone())),
        }
    }

    pub fn matches(&self, ticket: u64, symbol: &str) -> bool {
        match self {
            PositionFilter::All => true,
            PositionFilter::Ticket(wanted) => *wanted == ticket,
            PositionFilter::Symbol(wanted) => wanted == symbol,
        }
    }
}
