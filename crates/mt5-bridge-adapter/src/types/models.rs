/*
[INPUT]:  Terminal account/market/position schema and serde requirements
[OUTPUT]: Typed Rust structs with serialization support
[POS]:    Data layer - type definitions for terminal communication
[UPDATE]: When terminal schema changes or new types added
[UPDATE]: 2026-10-12 accept missing Position.magic/comment in deserialization
*/

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::Direction;

/// Trading account as reported by the terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub login: u64,
    pub name: String,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub company: String,
    pub currency: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub equity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub margin: Decimal,
    #[serde(with = "rust_decimal::serde::float", alias = "margin_free")]
    pub free_margin: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub margin_level: Decimal,
    pub leverage: u32,
}

/// Best bid/ask for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    #[serde(with = "rust_decimal::serde::float")]
    pub bid: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub ask: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

impl Tick {
    pub fn new(bid: Decimal, ask: Decimal) -> Self {
        Self {
            bid,
            ask,
            time: None,
        }
    }

    /// Price a market deal in `direction` executes at: ask to buy, bid to sell.
    pub fn entry_price(&self, direction: Direction) -> Decimal {
        match direction {
            Direction::Buy => self.ask,
            Direction::Sell => self.bid,
        }
    }

    /// Price a position opened in `direction` closes at: bid for a buy, ask for a sell.
    pub fn exit_price(&self, direction: Direction) -> Decimal {
        self.entry_price(direction.opposite())
    }
}

/// Open position held by the terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub ticket: u64,
    pub symbol: String,
    #[serde(rename = "type")]
    pub direction: Direction,
    #[serde(with = "rust_decimal::serde::float")]
    pub volume: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_open: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub profit: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub swap: Decimal,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub magic: u64,
}

/// Last error recorded by the terminal, e.g. `(-6, "Authorization failed")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastError {
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl LastError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for LastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, '{}')", self.code, self.message)
    }
}
