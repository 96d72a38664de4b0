/*
[INPUT]:  Terminal trade-request schema and serde requirements
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - type definitions for terminal communication
[UPDATE]: When terminal schema changes or new enums added
*/

use serde::{Deserialize, Serialize};

/// Trade server return code for a completed request.
pub const TRADE_RETCODE_DONE: u32 = 10009;
/// Request rejected by the trade server.
pub const TRADE_RETCODE_REJECT: u32 = 10006;
/// Request does not reference an existing position.
pub const TRADE_RETCODE_POSITION_CLOSED: u32 = 10036;
/// Not enough free margin for the deal.
pub const TRADE_RETCODE_NO_MONEY: u32 = 10019;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// Direction of the deal that flattens a position opened in `self`.
    pub fn opposite(self) -> Self {
        match self {
            Direction::Buy => Direction::Sell,
            Direction::Sell => Direction::Buy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    /// Immediate market deal
    Deal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillPolicy {
    #[serde(rename = "ioc")]
    Ioc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderTime {
    #[serde(rename = "gtc")]
    Gtc,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_opposite() {
        assert_eq!(Direction::Buy.opposite(), Direction::Sell);
        assert_eq!(Direction::Sell.opposite(), Direction::Buy);
    }

    #[test]
    fn test_direction_wire_format() {
        assert_eq!(serde_json::to_string(&Direction::Buy).unwrap(), "\"BUY\"");
        let parsed: Direction = serde_json::from_str("\"SELL\"").unwrap();
        assert_eq!(parsed, Direction::Sell);
    }
}
