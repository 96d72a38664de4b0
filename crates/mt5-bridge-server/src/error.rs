/*
[INPUT]:  Failures from session, gateway, runner and the broker terminal
[OUTPUT]: BridgeError taxonomy with stable codes for the transport
[POS]:    Error handling layer - typed failures returned to callers
[UPDATE]: When adding new failure modes or changing error codes
*/

use std::time::Duration;

use mt5_bridge_adapter::TerminalError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("MT5 not connected")]
    NotConnected,

    #[error("connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("failed to get price for {symbol}")]
    PriceUnavailable { symbol: String },

    #[error("position {ticket} not found")]
    PositionNotFound { ticket: u64 },

    #[error("order rejected (retcode {retcode}): {broker_message}")]
    OrderRejected { retcode: u32, broker_message: String },

    #[error("auto trading already active")]
    AlreadyRunning,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unknown trading strategy: {0}")]
    UnknownStrategy(String),

    #[error("failed to get account info")]
    AccountUnavailable,

    #[error("broker call {operation} timed out after {after:?}")]
    BrokerTimeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("broker terminal error: {0}")]
    Broker(#[from] TerminalError),
}

impl BridgeError {
    /// Stable machine-readable code for the transport layer.
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::NotConnected => "not_connected",
            BridgeError::ConnectionFailed { .. } => "connection_failed",
            BridgeError::PriceUnavailable { .. } => "price_unavailable",
            BridgeError::PositionNotFound { .. } => "position_not_found",
            BridgeError::OrderRejected { .. } => "order_rejected",
            BridgeError::AlreadyRunning => "already_running",
            BridgeError::InvalidRequest(_) => "invalid_request",
            BridgeError::UnknownStrategy(_) => "unknown_strategy",
            BridgeError::AccountUnavailable => "account_unavailable",
            BridgeError::BrokerTimeout { .. } => "broker_timeout",
            BridgeError::Broker(_) => "broker_error",
        }
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            BridgeError::PriceUnavailable { .. } | BridgeError::BrokerTimeout { .. } => true,
            BridgeError::Broker(err) => err.is_retryable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(BridgeError::NotConnected.code(), "not_connected");
        assert_eq!(BridgeError::PositionNotFound { ticket: 1 }.code(), "position_not_found");
        assert_eq!(BridgeError::AlreadyRunning.to_string(), "auto trading already active");
    }

    #[test]
    fn test_error_transient() {
        let timeout = BridgeError::BrokerTimeout {
            operation: "tick",
            after: Duration::from_secs(10),
        };
        assert!(timeout.is_transient());
        assert!(!BridgeError::NotConnected.is_transient());
        assert!(!BridgeError::Broker(TerminalError::NoSession).is_transient());
    }
}
