/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public broker terminal adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod broker;
pub mod http;
pub mod paper;
pub mod types;

pub use broker::BrokerClient;

// Re-export commonly used types from http
pub use http::{ClientConfig, DEFAULT_GATEWAY_URL, Result, TerminalClient, TerminalError};

pub use paper::{PaperBroker, PaperCall, PaperConfig};

// Re-export all types
pub use types::*;
