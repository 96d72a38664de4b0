/*
[INPUT]:  HTTP client configuration and terminal gateway endpoints
[OUTPUT]: HTTP responses and typed terminal results
[POS]:    HTTP layer - terminal gateway communication
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod client;
pub mod error;
pub mod terminal;

pub use error::{Result, TerminalError};

pub use client::{ClientConfig, DEFAULT_GATEWAY_URL, TerminalClient};
