/*
[INPUT]:  Public API exports for mt5-bridge-server crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod api;
pub mod bridge;
pub mod config;
pub mod error;
pub mod gateway;
pub mod runner;
pub mod session;
pub mod state;
pub mod status;
pub mod strategy;

// Re-export main types for convenience
pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use gateway::{ClosedOrder, OrderGateway, OrderRequest, PlacedOrder};
pub use runner::{CycleOutcome, RunnerTiming, StrategyRunner};
pub use session::{Credentials, SessionManager};
pub use state::{AccountSnapshot, BridgeState, StrategyRunState};
pub use status::{StatusAggregator, StatusSnapshot};
pub use strategy::{Scalping, Signal, StrategyConfig, StrategyKind, StrategyPolicy};
