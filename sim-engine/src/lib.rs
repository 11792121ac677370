//! Reference simulation engine.
//!
//! Generates tick prices inside a daily limit band, matches limit orders
//! against the last price, tracks margin and PnL and aggregates day bars.
//! The whole state serializes to one JSON blob.

pub mod config;
pub mod local;
pub mod market;
pub mod matching;
pub mod state;

pub use config::EngineConfig;
pub use local::LocalEngine;
pub use state::GameState;
