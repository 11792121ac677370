//! Out-of-process host for the simulation engine.
//!
//! Speaks newline-delimited JSON-RPC 2.0 over TCP: one request object per
//! line, one response object per line.

pub mod config;
pub mod error;
pub mod handler;
pub mod server;

pub use config::ServerConfig;
pub use handler::EngineHandler;
pub use server::RpcServer;
