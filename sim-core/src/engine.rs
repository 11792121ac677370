use async_trait::async_trait;

use crate::error::EngineError;
use crate::types::{Bootstrap, CloseRequest, CommandAck, FullState, OrderRequest, StateBlob};

/// Command/query contract of the simulation engine.
///
/// Every call is a single request/response attempt. Mutating calls return a
/// `CommandAck`; callers turn `ok: false` into `EngineError::Rejected` with
/// `CommandAck::into_result`.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Static reference data
    async fn bootstrap(&self) -> Result<Bootstrap, EngineError>;

    /// Full-replacement snapshot
    async fn state(&self) -> Result<FullState, EngineError>;

    /// Advance the simulation exactly one tick
    async fn advance_tick(&self) -> Result<CommandAck, EngineError>;

    async fn submit_order(&self, request: &OrderRequest) -> Result<CommandAck, EngineError>;

    async fn cancel_all(&self) -> Result<CommandAck, EngineError>;

    async fn close_position(&self, request: &CloseRequest) -> Result<CommandAck, EngineError>;

    /// Reinitialise to default state. Callers clear persisted state first.
    async fn reset_all(&self) -> Result<CommandAck, EngineError>;

    /// Serialize the complete internal state
    async fn export_state(&self) -> Result<StateBlob, EngineError>;

    /// Replace internal state with `blob`, or with defaults when `None`
    async fn restore_state(&self, blob: Option<&str>) -> Result<(), EngineError>;
}
