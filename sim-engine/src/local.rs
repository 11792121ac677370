use async_trait::async_trait;
use sim_core::{
    Bootstrap, CloseRequest, CommandAck, Engine, EngineError, FullState, OrderRequest, StateBlob,
};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::state::GameState;

/// In-process engine holding one `GameState` behind a mutex
pub struct LocalEngine {
    config: EngineConfig,
    state: Mutex<GameState>,
}

impl LocalEngine {
    pub fn new(config: EngineConfig) -> Self {
        let state = GameState::from_config(config.clone());
        info!("Local engine created (seed={})", state.seed);
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn lock(&self) -> Result<MutexGuard<'_, GameState>, EngineError> {
        self.state
            .lock()
            .map_err(|_| EngineError::Internal("engine state lock poisoned".to_string()))
    }

    fn fresh_state(&self) -> GameState {
        GameState::from_config(self.config.clone())
    }

    fn log_ack(command: &str, ack: &CommandAck) {
        match &ack.error {
            Some(err) if !ack.ok => warn!("{} rejected: {}", command, err),
            _ => debug!("{} ok", command),
        }
    }
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[async_trait]
impl Engine for LocalEngine {
    async fn bootstrap(&self) -> Result<Bootstrap, EngineError> {
        Ok(self.lock()?.bootstrap_payload())
    }

    async fn state(&self) -> Result<FullState, EngineError> {
        Ok(self.lock()?.state_payload())
    }

    async fn advance_tick(&self) -> Result<CommandAck, EngineError> {
        let mut state = self.lock()?;
        state.advance_tick();
        debug!("Tick {} done", state.tick);
        Ok(CommandAck::ok())
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<CommandAck, EngineError> {
        let ack = self.lock()?.place_order(request);
        Self::log_ack("submit_order", &ack);
        Ok(ack)
    }

    async fn cancel_all(&self) -> Result<CommandAck, EngineError> {
        self.lock()?.cancel_all();
        Ok(CommandAck::ok())
    }

    async fn close_position(&self, request: &CloseRequest) -> Result<CommandAck, EngineError> {
        let ack = self.lock()?.close_position(request);
        Self::log_ack("close_position", &ack);
        Ok(ack)
    }

    async fn reset_all(&self) -> Result<CommandAck, EngineError> {
        let fresh = self.fresh_state();
        *self.lock()? = fresh;
        info!("Engine reset to default state");
        Ok(CommandAck::ok())
    }

    async fn export_state(&self) -> Result<StateBlob, EngineError> {
        let state = self.lock()?;
        serde_json::to_string(&*state).map_err(|e| EngineError::Internal(e.to_string()))
    }

    async fn restore_state(&self, blob: Option<&str>) -> Result<(), EngineError> {
        let next = match blob {
            Some(blob) => {
                let mut restored: GameState = serde_json::from_str(blob)
                    .map_err(|e| EngineError::Internal(format!("corrupt state blob: {}", e)))?;
                restored.config.asset_dir = self.config.asset_dir.clone();
                info!("Engine state restored (tick={})", restored.tick);
                restored
            }
            None => {
                info!("No saved state, starting fresh");
                self.fresh_state()
            }
        };
        *self.lock()? = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_corrupt_blob_is_internal_error() {
        let engine = LocalEngine::new(EngineConfig::seeded(1));
        let err = engine.restore_state(Some("{not json")).await.unwrap_err();
        assert!(matches!(err, EngineError::Internal(_)));
    }

    #[tokio::test]
    async fn test_rejection_comes_back_as_ack() {
        let engine = LocalEngine::new(EngineConfig::seeded(1));
        let ack = engine
            .submit_order(&OrderRequest {
                symbol: "ZZZ2603".to_string(),
                side: sim_core::OrderSide::Buy,
                effect: sim_core::Effect::Open,
                price: 100.0,
                qty: 1,
            })
            .await
            .unwrap();
        assert!(!ack.ok);
        assert_eq!(ack.error.as_deref(), Some("unknown symbol"));
    }
}
