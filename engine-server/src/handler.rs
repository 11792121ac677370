use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sim_core::protocol::*;
use sim_core::{CloseRequest, Engine, OrderRequest, RestoreRequest};
use std::sync::Arc;
use std::time::Instant;

use crate::error::RpcError;

/// Routes engine methods onto an `Engine` implementation
pub struct EngineHandler {
    engine: Arc<dyn Engine>,
}

impl EngineHandler {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Execute one method. Business rejections come back inside the
    /// `CommandAck` result, never as a JSON-RPC error.
    pub async fn handle(&self, method: &str, params: Option<Value>) -> Result<Value, RpcError> {
        let started = Instant::now();

        let result = match method {
            METHOD_BOOTSTRAP => to_value(self.engine.bootstrap().await?),
            METHOD_STATE => to_value(self.engine.state().await?),
            METHOD_TICK => to_value(self.engine.advance_tick().await?),
            METHOD_SUBMIT_ORDER => {
                let req: OrderRequest = parse_params(params)?;
                to_value(self.engine.submit_order(&req).await?)
            }
            METHOD_CANCEL_ALL => to_value(self.engine.cancel_all().await?),
            METHOD_CLOSE_POSITION => {
                let req: CloseRequest = parse_params(params)?;
                to_value(self.engine.close_position(&req).await?)
            }
            METHOD_RESET_ALL => to_value(self.engine.reset_all().await?),
            METHOD_EXPORT_STATE => to_value(self.engine.export_state().await?),
            METHOD_RESTORE_STATE => {
                let req: RestoreRequest = match params {
                    Some(p) => parse_params(Some(p))?,
                    None => RestoreRequest::default(),
                };
                self.engine
                    .restore_state(req.blob.as_deref())
                    .await
                    .map_err(|e| RpcError::StateCorrupt(e.to_string()))?;
                Ok(serde_json::json!({ "ok": true }))
            }
            other => Err(RpcError::MethodNotFound(other.to_string())),
        }?;

        tracing::debug!(
            "{} handled in {}ms",
            method,
            started.elapsed().as_millis()
        );

        Ok(result)
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, RpcError> {
    let params = params.ok_or_else(|| RpcError::InvalidParams("Missing params".to_string()))?;
    serde_json::from_value(params).map_err(|e| RpcError::InvalidParams(format!("Invalid params: {}", e)))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::InternalError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_engine::{EngineConfig, LocalEngine};

    fn handler() -> EngineHandler {
        EngineHandler::new(Arc::new(LocalEngine::new(EngineConfig::seeded(3))))
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let err = handler().handle("engine.nope", None).await.unwrap_err();
        assert_eq!(err.code(), METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_submit_requires_params() {
        let err = handler().handle(METHOD_SUBMIT_ORDER, None).await.unwrap_err();
        assert_eq!(err.code(), INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_rejection_is_a_result() {
        let params = serde_json::json!({
            "symbol": "AKT2603", "side": "buy", "effect": "open", "price": 100.0, "qty": 0
        });
        let value = handler().handle(METHOD_SUBMIT_ORDER, Some(params)).await.unwrap();
        assert_eq!(value["ok"], false);
        assert_eq!(value["error"], "qty must be > 0");
    }

    #[tokio::test]
    async fn test_restore_garbage_is_state_corrupt() {
        let params = serde_json::json!({ "blob": "][" });
        let err = handler().handle(METHOD_RESTORE_STATE, Some(params)).await.unwrap_err();
        assert_eq!(err.code(), STATE_CORRUPT);
    }
}
