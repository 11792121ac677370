use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sim_core::protocol::*;
use sim_core::{
    Bootstrap, CloseRequest, CommandAck, Engine, EngineError, FullState, OrderRequest,
    RestoreRequest, StateBlob,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Engine reached over newline-delimited JSON-RPC.
///
/// Each call opens its own connection and drops it when the reply is read,
/// whether the call succeeded or not.
pub struct RpcEngine {
    addr: String,
    next_id: AtomicU64,
}

impl RpcEngine {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn call<P: Serialize, R: DeserializeOwned>(&self, method: &str, params: Option<P>) -> Result<R, EngineError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let params = params.map(serde_json::to_value).transpose()?;
        let request = JsonRpcRequest::new(id, method, params);

        let mut line = serde_json::to_string(&request)?;
        line.push('\n');

        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| EngineError::Unavailable(format!("{}: {}", self.addr, e)))?;
        let (reader, mut writer) = stream.into_split();

        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;

        let mut reply_line = String::new();
        let read = BufReader::new(reader)
            .read_line(&mut reply_line)
            .await
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;
        if read == 0 {
            return Err(EngineError::Unavailable("connection closed before reply".to_string()));
        }

        tracing::debug!("{} -> {}", method, reply_line.trim());
        decode_reply(&reply_line)
    }
}

/// Turn a reply line into the method result or an `EngineError`
fn decode_reply<R: DeserializeOwned>(line: &str) -> Result<R, EngineError> {
    let reply: JsonRpcReply = serde_json::from_str(line)?;

    if let Some(err) = reply.error {
        return Err(match err.code {
            STATE_CORRUPT | INTERNAL_ERROR => EngineError::Internal(err.message),
            _ => EngineError::Protocol(format!("{} ({})", err.message, err.code)),
        });
    }

    let result = reply
        .result
        .ok_or_else(|| EngineError::Protocol("reply has neither result nor error".to_string()))?;
    Ok(serde_json::from_value(result)?)
}

#[async_trait]
impl Engine for RpcEngine {
    async fn bootstrap(&self) -> Result<Bootstrap, EngineError> {
        self.call(METHOD_BOOTSTRAP, None::<()>).await
    }

    async fn state(&self) -> Result<FullState, EngineError> {
        self.call(METHOD_STATE, None::<()>).await
    }

    async fn advance_tick(&self) -> Result<CommandAck, EngineError> {
        self.call(METHOD_TICK, None::<()>).await
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<CommandAck, EngineError> {
        self.call(METHOD_SUBMIT_ORDER, Some(request)).await
    }

    async fn cancel_all(&self) -> Result<CommandAck, EngineError> {
        self.call(METHOD_CANCEL_ALL, None::<()>).await
    }

    async fn close_position(&self, request: &CloseRequest) -> Result<CommandAck, EngineError> {
        self.call(METHOD_CLOSE_POSITION, Some(request)).await
    }

    async fn reset_all(&self) -> Result<CommandAck, EngineError> {
        self.call(METHOD_RESET_ALL, None::<()>).await
    }

    async fn export_state(&self) -> Result<StateBlob, EngineError> {
        self.call(METHOD_EXPORT_STATE, None::<()>).await
    }

    async fn restore_state(&self, blob: Option<&str>) -> Result<(), EngineError> {
        let params = RestoreRequest {
            blob: blob.map(str::to_string),
        };
        let _: Value = self.call(METHOD_RESTORE_STATE, Some(params)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_result() {
        let ack: CommandAck = decode_reply(r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#).unwrap();
        assert!(ack.ok);
    }

    #[test]
    fn test_decode_error_codes() {
        let err = decode_reply::<Value>(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32001,"message":"bad blob"}}"#)
            .unwrap_err();
        assert_eq!(err, EngineError::Internal("bad blob".to_string()));

        let err = decode_reply::<Value>(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found: x"}}"#)
            .unwrap_err();
        assert!(matches!(err, EngineError::Protocol(_)));
    }

    #[test]
    fn test_decode_garbage_is_protocol_error() {
        assert!(matches!(decode_reply::<Value>("nope"), Err(EngineError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_connect_failure_is_unavailable() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let engine = RpcEngine::new(addr.to_string());
        let err = engine.state().await.unwrap_err();
        assert!(err.is_fatal());
    }
}
