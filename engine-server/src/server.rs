use anyhow::{Context, Result};
use serde_json::Value;
use sim_core::protocol::*;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::error::RpcError;
use crate::handler::EngineHandler;

/// JSON-RPC server hosting one engine
pub struct RpcServer {
    listener: TcpListener,
    handler: Arc<EngineHandler>,
}

impl RpcServer {
    /// Bind the listening socket. Port 0 picks an ephemeral port.
    pub async fn bind(config: &ServerConfig, handler: EngineHandler) -> Result<Self> {
        let addr = config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .context(format!("Failed to bind to {}", addr))?;

        Ok(Self {
            listener,
            handler: Arc::new(handler),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is dropped
    pub async fn run(self) -> Result<()> {
        tracing::info!("Engine JSON-RPC server listening on {}", self.local_addr()?);

        loop {
            match self.listener.accept().await {
                Ok((socket, addr)) => {
                    tracing::debug!("New connection from {}", addr);
                    let handler = Arc::clone(&self.handler);

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(socket, handler).await {
                            tracing::error!("Connection error from {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// Handle a single TCP connection
async fn handle_connection(mut socket: TcpStream, handler: Arc<EngineHandler>) -> Result<()> {
    let (reader, mut writer) = socket.split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        tracing::debug!("Received request: {}", line.trim());

        let response = process_request(&line, &handler).await;

        let response_json = serde_json::to_string(&response)?;
        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Process a JSON-RPC request
async fn process_request(line: &str, handler: &EngineHandler) -> Value {
    let request: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(req) => req,
        Err(e) => return create_error_response(None, RpcError::ParseError(e.to_string())),
    };

    if request.jsonrpc != JSONRPC_VERSION {
        return create_error_response(
            request.id,
            RpcError::InvalidRequest("JSON-RPC version must be 2.0".to_string()),
        );
    }

    match handler.handle(&request.method, request.params).await {
        Ok(result) => serde_json::to_value(JsonRpcResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: request.id,
            result,
        })
        .unwrap_or(Value::Null),
        Err(e) => {
            tracing::warn!("{} failed: {}", request.method, e);
            create_error_response(request.id, e)
        }
    }
}

/// Create an error response
fn create_error_response(id: Option<Value>, error: RpcError) -> Value {
    serde_json::to_value(JsonRpcError {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id,
        error: ErrorObject {
            code: error.code(),
            message: error.to_string(),
            data: None,
        },
    })
    .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_engine::{EngineConfig, LocalEngine};

    #[test]
    fn test_create_error_response() {
        let error = RpcError::MethodNotFound("test.method".to_string());
        let response = create_error_response(Some(Value::from(1)), error);

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("Method not found"));
        assert!(json.contains("-32601"));
    }

    #[tokio::test]
    async fn test_process_request_rejects_bad_version() {
        let handler = EngineHandler::new(Arc::new(LocalEngine::new(EngineConfig::seeded(1))));
        let response = process_request(r#"{"jsonrpc":"1.0","id":4,"method":"engine.state"}"#, &handler).await;
        assert_eq!(response["error"]["code"], INVALID_REQUEST);
        assert_eq!(response["id"], 4);
    }

    #[tokio::test]
    async fn test_process_request_parse_error() {
        let handler = EngineHandler::new(Arc::new(LocalEngine::new(EngineConfig::seeded(1))));
        let response = process_request("not json", &handler).await;
        assert_eq!(response["error"]["code"], PARSE_ERROR);
        assert!(response["id"].is_null());
    }
}
