use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(Value::from(id)),
            method: method.to_string(),
            params,
        }
    }
}

/// JSON-RPC 2.0 Success Response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub result: Value,
}

/// JSON-RPC 2.0 Error Response
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub error: ErrorObject,
}

/// Either response shape, as read back by a client
#[derive(Debug, Deserialize)]
pub struct JsonRpcReply {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<ErrorObject>,
}

/// JSON-RPC Error Object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

pub const JSONRPC_VERSION: &str = "2.0";

// Standard JSON-RPC error codes
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

// Custom error codes for engine operations
pub const STATE_CORRUPT: i32 = -32001;

// Method names
pub const METHOD_BOOTSTRAP: &str = "engine.bootstrap";
pub const METHOD_STATE: &str = "engine.state";
pub const METHOD_TICK: &str = "engine.tick";
pub const METHOD_SUBMIT_ORDER: &str = "engine.submit_order";
pub const METHOD_CANCEL_ALL: &str = "engine.cancel_all";
pub const METHOD_CLOSE_POSITION: &str = "engine.close_position";
pub const METHOD_RESET_ALL: &str = "engine.reset_all";
pub const METHOD_EXPORT_STATE: &str = "engine.export_state";
pub const METHOD_RESTORE_STATE: &str = "engine.restore_state";
