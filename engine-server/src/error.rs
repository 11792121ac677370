use sim_core::EngineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("State blob rejected: {0}")]
    StateCorrupt(String),
}

impl RpcError {
    /// Get the JSON-RPC error code for this error
    pub fn code(&self) -> i32 {
        use sim_core::protocol::*;
        match self {
            RpcError::ParseError(_) => PARSE_ERROR,
            RpcError::InvalidRequest(_) => INVALID_REQUEST,
            RpcError::MethodNotFound(_) => METHOD_NOT_FOUND,
            RpcError::InvalidParams(_) => INVALID_PARAMS,
            RpcError::InternalError(_) => INTERNAL_ERROR,
            RpcError::StateCorrupt(_) => STATE_CORRUPT,
        }
    }
}

impl From<EngineError> for RpcError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Protocol(msg) => RpcError::InvalidParams(msg),
            other => RpcError::InternalError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(RpcError::MethodNotFound("x".to_string()).code(), -32601);
        assert_eq!(RpcError::StateCorrupt("bad".to_string()).code(), -32001);
    }
}
