use thiserror::Error;

/// Failure of a call across the Engine command/query contract
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Engine unreachable or failed to load; fatal to the session
    #[error("Engine unavailable: {0}")]
    Unavailable(String),

    /// Business-rule rejection; message is the engine's, verbatim
    #[error("{0}")]
    Rejected(String),

    /// Response could not be understood
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Engine internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Transport/initialisation failures end the session
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Unavailable(_))
    }

    /// Business-rule rejection (the command had no effect)
    pub fn is_rejection(&self) -> bool {
        matches!(self, EngineError::Rejected(_))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Protocol(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_message_is_verbatim() {
        let err = EngineError::Rejected("position not enough".to_string());
        assert_eq!(err.to_string(), "position not enough");
        assert!(err.is_rejection());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_unavailable_is_fatal() {
        let err = EngineError::Unavailable("connection refused".to_string());
        assert!(err.is_fatal());
        assert!(err.to_string().contains("connection refused"));
    }
}
