use sim_core::EngineError;
use thiserror::Error;

/// Persistence backend failure
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("LMDB error: {0}")]
    Lmdb(#[from] lmdb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored value for {key} is not valid UTF-8")]
    InvalidUtf8 { key: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum ClientError {
    /// Engine unreachable, rejected the command, or answered garbage
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Persistence failed: {0}")]
    Store(#[from] StoreError),

    /// Malformed user input, caught before any Engine round trip
    #[error("{0}")]
    InvalidInput(String),

    #[error("Session not initialized")]
    NotInitialized,

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
}

impl ClientError {
    /// Category (a): the session cannot continue
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClientError::Engine(e) if e.is_fatal())
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, ClientError::Engine(e) if e.is_rejection())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
