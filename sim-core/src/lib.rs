pub mod engine;
pub mod error;
pub mod protocol;
pub mod types;

// Re-export commonly used items
pub use engine::Engine;
pub use error::EngineError;
pub use types::{
    AccountSnapshot, Bootstrap, CloseRequest, CommandAck, ContractSpec, DayBar, Effect, FullState,
    MarketSnapshot, Order, OrderRequest, OrderSide, OrderStatus, Position, PositionSide, Product,
    RestoreRequest, RoundLogEntry, StateBlob, Symbol, Trade,
};
