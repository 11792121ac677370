pub mod market_snapshot;
pub mod payload;
pub mod trading;

// Re-export common types
pub use market_snapshot::{DayBar, MarketSnapshot};
pub use payload::{
    Bootstrap, CloseRequest, CommandAck, ContractSpec, FullState, OrderRequest, Product,
    RestoreRequest,
};
pub use trading::{
    AccountSnapshot, Effect, Order, OrderSide, OrderStatus, Position, PositionSide, RoundLogEntry,
    Trade,
};

/// Contract symbol, product code followed by the contract month (e.g., "AKT2603")
pub type Symbol = String;

/// Opaque serialized engine state
pub type StateBlob = String;
