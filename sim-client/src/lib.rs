//! Client side of the futures trading simulator.
//!
//! The Engine owns every number. This crate forwards commands to it, keeps
//! the latest snapshot, persists the Engine's state blob after each successful
//! mutation, and turns snapshots into view models, chart frames and the
//! guided tour overlay.

pub mod bridge;
pub mod chart;
pub mod config;
pub mod error;
pub mod metrics;
pub mod rpc_engine;
pub mod scale;
pub mod session;
pub mod store;
pub mod tour;
pub mod view_model;

pub use bridge::StateBridge;
pub use chart::{ChartRenderer, Frame, Surface, SvgSurface};
pub use config::{ChartConfig, ClientConfig};
pub use error::{ClientError, Result, StoreError};
pub use rpc_engine::RpcEngine;
pub use scale::{ScaleEngine, ScaleMode};
pub use session::{ChartMode, Notice, NoticeLevel, OrderAction, Session};
pub use store::{LmdbStore, MemoryStore, StateStore};
pub use tour::{TourEngine, TourEvent};
pub use view_model::{ViewModel, ViewModelBuilder};
