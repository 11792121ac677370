use sim_core::{
    Bootstrap, CloseRequest, CommandAck, Engine, EngineError, FullState, OrderRequest,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{ClientError, Result};
use crate::metrics::{CommandMetrics, MetricsTimer};
use crate::store::StateStore;

/// Sole owner of the authoritative snapshot.
///
/// Every mutating command is one Engine call followed, only on success, by an
/// export of the Engine state and a write to the store under `save_key`.
/// Errors propagate unchanged and nothing is retried. Callers serialize
/// commands; `&mut self` on every command enforces one in flight.
pub struct StateBridge<E: Engine, S: StateStore> {
    engine: Arc<E>,
    store: Arc<S>,
    save_key: String,
    snapshot: Option<FullState>,
}

impl<E: Engine, S: StateStore> StateBridge<E, S> {
    /// Load the persisted blob (if any) into the Engine.
    /// A missing blob makes the Engine start from defaults.
    pub async fn open(engine: Arc<E>, store: Arc<S>, save_key: impl Into<String>) -> Result<Self> {
        let save_key = save_key.into();
        let blob = store.load(&save_key)?;

        match &blob {
            Some(b) => info!("Restoring engine state from {} ({} bytes)", save_key, b.len()),
            None => info!("No persisted state under {}, engine starts fresh", save_key),
        }

        engine
            .restore_state(blob.as_deref())
            .await
            .map_err(unavailable_on_load)?;

        Ok(Self {
            engine,
            store,
            save_key,
            snapshot: None,
        })
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn save_key(&self) -> &str {
        &self.save_key
    }

    /// Static reference data
    pub async fn bootstrap(&self) -> Result<Bootstrap> {
        Ok(self.engine.bootstrap().await?)
    }

    /// Fetch a fresh snapshot, replacing the previous one entirely
    pub async fn refresh(&mut self) -> Result<&FullState> {
        let state = self.engine.state().await?;
        Ok(&*self.snapshot.insert(state))
    }

    /// Fetch and return a fresh snapshot
    pub async fn snapshot(&mut self) -> Result<FullState> {
        Ok(self.refresh().await?.clone())
    }

    /// Last fetched snapshot, read-only
    pub fn current(&self) -> Option<&FullState> {
        self.snapshot.as_ref()
    }

    pub async fn advance_tick(&mut self) -> Result<CommandAck> {
        let mut metrics = CommandMetrics::new("advance_tick");
        let timer = MetricsTimer::start();
        let ack = self.engine.advance_tick().await?.into_result()?;
        self.persist(&mut metrics, timer).await?;
        Ok(ack)
    }

    pub async fn submit_order(&mut self, request: &OrderRequest) -> Result<CommandAck> {
        let mut metrics = CommandMetrics::new("submit_order");
        let timer = MetricsTimer::start();
        let ack = self.engine.submit_order(request).await?.into_result()?;
        self.persist(&mut metrics, timer).await?;
        Ok(ack)
    }

    pub async fn cancel_all(&mut self) -> Result<CommandAck> {
        let mut metrics = CommandMetrics::new("cancel_all");
        let timer = MetricsTimer::start();
        let ack = self.engine.cancel_all().await?.into_result()?;
        self.persist(&mut metrics, timer).await?;
        Ok(ack)
    }

    pub async fn close_position(&mut self, request: &CloseRequest) -> Result<CommandAck> {
        let mut metrics = CommandMetrics::new("close_position");
        let timer = MetricsTimer::start();
        let ack = self.engine.close_position(request).await?.into_result()?;
        self.persist(&mut metrics, timer).await?;
        Ok(ack)
    }

    /// Discard persisted state first, then reinitialise the Engine
    pub async fn reset_all(&mut self) -> Result<CommandAck> {
        self.store.remove(&self.save_key)?;
        info!("Discarded persisted state under {}", self.save_key);
        self.snapshot = None;

        let mut metrics = CommandMetrics::new("reset_all");
        let timer = MetricsTimer::start();
        let ack = self.engine.reset_all().await?.into_result()?;
        self.persist(&mut metrics, timer).await?;
        Ok(ack)
    }

    async fn persist(&self, metrics: &mut CommandMetrics, engine_timer: MetricsTimer) -> Result<()> {
        let blob = self.engine.export_state().await?;
        metrics.set_engine_latency(engine_timer.stop());

        let timer = MetricsTimer::start();
        self.store.save(&self.save_key, &blob)?;
        metrics.set_persist_latency(timer.stop());
        metrics.blob_bytes = blob.len();

        debug!("Persisted {} bytes under {}", blob.len(), self.save_key);
        metrics.report();
        Ok(())
    }
}

/// A blob the Engine cannot load leaves the session without an Engine
fn unavailable_on_load(err: EngineError) -> ClientError {
    match err {
        EngineError::Internal(msg) | EngineError::Protocol(msg) => {
            ClientError::Engine(EngineError::Unavailable(format!("failed to load state: {}", msg)))
        }
        other => ClientError::Engine(other),
    }
}
