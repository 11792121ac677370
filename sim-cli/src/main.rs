use anyhow::{Context, Result};
use clap::Parser;
use sim_client::{ClientConfig, LmdbStore, MemoryStore, RpcEngine, Session, StateStore};
use sim_core::Engine;
use sim_engine::{EngineConfig, LocalEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod display;

use commands::Command;

/// Terminal front-end for the futures trading simulator
///
/// Every invocation opens one session: it restores saved progress, runs the
/// command and persists whatever the command changed.
#[derive(Parser)]
#[command(name = "futures-sim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine JSON-RPC address
    #[arg(long, default_value = "127.0.0.1:7880")]
    addr: String,

    /// Run the engine in-process instead of connecting to a server
    #[arg(long)]
    local: bool,

    /// Fixed RNG seed for the in-process engine
    #[arg(long)]
    seed: Option<u64>,

    /// LMDB directory holding saved progress
    #[arg(long, default_value = ".futures-sim")]
    store: PathBuf,

    /// Keep progress in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Namespace for storage keys when several players share a store
    #[arg(long)]
    session_id: Option<String>,

    /// Product code to select before running the command
    #[arg(long)]
    product: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            engine_addr: self.addr.clone(),
            store_path: (!self.ephemeral).then(|| self.store.clone()),
            session_id: self.session_id.clone(),
            ..ClientConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "sim_cli={},sim_client={},sim_engine={}",
                cli.log_level, cli.log_level, cli.log_level
            ))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.client_config();
    tracing::info!("Session starting");
    tracing::info!("  Engine: {}", if cli.local { "in-process" } else { config.engine_addr.as_str() });
    tracing::info!("  Store: {:?}", config.store_path);

    if cli.local {
        let engine = Arc::new(LocalEngine::new(EngineConfig {
            seed: cli.seed,
            ..EngineConfig::default()
        }));
        with_store(engine, config, cli).await
    } else {
        let engine = Arc::new(RpcEngine::new(config.engine_addr.clone()));
        with_store(engine, config, cli).await
    }
}

async fn with_store<E: Engine>(engine: Arc<E>, config: ClientConfig, cli: Cli) -> Result<()> {
    match &config.store_path {
        Some(path) => {
            let store = LmdbStore::open(path)
                .with_context(|| format!("Failed to open store at {}", path.display()))?;
            run(engine, Arc::new(store), config, cli).await
        }
        None => run(engine, Arc::new(MemoryStore::new()), config, cli).await,
    }
}

async fn run<E: Engine, S: StateStore>(engine: Arc<E>, store: Arc<S>, config: ClientConfig, cli: Cli) -> Result<()> {
    let mut session = Session::open(engine, store, config)
        .await
        .context("Failed to load saved progress")?;
    session
        .initialize()
        .await
        .context("Failed to initialize session")?;

    if let Some(code) = &cli.product {
        session
            .select_product(code)
            .with_context(|| format!("Unknown product {}", code))?;
    }

    commands::execute(&mut session, cli.command).await
}
