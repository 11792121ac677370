use anyhow::Result;
use clap::Parser;
use sim_engine::{EngineConfig, LocalEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use engine_server::{EngineHandler, RpcServer, ServerConfig};

#[derive(Parser)]
#[command(name = "engine-server")]
#[command(about = "JSON-RPC host for the futures trading simulation engine")]
struct Cli {
    /// Server host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to bind to
    #[arg(long, default_value = "7880")]
    port: u16,

    /// Fixed RNG seed (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Ticks per simulated trading day
    #[arg(long, default_value = "30")]
    ticks_per_day: u64,

    /// Directory with product artwork ({code}.png)
    #[arg(long)]
    asset_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("engine_server={},sim_engine={}", cli.log_level, cli.log_level))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
        engine: EngineConfig {
            seed: cli.seed,
            ticks_per_day: cli.ticks_per_day,
            asset_dir: cli.asset_dir,
            ..EngineConfig::default()
        },
    };

    tracing::info!("Engine server starting");
    tracing::info!("  Address: {}", config.addr());
    tracing::info!("  Seed: {:?}", config.engine.seed);
    tracing::info!("  Ticks per day: {}", config.engine.ticks_per_day);

    let engine = Arc::new(LocalEngine::new(config.engine.clone()));
    let server = RpcServer::bind(&config, EngineHandler::new(engine)).await?;
    server.run().await?;

    Ok(())
}
