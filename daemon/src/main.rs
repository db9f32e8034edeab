//! vpower daemon: serves account and worker voting power over time.

mod config;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use vpower_index::IndexClient;
use vpower_power::PowerEngine;
use vpower_rpc::{AppState, RpcServer};
use vpower_utils::{init_logging, LogFormat};

use crate::config::ServiceConfig;

#[derive(Parser)]
#[command(name = "vpower-daemon", about = "Voting power statistics HTTP service")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "VPOWER_CONFIG")]
    config: Option<PathBuf>,

    /// Address the HTTP API binds to.
    #[arg(long, env = "VPOWER_LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// HTTP API port.
    #[arg(long, env = "VPOWER_PORT")]
    port: Option<u16>,

    /// Base URL of the search index.
    #[arg(long, env = "VPOWER_INDEX_URL")]
    index_url: Option<String>,

    /// Index holding voting-statistics documents.
    #[arg(long, env = "VPOWER_VOTING_INDEX")]
    voting_index: Option<String>,

    /// Divisor applied to raw stake.
    #[arg(long, env = "VPOWER_STAKE_SCALE")]
    stake_scale: Option<u64>,

    /// Upper bound for the `datapoints` parameter.
    #[arg(long, env = "VPOWER_MAX_DATAPOINTS")]
    max_datapoints: Option<usize>,

    /// Subjects kept in the result cache (0 = unbounded).
    #[arg(long, env = "VPOWER_CACHE_CAPACITY")]
    cache_capacity: Option<usize>,

    /// Window fetches in flight per request.
    #[arg(long, env = "VPOWER_FETCH_CONCURRENCY")]
    fetch_concurrency: Option<usize>,

    /// Retries per failed window fetch.
    #[arg(long, env = "VPOWER_FETCH_RETRIES")]
    fetch_retries: Option<u32>,

    /// Disable permissive CORS headers.
    #[arg(long, env = "VPOWER_DISABLE_CORS")]
    disable_cors: bool,

    /// Log format: "human" or "json".
    #[arg(long, env = "VPOWER_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "VPOWER_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Override file settings with whatever was given on the command line.
    fn apply(self, config: &mut ServiceConfig) {
        if let Some(v) = self.listen_addr {
            config.listen_addr = v;
        }
        if let Some(v) = self.port {
            config.port = v;
        }
        if let Some(v) = self.index_url {
            config.index_url = v;
        }
        if let Some(v) = self.voting_index {
            config.voting_index = v;
        }
        if let Some(v) = self.stake_scale {
            config.stake_scale = v;
        }
        if let Some(v) = self.max_datapoints {
            config.max_datapoints = v;
        }
        if let Some(v) = self.cache_capacity {
            config.cache_capacity = v;
        }
        if let Some(v) = self.fetch_concurrency {
            config.fetch_concurrency = v;
        }
        if let Some(v) = self.fetch_retries {
            config.fetch_retries = v;
        }
        if self.disable_cors {
            config.enable_cors = false;
        }
        if let Some(v) = self.log_format {
            config.log_format = v;
        }
        if let Some(v) = self.log_level {
            config.log_level = v;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();

    let mut config = match cli.config.take() {
        Some(path) => ServiceConfig::from_toml_file(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    cli.apply(&mut config);

    init_logging(config.log_format, &config.log_level);

    let engine_config = config.engine_config()?;
    let addr = config.listen_socket()?;
    info!(
        index = %config.index_url,
        voting_index = %config.voting_index,
        stake_scale = config.stake_scale,
        cache_capacity = config.cache_capacity,
        fetch_concurrency = engine_config.fetch.concurrency,
        fetch_retries = engine_config.fetch.retries,
        "starting vpower daemon"
    );

    let source = IndexClient::new(config.index_settings());
    let engine = Arc::new(PowerEngine::new(source, engine_config));
    let state = AppState::new(engine, config.query_limits());

    RpcServer::new(addr)
        .with_cors(config.enable_cors)
        .serve(state)
        .await?;
    Ok(())
}
