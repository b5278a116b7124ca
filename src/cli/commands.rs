use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use realtime_sync::cache::{CacheOp, InMemoryCache, QueryCache};
use realtime_sync::connection::{connection_url, resolve_base};
use realtime_sync::error::CacheError;
use realtime_sync::types::CacheKey;
use realtime_sync::{RealtimeSession, SyncConfig};

#[derive(Parser)]
#[command(name = "realtime-sync")]
#[command(about = "Keep a query cache in sync with a realtime event stream")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Watch a project environment and log cache operations
    realtime-sync watch --project P1 --env-id 3 --api-url https://api.example.com

    # Use a config file, token from the environment
    REALTIME_TOKEN=secret realtime-sync --config realtime.json watch

    # Print the WebSocket URL that would be used
    realtime-sync resolve --ws-url localhost:8080 --project P1 --env-id 3
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect and log every cache operation until Ctrl-C
    Watch {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Print the resolved connection URL
    Resolve {
        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Overrides applied on top of the config file and environment
#[derive(Args, Debug, Default)]
pub struct TargetArgs {
    /// Project id
    #[arg(long)]
    pub project: Option<String>,

    /// Numeric environment id
    #[arg(long)]
    pub env_id: Option<u64>,

    /// WebSocket base (ws, wss, http, https or host:port)
    #[arg(long)]
    pub ws_url: Option<String>,

    /// REST API base URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Bearer token
    #[arg(long)]
    pub token: Option<String>,
}

impl TargetArgs {
    fn apply(self, config: &mut SyncConfig) {
        if let Some(project) = self.project {
            config.project_id = project;
        }
        if let Some(env_id) = self.env_id {
            config.env_id = env_id;
        }
        if let Some(ws_url) = self.ws_url {
            config.ws_url = Some(ws_url);
        }
        if let Some(api_url) = self.api_url {
            config.api_url = Some(api_url);
        }
        if let Some(token) = self.token {
            config.token = Some(token);
        }
    }
}

/// Config file, then environment, then command line flags
pub fn load_config(path: Option<&PathBuf>, target: TargetArgs) -> anyhow::Result<SyncConfig> {
    let mut config = SyncConfig::load(path.map(PathBuf::as_path))
        .context("Failed to load realtime config")?;
    target.apply(&mut config);
    config.validate()?;
    Ok(config)
}

/// Cache wrapper that logs each operation before applying it
struct LoggingCache {
    inner: InMemoryCache,
}

impl QueryCache for LoggingCache {
    fn invalidate(&self, key: &CacheKey) -> Result<(), CacheError> {
        info!(op = %CacheOp::Invalidate(key.clone()), "cache");
        self.inner.invalidate(key)
    }

    fn refetch(&self, key: &CacheKey) -> Result<(), CacheError> {
        info!(op = %CacheOp::Refetch(key.clone()), "cache");
        self.inner.refetch(key)
    }
}

pub async fn watch(config: SyncConfig) -> anyhow::Result<()> {
    let (inner, mut refetches) = InMemoryCache::with_refetch_channel();
    // Operations are already logged here; the cache need not keep them
    let cache = Arc::new(LoggingCache {
        inner: inner.with_op_log(0),
    });

    // No fetch engine here; drain the queue so refetches never report Unavailable
    let drain = tokio::spawn(async move {
        while let Some(key) = refetches.recv().await {
            tracing::debug!(key = %key, "refetch requested");
        }
    });

    let session = RealtimeSession::builder(config)
        .cache(cache)
        .on_status(|status| info!(status = %status, "realtime status"))
        .build();
    session.start();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    session.shutdown().await;
    let stats = serde_json::to_string(&session.stats().snapshot())?;
    info!(%stats, "realtime session finished");
    drop(session);
    drain.abort();
    Ok(())
}

pub fn resolve(config: &SyncConfig) -> anyhow::Result<()> {
    let base = resolve_base(config);
    let url = connection_url(config);
    println!("{}", url);
    println!("  base:   {}", base.url);
    println!("  source: {}", base.source);
    Ok(())
}
