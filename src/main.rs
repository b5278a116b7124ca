//! realtime-sync binary entry point

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "realtime_sync=info".into());
    if cli.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }

    match cli.command {
        Commands::Watch { target } => {
            let config = cli::load_config(cli.config.as_ref(), target)?;
            cli::watch(config).await?;
        }
        Commands::Resolve { target } => {
            let config = cli::load_config(cli.config.as_ref(), target)?;
            cli::resolve(&config)?;
        }
    }

    Ok(())
}
