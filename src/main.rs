use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use petrod::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "petrod=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            artifacts,
            port,
            host,
            metrics_url,
        } => {
            petrod::cli::serve(artifacts, port, host, metrics_url).await?;
        }
        Commands::Predict { artifacts, input } => {
            petrod::cli::predict(artifacts, input).await?;
        }
        Commands::Prepare {
            data,
            artifacts,
            config,
            init_model,
        } => {
            petrod::cli::prepare(data, artifacts, config, init_model).await?;
        }
        Commands::Info { artifacts } => {
            petrod::cli::info(artifacts).await?;
        }
    }

    Ok(())
}
