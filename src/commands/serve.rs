//! `geoshort serve`: run the lookup service

use std::path::PathBuf;

use anyhow::{Context, Result};
use geoshort::config::Config;
use geoshort::service::{CosmosSettings, LookupServer};

/// Parameters of the serve command
#[derive(Debug, Default)]
pub struct ServeParams {
    pub bind: Option<String>,
    pub memory_seed: Option<PathBuf>,
}

pub async fn serve(mut config: Config, params: ServeParams) -> Result<()> {
    if let Some(bind) = params.bind {
        config.service.bind_address = bind
            .parse()
            .with_context(|| format!("Invalid bind address: {bind}"))?;
    }
    if let Some(seed) = params.memory_seed {
        config.service.memory_seed = Some(seed);
    }

    let cosmos = CosmosSettings::from_env().context("Invalid database environment")?;
    if let Some(settings) = &cosmos {
        tracing::info!(
            database = %settings.database,
            collection = %settings.collection,
            location = ?settings.location,
            "Using Cosmos store"
        );
    }

    let server =
        LookupServer::new(config.service, cosmos).context("Failed to create lookup server")?;

    println!("{}", server.info().display());
    println!();

    server
        .start_with_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                }
                Err(e) => {
                    tracing::error!("Failed to wait for Ctrl+C: {}", e);
                }
            }
        })
        .await?;

    Ok(())
}
