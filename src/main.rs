use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{PlanParams, ServeParams};
use geoshort::config::LoggingConfig;

#[derive(Parser)]
#[command(
    name = "geoshort",
    version,
    about = "Multi-region URL shortener: infrastructure plan and lookup service",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides `[logging] format`
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Declare the multi-region deployment and print the plan
    Plan {
        /// Configuration file (TOML); environment variables otherwise
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Comma-separated regions, first is the write region
        #[arg(short, long)]
        locations: Option<String>,

        /// Stack name
        #[arg(short, long)]
        stack: Option<String>,

        /// Write the plan to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Serve key lookups
    Serve {
        /// Configuration file (TOML); environment variables otherwise
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Bind address, e.g. 0.0.0.0:8080
        #[arg(short, long)]
        bind: Option<String>,

        /// JSON array of documents to serve when no database is configured
        #[arg(long)]
        memory_seed: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.command {
        Commands::Plan { config, .. } | Commands::Serve { config, .. } => config.clone(),
    };
    let mut config = commands::load_config(config_path.as_deref())?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    // Initialize tracing/logging
    setup_tracing(&config.logging, cli.verbose)?;
    tracing::debug!(path = ?config_path, "Configuration loaded");

    match cli.command {
        Commands::Plan {
            locations,
            stack,
            output,
            ..
        } => {
            tracing::info!(
                locations = ?locations,
                stack = ?stack,
                output = ?output,
                "Starting plan command"
            );
            commands::plan(
                config,
                PlanParams {
                    locations,
                    stack,
                    output,
                },
            )?;
        }

        Commands::Serve { bind, memory_seed, .. } => {
            tracing::info!(
                bind = ?bind,
                memory_seed = ?memory_seed,
                "Starting serve command"
            );
            commands::serve(config, ServeParams { bind, memory_seed }).await?;
        }
    }

    Ok(())
}

fn setup_tracing(logging: &LoggingConfig, verbose: bool) -> Result<()> {
    let directive = logging.filter_directive(verbose);
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new(directive)
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directive))
    };

    match logging.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
