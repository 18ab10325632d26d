// quorum-node/src/main.rs
use clap::{Parser, Subcommand};
use quorum_node::Config;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "quorum-node")]
#[command(about = "Demo daemon for the checkpoint and service-node-state vote handler", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulated daemon loop
    Run {
        /// Configuration file path
        #[arg(short, long, default_value = "./config.toml")]
        config: String,

        /// Stop after this many simulated blocks (runs forever if omitted)
        #[arg(short, long)]
        ticks: Option<u64>,
    },

    /// Write a default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "./config.toml")]
        path: String,
    },

    /// Print the resolved configuration
    Inspect {
        /// Configuration file path
        #[arg(short, long, default_value = "./config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}={}", env!("CARGO_PKG_NAME"), log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Run { config, ticks } => run(&config, ticks).await?,
        Commands::Init { path } => init(&path)?,
        Commands::Inspect { config } => inspect(&config)?,
    }

    Ok(())
}

async fn run(config_path: &str, ticks: Option<u64>) -> anyhow::Result<()> {
    tracing::info!("Loading configuration from {}", config_path);
    let config = Config::from_file(config_path)?;

    let daemon = Arc::new(quorum_node::Daemon::new(config));

    match ticks {
        Some(_) => daemon.run(ticks).await?,
        None => {
            tokio::select! {
                result = daemon.run(None) => result?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received shutdown signal");
                }
            }
        }
    }

    Ok(())
}

fn init(path: &str) -> anyhow::Result<()> {
    let config = Config::default();
    config.to_file(path)?;
    tracing::info!("Wrote default configuration to {}", path);
    Ok(())
}

fn inspect(config_path: &str) -> anyhow::Result<()> {
    let config = Config::from_file(config_path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
