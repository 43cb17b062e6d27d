use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use proxim_config::ConfigLoader;
use proxim_core::{Result, Role};

#[derive(Parser)]
#[command(
    name = "proxim",
    version,
    about = "Collaborative positioning over an ad-hoc peer-to-peer mesh"
)]
pub struct Cli {
    /// Path to proxim.toml (default: ~/.proxim/proxim.toml).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log errors only.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Explicit log level (overridden by --verbose / --quiet).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as the mesh hub: listen for spokes and relay between them.
    Hub,
    /// Run as a spoke connected to the hub at the given address.
    Spoke {
        #[arg(value_name = "HUB_ADDR")]
        hub_addr: SocketAddr,
    },
    /// Print the resolved configuration.
    Config {
        /// Emit JSON instead of TOML.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        // Load config first so we can use it for log format
        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let config = config_loader.get();

        // Resolve log level: --verbose > --quiet > --log-level > config default
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            self.log_level.as_deref().unwrap_or(&config.logging.level)
        };

        // Initialize tracing with appropriate format
        if config.logging.format == "json" {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
                )
                .json()
                .with_target(true)
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
                )
                .with_target(false)
                .init();
        }

        match self.command {
            Commands::Hub => crate::session::run(config, Role::Hub, None).await,
            Commands::Spoke { hub_addr } => {
                crate::session::run(config, Role::Spoke, Some(hub_addr)).await
            }
            Commands::Config { json } => {
                if json {
                    println!("{}", serde_json::to_string_pretty(&config)?);
                } else {
                    let rendered = toml::to_string_pretty(&config)
                        .map_err(|e| proxim_core::ProximError::Config(e.to_string()))?;
                    println!("{rendered}");
                }
                Ok(())
            }
        }
    }
}
