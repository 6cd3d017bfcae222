//! CLI command handlers
//!
//! Each subcommand has its own module with handler functions.

pub mod config;
pub mod nearest;
pub mod serve;
pub mod status;
pub mod suggest;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Find parking spots near a location
#[derive(Parser)]
#[command(name = "spotfinder")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for parking near a point, an address, or your IP location
    Nearest(nearest::NearestArgs),

    /// Show address suggestions for partial input
    Suggest(suggest::SuggestArgs),

    /// Start web server (foreground)
    Serve(serve::ServeArgs),

    /// Manage configuration
    Config(config::ConfigArgs),

    /// Show backend and server status
    Status(status::StatusArgs),
}

/// Run the CLI
pub async fn run() -> crate::error::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Nearest(args) => {
            init_logging("warn");
            nearest::run(args).await
        }
        Commands::Suggest(args) => {
            init_logging("warn");
            suggest::run(args).await
        }
        Commands::Serve(args) => {
            init_logging("info");
            serve::run(args).await
        }
        Commands::Config(args) => config::run(args),
        Commands::Status(args) => status::run(args).await,
    }
}

/// Install the tracing subscriber; `RUST_LOG` overrides the default level
fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
