//! dvagent CLI: the main entry point.
//!
//! Commands:
//! - `serve`   - Start the HTTP gateway
//! - `ask`     - Run one agent turn locally and print the trace outline
//! - `doctor`  - Check configuration and Dataverse connectivity
//! - `init`    - Write a default config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "dvagent",
    about = "dvagent: a tool-calling Dataverse agent with execution tracing",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.dvagent/config.toml)
    #[arg(short, long, global = true, env = "DVAGENT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask the agent a single question
    Ask {
        /// The question
        #[arg(short, long)]
        message: String,

        /// Override the model / serving endpoint
        #[arg(long)]
        model: Option<String>,
    },

    /// Diagnose configuration and connectivity
    Doctor,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Ask { message, model } => commands::ask::run(config_path, message, model).await?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
        Commands::Init { force } => commands::init::run(config_path, force)?,
    }

    Ok(())
}
