//! # Strand CLI
//!
//! ## Available Commands
//!
//! - `server` - Start the WebSocket server
//! - `status` - Show element counts of a snapshot
//! - `init` - Write an empty snapshot
//! - `export` - Export a snapshot as JSON

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use strand_core::StrandError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Strand - graph protocol server with template search and generation.
#[derive(Parser, Debug)]
#[command(name = "strand")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Snapshot file (overrides the configured one)
    #[arg(short = 'S', long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json_mode: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the WebSocket server
    Server {
        /// Host to bind to (overrides the configured one)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides the configured one)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show element counts of the snapshot
    Status,

    /// Write an empty snapshot
    Init {
        /// Overwrite an existing snapshot
        #[arg(short, long)]
        force: bool,
    },

    /// Export the snapshot as JSON
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

pub async fn execute(cli: Cli) -> Result<(), StrandError> {
    let mut config = crate::config::ServerConfig::load(cli.config.as_deref())?;
    if let Some(snapshot) = cli.snapshot {
        config.snapshot = Some(snapshot);
    }

    match cli.command {
        Some(Commands::Server { host, port }) => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            cmd_server(config).await
        }
        Some(Commands::Init { force }) => cmd_init(&snapshot_path(&config), force),
        Some(Commands::Export { output }) => cmd_export(&snapshot_path(&config), &output),
        Some(Commands::Status) | None => cmd_status(&snapshot_path(&config), cli.json_mode),
    }
}
