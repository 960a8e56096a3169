//! Warden: run a background worker under a host-controlled service lifecycle.
//!
//! # Usage
//!
//! ```text
//! warden init --command <program> [args...]
//! warden run
//! warden service
//! warden eventlog install
//! warden eventlog tail [--lines N] [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{eventlog::EventLogCommand, init::InitArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "warden",
    version,
    about = "Run a background worker as a host-controlled service",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default config at ~/.warden/config.yaml.
    Init(InitArgs),

    /// Run the worker in the foreground until Ctrl-C.
    Run,

    /// Serve a host: JSON control requests on stdin, status reports on stdout.
    Service,

    /// Manage the service's event log.
    Eventlog {
        #[command(subcommand)]
        command: EventLogCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Run => commands::service::run_foreground(),
        Commands::Service => commands::service::run_hosted(),
        Commands::Eventlog { command } => commands::eventlog::run(command),
    }
}
