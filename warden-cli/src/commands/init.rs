//! `warden init --command <program> [args...]`

use anyhow::{Context, Result};
use clap::Args;

use warden_core::config;

/// Write a default service config.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Worker program followed by its arguments.
    #[arg(
        long,
        short = 'c',
        value_name = "PROGRAM",
        num_args = 1..,
        required = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let path = config::config_path_at(&home);
        let existed = path.exists();

        let config = config::init_at(&home, self.command)
            .with_context(|| format!("failed to initialize '{}'", path.display()))?;

        if existed {
            println!("config already exists: {}", path.display());
        } else {
            println!("✓ Wrote {}", path.display());
        }
        println!("  service: {}", config.service_name);
        println!("  worker:  {}", config.worker.command.join(" "));
        println!(
            "  eventlog: {}",
            config.eventlog_root_at(&home).display()
        );
        Ok(())
    }
}
