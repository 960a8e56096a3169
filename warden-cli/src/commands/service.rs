//! `warden run` and `warden service`.

use anyhow::{Context, Result};

use warden_daemon::{start_blocking, RunMode};

pub fn run_foreground() -> Result<()> {
    let home = super::home()?;
    start_blocking(&home, RunMode::Interactive).context("worker exited with error")
}

pub fn run_hosted() -> Result<()> {
    let home = super::home()?;
    start_blocking(&home, RunMode::Service).context("service exited with error")
}
