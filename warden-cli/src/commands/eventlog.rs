//! `warden eventlog`: source registration and record inspection.

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use clap::{Args, Subcommand};
use colored::Colorize;

use warden_core::config;
use warden_eventlog::{install_source, read_records, store::manifest_path, EventRecord, Severity};

#[derive(Subcommand, Debug)]
pub enum EventLogCommand {
    /// Register the configured service name as an event source.
    Install,
    /// Print the most recent records.
    Tail(TailArgs),
}

#[derive(Args, Debug)]
pub struct TailArgs {
    /// Number of trailing records to show.
    #[arg(long, default_value_t = 50)]
    pub lines: usize,

    /// Emit one JSON record per line.
    #[arg(long)]
    pub json: bool,
}

pub fn run(command: EventLogCommand) -> Result<()> {
    let home = super::home()?;
    let config = config::load_at(&home).context("failed to load config")?;
    let root = config.eventlog_root_at(&home);
    let name = config.service_name.as_str();

    match command {
        EventLogCommand::Install => {
            install_source(&root, name, &Severity::ALL)
                .with_context(|| format!("failed to install event source '{name}'"))?;
            println!(
                "installed event source '{name}': {}",
                manifest_path(&root, name).display()
            );
        }
        EventLogCommand::Tail(args) => {
            let records = read_records(&root, name, args.lines)
                .with_context(|| format!("failed to read event log '{name}'"))?;
            if records.is_empty() && !args.json {
                println!("no records for '{name}'");
            }
            for record in &records {
                if args.json {
                    println!(
                        "{}",
                        serde_json::to_string(record).context("failed to render record JSON")?
                    );
                } else {
                    println!("{}", format_record(record));
                }
            }
        }
    }
    Ok(())
}

fn format_record(record: &EventRecord) -> String {
    let severity = match record.severity {
        Severity::Info => "info".green(),
        Severity::Warning => "warning".yellow(),
        Severity::Error => "error".red().bold(),
    };
    format!(
        "{} {:<7} [{}] {}",
        record
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Secs, true)
            .dimmed(),
        severity,
        record.event_id,
        record.message
    )
}
