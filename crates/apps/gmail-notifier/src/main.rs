//! gmail-notifier - push a notification for each new Gmail search match
//!
//! This is the main entry point: logging and configuration setup, then one
//! subcommand.

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use notifier::NotifierConfig;

mod cli;
mod commands;

use cli::{Cli, Command};

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let config = match NotifierConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    match &cli.command {
        Command::Run(trigger) => {
            let report = commands::run(&config, trigger)?;
            if !report.is_clean() {
                info!(
                    "{} notification(s) will be retried next cycle",
                    report.failures.len()
                );
            }
        }
        Command::Watch { trigger, interval } => commands::watch(&config, trigger, *interval)?,
        Command::SetQuery { email, query } => commands::set_query(&config, email, query)?,
        Command::Show { email } => commands::show(&config, email)?,
        Command::ResetWatermark { email } => commands::reset_watermark(&config, email)?,
        Command::AuthUrl { email, open } => commands::auth_url(&config, email, *open)?,
        Command::Authorize { email, code } => commands::authorize(&config, email, code)?,
    }

    Ok(())
}
