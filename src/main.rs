mod cli;
mod commands;
mod config;
mod constants;
mod dists;
mod ui;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use config::Settings;
use log::debug;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .format_timestamp(None)
        .init();

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            ui::error(&format!("{:#}", err));
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let settings = Settings::load(&cli.overrides()).context("Failed to load configuration")?;
    debug!("Gradle user home: {}", settings.gradle_user_home.display());

    match cli.command {
        Commands::Sync { .. } => {
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ui::warning("Interrupted, finishing in-flight work...");
                    on_interrupt.cancel();
                }
            });
            commands::sync::sync_distributions(&settings, cancel).await
        }
        Commands::Status { json, .. } => commands::status::show_status(&settings, json).await,
        Commands::Locate {
            version,
            classifier,
            ..
        } => commands::locate::locate_distribution(&settings, &version, classifier).await,
    }
}
