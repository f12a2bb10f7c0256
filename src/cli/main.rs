//! `archive-stats` command-line entry point

mod args;
mod commands;
mod error;
mod output;

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use archive_stats::AppConfig;
use archive_stats::logging::init_tracing;

use args::{Cli, resolve_selection};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return ExitCode::FAILURE;
        }
    };
    if cli.start_date.is_some() {
        config.start_date = cli.start_date;
    }

    if let Err(e) = init_tracing(&config.log) {
        eprintln!("Warning: {e}");
    }

    info!("=== Bangumi archive statistics ===");
    match config.start_date {
        Some(start) => info!(start_date = %start, "Backfill mode"),
        None => info!(data_date = ?config.data_date, "Single-pass mode"),
    }

    let selection = match resolve_selection(cli.target.as_deref(), cli.limit.as_deref()) {
        Ok(selection) => selection,
        Err(e) => {
            error!(error = %e, "Invalid arguments");
            eprintln!("{}", e.user_message());
            return ExitCode::FAILURE;
        }
    };

    let result = match config.start_date {
        Some(start) => commands::handle_backfill(&config, &selection, start),
        None => commands::handle_single_pass(&config, &selection),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "Run failed");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}
