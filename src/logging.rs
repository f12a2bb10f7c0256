//! Tracing subscriber setup

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::LogConfig;

/// Install the global subscriber
///
/// Console output always goes to stdout. When `config.file` is set, the same
/// events are appended to that file without ANSI colours; if the file cannot
/// be opened the console layer is still installed and a warning is logged.
/// `RUST_LOG` takes precedence over `config.level`.
pub fn init_tracing(config: &LogConfig) -> Result<(), anyhow::Error> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let console = fmt::layer().with_target(true).with_line_number(true);

    let mut open_error = None;
    let file_layer = match &config.file {
        Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file))
                    .boxed(),
            ),
            Err(e) => {
                open_error = Some((path.clone(), e));
                None
            }
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))?;

    if let Some((path, e)) = open_error {
        warn!(file = %path.display(), error = %e, "Log file unavailable, logging to stdout only");
    }
    Ok(())
}
