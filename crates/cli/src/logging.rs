use anyhow::Result;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use todo_core::tracing::{InstrumentationConfig, init::init_tracing};
use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging for the CLI
///
/// Logs go to stderr and, unless disabled, to `<data_dir>/cli.log`.
/// Without the file log, `TODO_LOG_JSON` switches stderr to JSON lines.
pub fn init_logging(log_level: Level, data_dir: &Path, no_file_log: bool) -> Result<()> {
    if no_file_log {
        let config = InstrumentationConfig {
            log_level: filter_directives(log_level),
            ..InstrumentationConfig::from_env()
        };
        return init_tracing(&config);
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(log_level)));

    std::fs::create_dir_all(data_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join("cli.log"))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(log_file))
                .with_ansi(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .init();

    Ok(())
}

fn filter_directives(level: Level) -> String {
    let level_str = level.as_str().to_lowercase();
    format!("todo={level_str},todo_http={level_str},todo_core={level_str}")
}
