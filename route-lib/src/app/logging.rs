use std::{io::IsTerminal, sync::Once};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, Layer, filter::filter_fn, fmt::format::FmtSpan, prelude::*,
};

use crate::config::LogLevel;

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Silent => LevelFilter::OFF,
        }
    }
}

static SETUP_LOGGING: Once = Once::new();

/// Install the global subscriber. Later calls, or a subscriber installed by
/// the embedding application, leave the existing one in place.
pub fn setup_logging(level: LogLevel) {
    SETUP_LOGGING.call_once(|| {
        if let Err(e) = setup_logging_inner(level) {
            eprintln!("Failed to setup logging: {e}");
        }
    });
}

fn setup_logging_inner(level: LogLevel) -> anyhow::Result<()> {
    let default_log_level =
        format!("warn,route_lib={}", LevelFilter::from(level));
    let filter = EnvFilter::try_from_default_env()
        .inspect(|f| {
            eprintln!("using env log level: {f}");
        })
        .inspect_err(|_| {
            if let Ok(log_level) = std::env::var("RUST_LOG") {
                eprintln!("Failed to parse log level from environment: {log_level}");
                eprintln!("Using default log level: {default_log_level}");
            }
        })
        .unwrap_or(EnvFilter::new(default_log_level));

    let exclude = filter_fn(|metadata| !metadata.target().contains("tokio"));

    let log_stdout_layer = tracing_subscriber::fmt::Layer::new()
        .with_ansi(std::io::stdout().is_terminal())
        .compact()
        .with_target(cfg!(debug_assertions))
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stdout)
        .with_filter(exclude);

    let subscriber = tracing_subscriber::registry()
        .with(filter) // Global filter
        .with(log_stdout_layer);

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
