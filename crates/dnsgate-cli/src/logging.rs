//! Logging initialization

use anyhow::{Context, Result};
use dnsgate_core::config::LoggingConfig;
use std::fs::File;
use std::io;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::args::{Args, LogFormat};

/// Initialize logging from CLI arguments, falling back to the config file
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init(args: &Args, config: &LoggingConfig) -> Result<()> {
    let level = level(args, config)?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let format = if args.log_format == LogFormat::Text && config.json_format {
        LogFormat::Json
    } else {
        args.log_format
    };

    let file = match args.log_file.as_ref().or(config.file.as_ref()) {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path))?;
            Some(Arc::new(file))
        }
        None => None,
    };

    match format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(args.verbose >= 2)
                        .with_thread_names(args.verbose >= 2)
                        .with_file(args.verbose >= 3)
                        .with_line_number(args.verbose >= 3),
                )
                .with(file.map(|file| fmt::layer().with_ansi(false).with_writer(file)))
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .with(file.map(|file| fmt::layer().json().with_writer(file)))
                .init();
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact().with_writer(io::stderr))
                .with(file.map(|file| fmt::layer().compact().with_ansi(false).with_writer(file)))
                .init();
        }
    }

    Ok(())
}

fn level(args: &Args, config: &LoggingConfig) -> Result<LevelFilter> {
    if args.quiet {
        return Ok(LevelFilter::ERROR);
    }
    match args.verbose {
        0 => config
            .level
            .parse()
            .with_context(|| format!("Invalid log level in config: {}", config.level)),
        1 => Ok(LevelFilter::DEBUG),
        _ => Ok(LevelFilter::TRACE),
    }
}
