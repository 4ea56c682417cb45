//! Command-line argument parsing

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dnsgate_core::Config;
use std::path::PathBuf;

use crate::commands::{self, Command};

/// dnsgate - DNS blocklist filter behind a virtual tunnel
///
/// Reads IP packets from a host-provided tunnel, drops DNS queries for
/// blocklisted domains and writes everything else back unchanged.
#[derive(Parser, Debug)]
#[command(name = "dnsgate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE", global = true, env = "DNSGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format for logs
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Log file path
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<String>,

    /// Run in quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// Compact format
    Compact,
}

impl Args {
    /// Load the configuration named by `--config`, a discovered file, or defaults
    pub fn load_config(&self) -> Result<Config> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => match commands::config::find_config_file() {
                Some(path) => path,
                None => return Ok(Config::default()),
            },
        };

        Config::load(&path).with_context(|| format!("Failed to load config from {}", path.display()))
    }
}
