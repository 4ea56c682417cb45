//! Config command - configuration management

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use dnsgate_core::Config;
use std::path::PathBuf;
use tracing::info;

/// File name looked up in the working directory
const LOCAL_CONFIG: &str = "dnsgate.toml";

/// Config command arguments
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Config file to show (default: detect)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Write a configuration file with all defaults
    Init {
        /// Output file path
        #[arg(short, long, default_value = LOCAL_CONFIG)]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Config file to validate
        file: PathBuf,
    },

    /// Show config file locations
    Paths,
}

/// Execute config command
///
/// `config` is the `--config` path given on the command line, if any.
pub fn execute(args: ConfigArgs, config: Option<PathBuf>) -> Result<()> {
    match args.action {
        ConfigAction::Show { file } => show_config(file.or(config)),
        ConfigAction::Init { output, force } => init_config(output, force),
        ConfigAction::Validate { file } => validate_config(file),
        ConfigAction::Paths => show_paths(),
    }
}

fn show_config(file: Option<PathBuf>) -> Result<()> {
    let config = match file.or_else(find_config_file) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    let toml_str = toml::to_string_pretty(&config).context("Failed to serialize config")?;
    println!("{}", toml_str);
    Ok(())
}

fn init_config(output: PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }

    let toml_str = Config::default()
        .to_toml()
        .context("Failed to serialize config")?;
    let content = format!(
        "# dnsgate configuration\n\
         # Every key is optional; missing keys take the values shown here.\n\n\
         {}",
        toml_str
    );

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&output, content)
        .with_context(|| format!("Failed to write config to {}", output.display()))?;

    info!(path = %output.display(), "Generated config file");
    println!("Configuration file generated: {}", output.display());
    Ok(())
}

fn validate_config(file: PathBuf) -> Result<()> {
    let config = Config::load(&file)
        .with_context(|| format!("Failed to load config from {}", file.display()))?;

    config.validate().context("Configuration validation failed")?;
    let routes = config.tunnel.parsed_routes()?;

    println!("✓ Configuration is valid");
    println!("  Address:        {}/{}", config.tunnel.address, config.tunnel.prefix_len);
    println!("  DNS server:     {}", config.tunnel.dns_server);
    println!("  Routes:         {}", routes.len());
    println!("  Inline domains: {}", config.filter.domains.len());
    println!("  List files:     {}", config.filter.files.len());
    println!("  Failure policy: {:?}", config.filter.failure_policy);

    Ok(())
}

fn show_paths() -> Result<()> {
    println!("Configuration file search paths:");
    println!();
    println!("  1. ./{}", LOCAL_CONFIG);
    if let Some(path) = user_config_path() {
        println!("  2. {}", path.display());
    }
    println!();
    println!("Override with --config <FILE> or DNSGATE_CONFIG.");
    Ok(())
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "dnsgate").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// First existing config file in the search path
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Some(local);
    }
    user_config_path().filter(|path| path.exists())
}
