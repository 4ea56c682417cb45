//! dnsgate CLI
//!
//! Command-line front end for the DNS blocklist filter.

mod args;
mod commands;
mod logging;

use anyhow::Result;
use clap::Parser;
use dnsgate_core::Config;
use tracing::error;

use args::Args;
use commands::Command;

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Config subcommands inspect files themselves and must work with a broken one
    let config = match args.command {
        Command::Config(_) => Config::default(),
        _ => args.load_config()?,
    };

    // Initialize logging
    logging::init(&args, &config.logging)?;

    let result = run(args, config);

    if let Err(ref e) = result {
        error!("Fatal error: {:#}", e);
    }

    result
}

fn run(args: Args, config: Config) -> Result<()> {
    match args.command {
        Command::Run(run_args) => {
            if !args.quiet {
                print_banner();
            }
            commands::run::execute(run_args, config)
        }
        Command::Check(check_args) => commands::check::execute(check_args, config),
        Command::Inspect(inspect_args) => commands::inspect::execute(inspect_args, config),
        Command::Config(config_args) => commands::config::execute(config_args, args.config),
    }
}

fn print_banner() {
    use colored::Colorize;

    eprintln!();
    eprintln!(
        "{} {}",
        "dnsgate".green().bold(),
        env!("CARGO_PKG_VERSION").dimmed()
    );
    eprintln!("{}", "DNS blocklist filter".white());
    eprintln!();
}
