//! Check command - test domains against the blocklist

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use dnsgate_core::{BlockList, Config};
use serde::Serialize;

use super::{load_blocklist, BlocklistArgs};

/// Check command arguments
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Domains (or URLs) to check
    #[arg(required = true, value_name = "DOMAIN")]
    pub targets: Vec<String>,

    #[command(flatten)]
    pub blocklist: BlocklistArgs,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Verdict for one checked domain
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CheckResult {
    /// Domain as looked up
    pub domain: String,
    /// Whether a query for it would be dropped
    pub blocked: bool,
    /// Blocklist entry that matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
}

/// Execute the check command
pub fn execute(args: CheckArgs, mut config: Config) -> Result<()> {
    args.blocklist.apply(&mut config.filter);
    let (blocklist, _) = load_blocklist(&config.filter)?;
    let results = check(&blocklist, &args.targets);

    if args.json {
        let json = serde_json::to_string_pretty(&results).context("Failed to serialize results")?;
        println!("{}", json);
        return Ok(());
    }

    for result in &results {
        match &result.matched {
            Some(entry) => println!(
                "{} {} {}",
                "BLOCKED".red().bold(),
                result.domain,
                format!("(matches {})", entry).dimmed()
            ),
            None => println!("{} {}", "allowed".green(), result.domain),
        }
    }
    Ok(())
}

/// Check targets the way the filter sees queried names
///
/// Targets may be URLs; they are reduced to their host first.
pub fn check(blocklist: &BlockList, targets: &[String]) -> Vec<CheckResult> {
    targets
        .iter()
        .map(|target| {
            let domain = dnsgate_core::normalize(target);
            let matched = blocklist.matching_entry(&domain).map(str::to_string);
            CheckResult {
                blocked: matched.is_some(),
                domain,
                matched,
            }
        })
        .collect()
}
