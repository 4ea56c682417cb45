//! CLI commands

pub mod check;
pub mod config;
pub mod inspect;
pub mod run;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use dnsgate_core::config::FilterConfig;
use dnsgate_core::filter::{ListFile, SourceSet, StaticList};
use dnsgate_core::{BlockList, BlocklistSource, BuildReport, FailurePolicy};
use std::path::PathBuf;
use tracing::warn;

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Filter DNS queries on a tunnel descriptor (main command)
    Run(run::RunArgs),

    /// Check domains against the blocklist
    Check(check::CheckArgs),

    /// Decode a raw packet and show the filter verdict
    Inspect(inspect::InspectArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

/// Blocklist options shared by commands that build a blocklist
#[derive(Args, Debug, Default)]
pub struct BlocklistArgs {
    /// Blocklist file (plain, hosts format, or JSON array); repeatable
    #[arg(short = 'b', long = "blocklist", value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Domain or URL to block; repeatable
    #[arg(short = 'd', long = "domain", value_name = "DOMAIN")]
    pub domains: Vec<String>,

    /// Drop packets that look like DNS but cannot be classified
    #[arg(long)]
    pub fail_closed: bool,
}

impl BlocklistArgs {
    /// Merge command-line entries into the filter configuration
    pub fn apply(&self, filter: &mut FilterConfig) {
        filter.domains.extend(self.domains.iter().cloned());
        filter
            .files
            .extend(self.files.iter().map(|p| p.display().to_string()));
        if self.fail_closed {
            filter.failure_policy = FailurePolicy::FailClosed;
        }
    }
}

/// Combine inline domains and list files into one source
pub fn build_source(filter: &FilterConfig) -> SourceSet {
    let mut sources = SourceSet::new();
    if !filter.domains.is_empty() {
        sources.push(StaticList::new(filter.domains.iter().cloned()));
    }
    for file in &filter.files {
        sources.push(ListFile::new(file));
    }
    sources
}

/// Load every source and build a blocklist, warning about skipped entries
pub fn load_blocklist(filter: &FilterConfig) -> Result<(BlockList, BuildReport)> {
    let source = build_source(filter);
    let entries = source
        .load()
        .with_context(|| format!("Failed to load blocklist from {}", source.name()))?;

    let (blocklist, report) = BlockList::build(entries);
    for rejected in &report.rejected {
        warn!(entry = %rejected.raw, reason = %rejected.reason, "Skipped blocklist entry");
    }
    Ok((blocklist, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_merges_entries() {
        let args = BlocklistArgs {
            files: vec![PathBuf::from("extra.txt")],
            domains: vec!["ads.example.com".to_string()],
            fail_closed: true,
        };
        let mut filter = FilterConfig {
            domains: vec!["tracker.net".to_string()],
            ..FilterConfig::default()
        };
        args.apply(&mut filter);

        assert_eq!(filter.domains, vec!["tracker.net", "ads.example.com"]);
        assert_eq!(filter.files, vec!["extra.txt"]);
        assert_eq!(filter.failure_policy, FailurePolicy::FailClosed);
        assert_eq!(build_source(&filter).len(), 2);
    }

    #[test]
    fn test_load_blocklist_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts");
        std::fs::write(&path, "# ads\n0.0.0.0 ads.example.com\nhttps://www.tracker.net/x\n").unwrap();

        let filter = FilterConfig {
            files: vec![path.display().to_string()],
            ..FilterConfig::default()
        };
        let (blocklist, report) = load_blocklist(&filter).unwrap();
        assert_eq!(report.accepted, 2);
        assert!(blocklist.is_blocked("x.ads.example.com"));
        assert!(blocklist.is_blocked("tracker.net"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let filter = FilterConfig {
            files: vec!["/nonexistent/dnsgate/list.txt".to_string()],
            ..FilterConfig::default()
        };
        assert!(load_blocklist(&filter).is_err());
    }
}
