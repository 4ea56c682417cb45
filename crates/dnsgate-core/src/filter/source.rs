//! Blocklist sources
//!
//! The session pulls raw entries from a [`BlocklistSource`] whenever it
//! starts. Storage itself belongs to the hosting application; this module
//! only ships an in-memory list and a list file reader.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

/// Host names found in stock hosts files that are never worth blocking
const HOSTS_SYSTEM_NAMES: &[&str] = &[
    "localhost",
    "localhost.localdomain",
    "local",
    "broadcasthost",
    "ip6-localhost",
    "ip6-loopback",
    "0.0.0.0",
];

/// Supplies raw blocklist entries (domains or URLs)
#[cfg_attr(test, mockall::automock)]
pub trait BlocklistSource: Send + Sync {
    /// Human-readable name used in logs and errors
    fn name(&self) -> String;

    /// Load all raw entries
    fn load(&self) -> Result<Vec<String>>;

    /// Whether the backing data changed since the last `load`
    fn has_changed(&self) -> bool {
        false
    }
}

/// Fixed in-memory list of entries
#[derive(Debug, Clone, Default)]
pub struct StaticList {
    entries: Vec<String>,
}

impl StaticList {
    /// Create from raw entries
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }
}

impl BlocklistSource for StaticList {
    fn name(&self) -> String {
        "inline".to_string()
    }

    fn load(&self) -> Result<Vec<String>> {
        Ok(self.entries.clone())
    }
}

/// Blocklist stored in a file
///
/// Files ending in `.json` hold a JSON array of strings. Anything else is
/// read line by line; see [`parse_list`].
#[derive(Debug)]
pub struct ListFile {
    path: PathBuf,
    last_modified: Mutex<Option<SystemTime>>,
}

impl ListFile {
    /// Create a reader for `path`; nothing is read until `load`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_modified: Mutex::new(None),
        }
    }

    /// Path of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_json(&self) -> bool {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    }

    fn modified(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }
}

impl BlocklistSource for ListFile {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Vec<String>> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::blocklist_source(self.name(), e.to_string()))?;

        let entries = if self.is_json() {
            serde_json::from_str::<Vec<String>>(&content)
                .map_err(|e| Error::blocklist_source(self.name(), e.to_string()))?
        } else {
            parse_list(&content)
        };

        *self.last_modified.lock() = self.modified();
        info!(path = %self.path.display(), count = entries.len(), "Loaded blocklist file");
        Ok(entries)
    }

    fn has_changed(&self) -> bool {
        let Some(modified) = self.modified() else {
            return false;
        };
        let last = *self.last_modified.lock();
        let changed = last.map_or(true, |last| modified > last);
        if changed {
            debug!(path = %self.path.display(), "Blocklist file changed");
        }
        changed
    }
}

/// Several sources loaded as one
#[derive(Default)]
pub struct SourceSet {
    sources: Vec<Box<dyn BlocklistSource>>,
}

impl SourceSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source
    pub fn push<S: BlocklistSource + 'static>(&mut self, source: S) {
        self.sources.push(Box::new(source));
    }

    /// Builder-style `push`
    pub fn with<S: BlocklistSource + 'static>(mut self, source: S) -> Self {
        self.push(source);
        self
    }

    /// Number of sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl BlocklistSource for SourceSet {
    fn name(&self) -> String {
        let names: Vec<String> = self.sources.iter().map(|s| s.name()).collect();
        names.join(", ")
    }

    fn load(&self) -> Result<Vec<String>> {
        let mut entries = Vec::new();
        for source in &self.sources {
            entries.extend(source.load()?);
        }
        Ok(entries)
    }

    fn has_changed(&self) -> bool {
        self.sources.iter().any(|s| s.has_changed())
    }
}

/// Parse a line-oriented blocklist
///
/// Handles:
/// - plain entries, one per line (`example.com`, `https://example.com/x`)
/// - hosts-format lines (`0.0.0.0 ads.example.com`, `127.0.0.1 tracker.net`)
/// - `#` and `!` comments and blank lines
pub fn parse_list(content: &str) -> Vec<String> {
    let mut entries = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let mut fields = line.split_whitespace();
        let first = fields.next().unwrap_or_default();
        if first.parse::<IpAddr>().is_ok() {
            for host in fields.take_while(|f| !f.starts_with('#')) {
                if !HOSTS_SYSTEM_NAMES.contains(&host) {
                    entries.push(host.to_string());
                }
            }
        } else {
            entries.push(line.to_string());
        }
    }

    entries
}
