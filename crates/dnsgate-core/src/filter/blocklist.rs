//! Immutable blocklist snapshot and label-boundary matching

use super::normalize::{normalize, validate, EntryError};
use std::collections::HashSet;
use tracing::debug;

/// A raw entry that was skipped while building a blocklist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    /// The entry as supplied
    pub raw: String,
    /// Why it was skipped
    pub reason: EntryError,
}

/// Outcome of building a blocklist from raw entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Distinct domains stored
    pub accepted: usize,
    /// Entries that normalized to an already stored domain
    pub duplicates: usize,
    /// Entries that were skipped
    pub rejected: Vec<RejectedEntry>,
}

/// Set of normalized domains whose lookups are denied
///
/// Never mutated once built; updates replace the whole snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockList {
    domains: HashSet<String>,
}

impl BlockList {
    /// Create an empty blocklist
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize and validate raw entries, skipping unusable ones
    pub fn build<I, S>(entries: I) -> (Self, BuildReport)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut domains = HashSet::new();
        let mut report = BuildReport::default();

        for entry in entries {
            let raw = entry.as_ref();
            let domain = normalize(raw);
            if let Err(reason) = validate(&domain) {
                debug!(entry = raw, %reason, "Skipping blocklist entry");
                report.rejected.push(RejectedEntry {
                    raw: raw.to_string(),
                    reason,
                });
                continue;
            }
            if domains.insert(domain) {
                report.accepted += 1;
            } else {
                report.duplicates += 1;
            }
        }

        (Self { domains }, report)
    }

    /// Build from raw entries, discarding the report
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::build(entries).0
    }

    /// Check if a queried domain is blocked
    ///
    /// Matches an entry exactly or as a parent domain on a label boundary:
    /// `ads.example.com` matches `example.com`, `notexample.com` does not.
    pub fn is_blocked(&self, domain: &str) -> bool {
        self.matching_entry(domain).is_some()
    }

    /// The entry that blocks `domain`, if any
    pub fn matching_entry(&self, domain: &str) -> Option<&str> {
        if self.domains.is_empty() || domain.is_empty() {
            return None;
        }

        let domain = domain.to_ascii_lowercase();
        let mut current = domain.as_str();
        loop {
            if let Some(entry) = self.domains.get(current) {
                return Some(entry.as_str());
            }
            match current.find('.') {
                Some(pos) => current = &current[pos + 1..],
                None => return None,
            }
        }
    }

    /// Check if a normalized domain is stored as-is
    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(domain)
    }

    /// Number of stored domains
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Check if the blocklist is empty
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// All stored domains, sorted
    pub fn domains(&self) -> Vec<&str> {
        let mut result: Vec<&str> = self.domains.iter().map(String::as_str).collect();
        result.sort_unstable();
        result
    }
}

/// Check `domain` against `blocklist`
pub fn is_blocked(domain: &str, blocklist: &BlockList) -> bool {
    blocklist.is_blocked(domain)
}
