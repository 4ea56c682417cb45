//! Domain blocklist
//!
//! This module provides:
//! - Normalization of user-entered domains and URLs into bare domains
//! - Immutable [`BlockList`] snapshots with label-boundary suffix matching
//! - [`BlocklistSource`] implementations for inline lists and list files

mod blocklist;
mod normalize;
mod source;

pub use blocklist::{is_blocked, BlockList, BuildReport, RejectedEntry};
pub use normalize::{normalize, validate, EntryError, MAX_DOMAIN_LEN};
pub use source::{parse_list, BlocklistSource, ListFile, SourceSet, StaticList};

#[cfg(test)]
pub use source::MockBlocklistSource;
