//! Domain normalization and entry validation

use std::fmt;

/// Maximum length of a domain name in presentation form
pub const MAX_DOMAIN_LEN: usize = 253;

const MAX_LABEL_LEN: usize = 63;

/// Canonicalize a user-supplied domain or URL
///
/// Strips a leading `http://` or `https://` (any case), cuts at the first
/// `/` and then at the first `:`, drops a leading `www.` (exact case) and
/// lowercases the rest.
///
/// ```
/// use dnsgate_core::filter::normalize;
///
/// assert_eq!(normalize("https://www.Example.com/path:8080"), "example.com");
/// ```
pub fn normalize(raw: &str) -> String {
    let mut rest = raw.trim();

    for scheme in ["http://", "https://"] {
        if rest
            .get(..scheme.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(scheme))
        {
            rest = &rest[scheme.len()..];
            break;
        }
    }

    if let Some(pos) = rest.find('/') {
        rest = &rest[..pos];
    }
    if let Some(pos) = rest.find(':') {
        rest = &rest[..pos];
    }

    // Only a lowercase `www.` is dropped; `WWW.` survives as a label
    rest = rest.strip_prefix("www.").unwrap_or(rest);
    rest.to_lowercase()
}

/// Why a normalized entry cannot be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    /// Nothing left after normalization
    Empty,
    /// Longer than 253 bytes
    TooLong(usize),
    /// Contains an empty label (leading, trailing or doubled dot)
    EmptyLabel,
    /// A label is longer than 63 bytes
    LabelTooLong(String),
    /// Character outside `[a-z0-9-_.]`
    InvalidChar(char),
}

impl fmt::Display for EntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryError::Empty => write!(f, "empty domain"),
            EntryError::TooLong(len) => {
                write!(f, "domain is {len} bytes, limit is {MAX_DOMAIN_LEN}")
            }
            EntryError::EmptyLabel => write!(f, "empty label"),
            EntryError::LabelTooLong(label) => write!(f, "label '{label}' exceeds 63 bytes"),
            EntryError::InvalidChar(c) => write!(f, "invalid character {c:?}"),
        }
    }
}

impl std::error::Error for EntryError {}

/// Check that a normalized domain can be stored in a blocklist
pub fn validate(domain: &str) -> Result<(), EntryError> {
    if domain.is_empty() {
        return Err(EntryError::Empty);
    }
    if domain.len() > MAX_DOMAIN_LEN {
        return Err(EntryError::TooLong(domain.len()));
    }
    if let Some(c) = domain
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.')))
    {
        return Err(EntryError::InvalidChar(c));
    }
    for label in domain.split('.') {
        if label.is_empty() {
            return Err(EntryError::EmptyLabel);
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(EntryError::LabelTooLong(label.to_string()));
        }
    }
    Ok(())
}
