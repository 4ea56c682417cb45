//! # dnsgate Core
//!
//! Platform-independent core of an on-device DNS blocklist filter.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Packet parsing** - Bounds-checked IPv4, UDP and DNS-question views
//! - **Blocklist** - Domain normalization and label-boundary matching
//! - **Decision engine** - Per-packet allow/block verdicts with a failure policy
//! - **Session** - Tunnel lifecycle and the read/decide/write worker
//! - **Configuration** - TOML configuration with defaults
//!
//! ## Example
//!
//! ```rust,no_run
//! use dnsgate_core::filter::StaticList;
//! use dnsgate_core::tunnel::MemoryProvider;
//! use dnsgate_core::{Config, Session};
//! use std::sync::Arc;
//!
//! let config = Config::default();
//! let provider = Arc::new(MemoryProvider::new());
//! let source = Arc::new(StaticList::new(["ads.example.com"]));
//!
//! let session = Session::new(&config, provider, source);
//! session.start()?;
//! session.update_blocklist(["tracker.example.net"])?;
//! session.stop()?;
//! # Ok::<(), dnsgate_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod packet;
pub mod session;
pub mod tunnel;

// Re-exports for convenience
pub use config::Config;
pub use engine::{DecisionEngine, FailurePolicy, PacketDecision, Reason};
pub use error::{Error, EstablishFailure, Result};
pub use filter::{normalize, BlockList, BlocklistSource, BuildReport};
pub use session::{Session, SessionState, StatsSnapshot};
pub use tunnel::{TunnelChannel, TunnelConfig, TunnelProvider};
