//! dnsgate Platform Abstraction Layer
//!
//! This crate connects the core session to the hosting platform.
//!
//! ## Supported Platforms
//!
//! - **Unix** (Linux, Android, macOS): tunnel descriptor handed over by the host
//! - **Any**: host lifecycle adapter mapping service callbacks onto a session

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
pub use error::{PlatformError, Result};

#[cfg(unix)]
pub mod fd;

#[cfg(unix)]
pub use fd::{FdProvider, FdTunnel};

pub mod host;
pub use host::{HostAdapter, HostCommand, RestartPolicy};
