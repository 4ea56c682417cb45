//! Tunnel channel abstraction
//!
//! The core never opens a tunnel itself. A [`TunnelProvider`] supplied by the
//! hosting platform turns a [`TunnelConfig`] into a [`TunnelChannel`]: a
//! duplex byte channel carrying one raw IP packet per read or write.

mod memory;

pub use memory::{MemoryProvider, MemoryTunnel, TunnelPeer};

pub use crate::config::TunnelConfig;
use crate::error::Result;
use std::io;
use std::sync::Arc;

/// Duplex packet channel shared between the session and its worker
///
/// `close` must make a read blocked in another thread return, either with
/// `Ok(0)` or an error, within a bounded time.
pub trait TunnelChannel: Send + Sync {
    /// Read one packet into `buf`, returning its length (`0` = end of stream)
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write one packet
    fn write(&self, packet: &[u8]) -> io::Result<()>;

    /// Close the channel
    fn close(&self) -> io::Result<()>;
}

/// Platform collaborator that hands out tunnel channels
#[cfg_attr(test, mockall::automock)]
pub trait TunnelProvider: Send + Sync {
    /// Request a channel configured with the given address, DNS server and routes
    ///
    /// Fails with [`crate::Error::TunnelEstablish`] when permission is missing
    /// or the platform cannot provide a tunnel.
    fn establish(&self, config: &TunnelConfig) -> Result<Arc<dyn TunnelChannel>>;
}
