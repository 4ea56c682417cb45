//! Tunnel over a host-supplied file descriptor
//!
//! The host (an Android `VpnService`, a Linux supervisor that opened
//! `/dev/net/tun`, ...) configures address, DNS server and routes itself and
//! hands over a descriptor that yields one IP packet per read. Each
//! established channel works on its own duplicate of that descriptor.

use crate::error::{PlatformError, Result};
use dnsgate_core::{TunnelChannel, TunnelConfig, TunnelProvider};
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default interval at which a blocked read rechecks for `close`
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Hands out channels over a tunnel descriptor owned by the host
#[derive(Debug)]
pub struct FdProvider {
    fd: OwnedFd,
    poll_interval: Duration,
}

impl FdProvider {
    /// Take ownership of an open tunnel descriptor
    pub fn new(fd: OwnedFd) -> Self {
        Self {
            fd,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Duplicate an inherited descriptor number (e.g. `--tun-fd 3`)
    ///
    /// The original descriptor is left open and untouched.
    pub fn from_inherited(fd: RawFd) -> Result<Self> {
        if fd < 0 {
            return Err(PlatformError::InvalidDescriptor {
                fd,
                message: "negative descriptor".to_string(),
            });
        }

        // SAFETY: F_GETFD only inspects the descriptor table entry; an
        // invalid number is reported through the return value.
        if unsafe { libc::fcntl(fd, libc::F_GETFD) } < 0 {
            return Err(PlatformError::InvalidDescriptor {
                fd,
                message: io::Error::last_os_error().to_string(),
            });
        }

        // SAFETY: the descriptor was just checked to be open, and the borrow
        // only lives long enough to duplicate it.
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        let owned = borrowed.try_clone_to_owned()?;
        debug!(fd, dup = owned.as_raw_fd(), "Duplicated inherited tunnel descriptor");
        Ok(Self::new(owned))
    }

    /// Change how often a blocked read rechecks for `close`
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn open(&self) -> Result<FdTunnel> {
        let fd = self.fd.try_clone().map_err(dup_error)?;
        Ok(FdTunnel::new(fd, self.poll_interval))
    }
}

/// Classify a failure to duplicate the tunnel descriptor
fn dup_error(e: io::Error) -> PlatformError {
    match e.raw_os_error() {
        Some(libc::EMFILE) | Some(libc::ENFILE) => {
            PlatformError::Unavailable(format!("no descriptor left for the tunnel: {e}"))
        }
        _ if e.kind() == io::ErrorKind::PermissionDenied => {
            PlatformError::PermissionDenied(e.to_string())
        }
        _ => PlatformError::Io(e),
    }
}

impl TunnelProvider for FdProvider {
    fn establish(&self, config: &TunnelConfig) -> dnsgate_core::Result<Arc<dyn TunnelChannel>> {
        let tunnel = self.open()?;
        info!(
            session = %config.session_name,
            fd = tunnel.file.as_raw_fd(),
            "Using host-configured tunnel descriptor"
        );
        let channel: Arc<dyn TunnelChannel> = Arc::new(tunnel);
        Ok(channel)
    }
}

/// Channel over one duplicated tunnel descriptor
///
/// `close` marks the channel closed; a read blocked in another thread sees
/// it within one poll interval. The descriptor itself is released when the
/// last reference to the channel is dropped.
#[derive(Debug)]
pub struct FdTunnel {
    file: File,
    closed: AtomicBool,
    poll_interval: Duration,
}

impl FdTunnel {
    /// Wrap an owned tunnel descriptor
    pub fn new(fd: OwnedFd, poll_interval: Duration) -> Self {
        Self {
            file: File::from(fd),
            closed: AtomicBool::new(false),
            poll_interval,
        }
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.is_closed() {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "tunnel closed"));
        }
        Ok(())
    }
}

impl TunnelChannel for FdTunnel {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            self.ensure_open()?;
            if wait_readable(self.file.as_fd(), self.poll_interval)? {
                break;
            }
        }
        (&self.file).read(buf)
    }

    fn write(&self, packet: &[u8]) -> io::Result<()> {
        self.ensure_open()?;
        let written = (&self.file).write(packet)?;
        if written != packet.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short packet write: {written} of {} bytes", packet.len()),
            ));
        }
        Ok(())
    }

    fn close(&self) -> io::Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(fd = self.file.as_raw_fd(), "Tunnel channel closed");
        }
        Ok(())
    }
}

/// Wait up to `timeout` for `fd` to become readable (or hung up)
fn wait_readable(fd: BorrowedFd<'_>, timeout: Duration) -> io::Result<bool> {
    let mut pollfd = libc::pollfd {
        fd: fd.as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };
    let timeout_ms = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);

    // SAFETY: `pollfd` is a valid, exclusively borrowed array of one entry
    // for the duration of the call, and `fd` is kept open by the borrow.
    let rc = unsafe { libc::poll(&mut pollfd, 1, timeout_ms) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }
    Ok(rc > 0)
}
