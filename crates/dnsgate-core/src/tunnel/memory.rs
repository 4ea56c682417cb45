//! In-process tunnel
//!
//! A [`MemoryTunnel`] is the session side of a pair; the matching
//! [`TunnelPeer`] plays the device, injecting packets and collecting the
//! ones written back. Used by tests and by embedders that feed packets
//! from their own source.

use super::{TunnelChannel, TunnelConfig, TunnelProvider};
use crate::error::{Error, EstablishFailure, Result};
use bytes::Bytes;
use crossbeam_channel::{select, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

enum Inbound {
    Packet(Bytes),
    Fail(io::ErrorKind),
}

/// Session side of an in-memory tunnel
pub struct MemoryTunnel {
    inbound: Receiver<Inbound>,
    outbound: Sender<Bytes>,
    close_signal: Mutex<Option<Sender<()>>>,
    closed: Receiver<()>,
    close_calls: AtomicUsize,
}

impl MemoryTunnel {
    /// Create a connected tunnel and peer
    pub fn pair() -> (Arc<Self>, TunnelPeer) {
        let (inbound_tx, inbound_rx) = unbounded();
        let (outbound_tx, outbound_rx) = unbounded();
        let (close_tx, close_rx) = crossbeam_channel::bounded(0);

        let tunnel = Arc::new(Self {
            inbound: inbound_rx,
            outbound: outbound_tx,
            close_signal: Mutex::new(Some(close_tx)),
            closed: close_rx,
            close_calls: AtomicUsize::new(0),
        });
        let peer = TunnelPeer {
            inbound: Mutex::new(Some(inbound_tx)),
            outbound: outbound_rx,
            tunnel: Arc::clone(&tunnel),
        };
        (tunnel, peer)
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.close_calls.load(Ordering::SeqCst) > 0
    }

    /// Number of `close` calls received
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn closed_error() -> io::Error {
        io::Error::new(io::ErrorKind::NotConnected, "tunnel closed")
    }
}

impl TunnelChannel for MemoryTunnel {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        if self.is_closed() {
            return Err(Self::closed_error());
        }
        select! {
            recv(self.inbound) -> msg => match msg {
                Ok(Inbound::Packet(packet)) => {
                    // Oversized packets are cut to the buffer, as a TUN read would
                    let len = packet.len().min(buf.len());
                    buf[..len].copy_from_slice(&packet[..len]);
                    Ok(len)
                }
                Ok(Inbound::Fail(kind)) => Err(io::Error::new(kind, "injected read failure")),
                Err(_) => Ok(0),
            },
            recv(self.closed) -> _ => Err(Self::closed_error()),
        }
    }

    fn write(&self, packet: &[u8]) -> io::Result<()> {
        if self.is_closed() {
            return Err(Self::closed_error());
        }
        self.outbound
            .send(Bytes::copy_from_slice(packet))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"))
    }

    fn close(&self) -> io::Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        // Dropping the sender wakes every blocked `read`
        self.close_signal.lock().take();
        Ok(())
    }
}

/// Device side of an in-memory tunnel
pub struct TunnelPeer {
    inbound: Mutex<Option<Sender<Inbound>>>,
    outbound: Receiver<Bytes>,
    tunnel: Arc<MemoryTunnel>,
}

impl TunnelPeer {
    fn push(&self, item: Inbound) -> bool {
        match self.inbound.lock().as_ref() {
            Some(tx) => tx.send(item).is_ok(),
            None => false,
        }
    }

    /// Deliver a packet to the session; false once hung up
    pub fn send(&self, packet: impl Into<Bytes>) -> bool {
        self.push(Inbound::Packet(packet.into()))
    }

    /// Make the next read fail with `kind`
    pub fn fail_next_read(&self, kind: io::ErrorKind) -> bool {
        self.push(Inbound::Fail(kind))
    }

    /// End the stream; the session's next read returns `Ok(0)`
    pub fn hang_up(&self) {
        self.inbound.lock().take();
    }

    /// Wait for a packet written back by the session
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Bytes> {
        self.outbound.recv_timeout(timeout).ok()
    }

    /// Take a written packet if one is queued
    pub fn try_recv(&self) -> Option<Bytes> {
        self.outbound.try_recv().ok()
    }

    /// The session side of this pair
    pub fn tunnel(&self) -> &Arc<MemoryTunnel> {
        &self.tunnel
    }
}

/// Provider handing out fresh [`MemoryTunnel`] pairs
///
/// Keeps the peer of every established tunnel so callers can drive it.
#[derive(Default)]
pub struct MemoryProvider {
    peers: Mutex<Vec<Arc<TunnelPeer>>>,
    configs: Mutex<Vec<TunnelConfig>>,
    failure: Mutex<Option<EstablishFailure>>,
}

impl MemoryProvider {
    /// Create a provider that grants every request
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent requests fail (`None` grants again)
    pub fn set_failure(&self, failure: Option<EstablishFailure>) {
        *self.failure.lock() = failure;
    }

    /// Number of tunnels established so far
    pub fn establish_count(&self) -> usize {
        self.peers.lock().len()
    }

    /// Peer of the most recently established tunnel
    pub fn last_peer(&self) -> Option<Arc<TunnelPeer>> {
        self.peers.lock().last().cloned()
    }

    /// Configuration of the most recent request
    pub fn last_config(&self) -> Option<TunnelConfig> {
        self.configs.lock().last().cloned()
    }
}

impl TunnelProvider for MemoryProvider {
    fn establish(&self, config: &TunnelConfig) -> Result<Arc<dyn TunnelChannel>> {
        self.configs.lock().push(config.clone());
        if let Some(kind) = *self.failure.lock() {
            return Err(Error::establish(kind, "memory provider configured to refuse"));
        }

        let (tunnel, peer) = MemoryTunnel::pair();
        self.peers.lock().push(Arc::new(peer));
        let channel: Arc<dyn TunnelChannel> = tunnel;
        Ok(channel)
    }
}
