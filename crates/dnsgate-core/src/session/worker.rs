//! Read/decide/write loop

use super::Shared;
use crate::engine::{DecisionEngine, PacketDecision, Reason};
use crate::error::{Error, Result};
use crate::tunnel::TunnelChannel;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// State owned by the worker thread for one run
pub(super) struct Worker {
    pub(super) run_id: u64,
    pub(super) channel: Arc<dyn TunnelChannel>,
    pub(super) running: Arc<AtomicBool>,
    pub(super) shared: Arc<Shared>,
    pub(super) engine: DecisionEngine,
    pub(super) buffer: Vec<u8>,
}

impl Worker {
    pub(super) fn run(mut self) {
        debug!(run = self.run_id, buffer = self.buffer.len(), "Worker started");

        match self.pump() {
            Ok(()) => debug!(run = self.run_id, "Worker exiting"),
            Err(e) => self.shared.fail(self.run_id, e),
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn pump(&mut self) -> Result<()> {
        while self.is_running() {
            let len = match self.channel.read(&mut self.buffer) {
                Ok(0) if self.is_running() => return Err(Error::TunnelClosed),
                Ok(0) => return Ok(()),
                Ok(len) => len,
                Err(e) if is_transient(&e) => continue,
                Err(e) if self.is_running() => return Err(Error::TunnelIo(e)),
                Err(_) => return Ok(()),
            };

            let packet = &self.buffer[..len];
            self.shared.stats.record_read(len);

            let blocklist = self.shared.snapshot();
            let decision = self.engine.decide(packet, &blocklist);
            self.shared.stats.record_decision(&decision);
            log_decision(&decision, len);

            if decision.is_block() {
                continue;
            }
            if let Err(e) = self.channel.write(packet) {
                self.shared.stats.record_write_failure();
                if self.is_running() {
                    return Err(Error::TunnelIo(e));
                }
                return Ok(());
            }
        }
        Ok(())
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock)
}

fn log_decision(decision: &PacketDecision, len: usize) {
    let verdict = if decision.is_block() { "block" } else { "allow" };
    match &decision.reason {
        Reason::Domain(domain) if decision.is_block() => {
            info!(verdict, domain = %domain, len, "Blocked DNS query");
        }
        Reason::Domain(domain) => debug!(verdict, domain = %domain, len, "DNS query"),
        Reason::InternalError => warn!(verdict, len, "Packet classification failed"),
        Reason::NoDnsQuestion => debug!(verdict, len, "DNS packet without a question"),
        reason => trace!(verdict, reason = %reason, len, "Packet"),
    }
}
