//! Tunnel session lifecycle
//!
//! A [`Session`] owns one filtering run at a time:
//!
//! ```text
//! Stopped -> Starting -> Running -> Stopping -> Stopped
//!                           |
//!                           +--> Stopped   (tunnel closed or I/O error)
//! ```
//!
//! Control operations may be called from any thread. Lifecycle state, the
//! running flag and the channel handle sit in one mutex-guarded control
//! block; whoever takes the active run out of it is the only party that
//! closes its channel.

mod stats;
mod worker;

pub use stats::StatsSnapshot;

use crate::config::{Config, TunnelConfig};
use crate::engine::{DecisionEngine, FailurePolicy};
use crate::error::{Error, Result};
use crate::filter::{BlockList, BlocklistSource, BuildReport};
use crate::tunnel::{TunnelChannel, TunnelProvider};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::{Mutex, RwLock};
use stats::Stats;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use worker::Worker;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No tunnel, no worker
    Stopped,
    /// Loading the blocklist and establishing the tunnel
    Starting,
    /// Worker is filtering packets
    Running,
    /// Tearing down the tunnel and waiting for the worker
    Stopping,
}

impl SessionState {
    /// Display name
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Stopped => "stopped",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Stopping => "stopping",
        }
    }

    /// Whether a run is in progress or being set up
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Starting | SessionState::Running)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct ActiveRun {
    id: u64,
    channel: Arc<dyn TunnelChannel>,
    running: Arc<AtomicBool>,
}

struct Control {
    state: SessionState,
    run: Option<ActiveRun>,
}

/// State shared between the control surface and the worker
struct Shared {
    control: Mutex<Control>,
    blocklist: RwLock<Arc<BlockList>>,
    stats: Stats,
    fatal: Mutex<Option<Error>>,
}

impl Shared {
    fn snapshot(&self) -> Arc<BlockList> {
        self.blocklist.read().clone()
    }

    fn set_state(&self, state: SessionState) {
        let mut control = self.control.lock();
        if control.state != state {
            info!(from = %control.state, to = %state, "Session state changed");
            control.state = state;
        }
    }

    /// Stop the run `run_id` from inside the worker
    fn fail(&self, run_id: u64, err: Error) {
        let run = {
            let mut control = self.control.lock();
            if control.run.as_ref().map(|r| r.id) != Some(run_id) {
                // stop() got there first and owns the close
                return;
            }
            error!(error = %err, "Session stopped by tunnel failure");
            *self.fatal.lock() = Some(err);
            info!(from = %control.state, to = %SessionState::Stopped, "Session state changed");
            control.state = SessionState::Stopped;
            control.run.take()
        };

        if let Some(run) = run {
            run.running.store(false, Ordering::Release);
            if let Err(e) = run.channel.close() {
                warn!(error = %e, "Failed to close tunnel channel");
            }
        }
    }
}

struct WorkerHandle {
    handle: JoinHandle<()>,
    exited: Receiver<()>,
}

impl WorkerHandle {
    /// Wait up to `timeout` for the worker thread to finish
    fn wait(self, timeout: Duration) {
        match self.exited.recv_timeout(timeout) {
            Err(RecvTimeoutError::Disconnected) | Ok(()) => {
                if self.handle.join().is_err() {
                    error!("Session worker panicked");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Session worker did not exit in time, detaching"
                );
            }
        }
    }
}

/// One DNS filtering session over a platform tunnel
pub struct Session {
    shared: Arc<Shared>,
    provider: Arc<dyn TunnelProvider>,
    source: Arc<dyn BlocklistSource>,
    tunnel: TunnelConfig,
    engine: DecisionEngine,
    stop_timeout: Duration,
    next_run: AtomicU64,
    worker: Mutex<Option<WorkerHandle>>,
}

impl Session {
    /// Create a stopped session
    pub fn new(
        config: &Config,
        provider: Arc<dyn TunnelProvider>,
        source: Arc<dyn BlocklistSource>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                control: Mutex::new(Control {
                    state: SessionState::Stopped,
                    run: None,
                }),
                blocklist: RwLock::new(Arc::new(BlockList::new())),
                stats: Stats::default(),
                fatal: Mutex::new(None),
            }),
            provider,
            source,
            tunnel: config.tunnel.clone(),
            engine: DecisionEngine::new(config.filter.failure_policy),
            stop_timeout: Duration::from_millis(config.session.stop_timeout_ms),
            next_run: AtomicU64::new(1),
            worker: Mutex::new(None),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.shared.control.lock().state
    }

    /// Whether the worker is filtering packets
    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// Failure policy used by the decision engine
    pub fn failure_policy(&self) -> FailurePolicy {
        self.engine.policy()
    }

    /// Current blocklist snapshot
    pub fn blocklist(&self) -> Arc<BlockList> {
        self.shared.snapshot()
    }

    /// Counters for the current or last run
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// The error that ended the last run, reported once
    pub fn take_fatal_error(&self) -> Option<Error> {
        self.shared.fatal.lock().take()
    }

    /// Start filtering
    ///
    /// Checks the tunnel and session settings, loads the blocklist from the
    /// source, establishes the tunnel and spawns the worker. Does nothing if
    /// a run is already active. On failure the session stays stopped.
    #[instrument(skip(self), fields(session = %self.tunnel.session_name))]
    pub fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        {
            let mut control = self.shared.control.lock();
            if control.state.is_active() {
                debug!(state = %control.state, "Session already started");
                return Ok(());
            }
            info!(from = %control.state, to = %SessionState::Starting, "Session state changed");
            control.state = SessionState::Starting;
        }

        // A previous run may have ended on its own
        if let Some(previous) = worker.take() {
            previous.wait(self.stop_timeout);
        }

        match self.launch() {
            Ok(handle) => {
                *worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Session failed to start");
                self.shared.set_state(SessionState::Stopped);
                Err(e)
            }
        }
    }

    fn launch(&self) -> Result<WorkerHandle> {
        self.tunnel.validate()?;
        if self.stop_timeout.is_zero() {
            return Err(Error::config_value(
                "session.stop_timeout_ms",
                "Must be greater than 0",
            ));
        }

        self.reload_blocklist()?;

        let channel = self.provider.establish(&self.tunnel)?;
        info!(
            address = %self.tunnel.address,
            prefix_len = self.tunnel.prefix_len,
            dns_server = %self.tunnel.dns_server,
            routes = ?self.tunnel.routes,
            "Tunnel established"
        );

        self.shared.stats.reset();
        self.shared.fatal.lock().take();

        let run_id = self.next_run.fetch_add(1, Ordering::Relaxed);
        let running = Arc::new(AtomicBool::new(true));
        let worker = Worker {
            run_id,
            channel: Arc::clone(&channel),
            running: Arc::clone(&running),
            shared: Arc::clone(&self.shared),
            engine: self.engine,
            buffer: vec![0u8; self.tunnel.max_packet_size],
        };

        // Installed before spawning so a worker that fails at once finds its run
        {
            let mut control = self.shared.control.lock();
            control.run = Some(ActiveRun {
                id: run_id,
                channel: Arc::clone(&channel),
                running,
            });
            info!(from = %control.state, to = %SessionState::Running, "Session state changed");
            control.state = SessionState::Running;
        }

        let (exit_tx, exited) = crossbeam_channel::bounded::<()>(0);
        let spawned = thread::Builder::new()
            .name("dnsgate-worker".to_string())
            .spawn(move || {
                let _exit = exit_tx;
                worker.run();
            });

        match spawned {
            Ok(handle) => Ok(WorkerHandle { handle, exited }),
            Err(e) => {
                let run = self.shared.control.lock().run.take();
                if let Some(run) = run {
                    run.running.store(false, Ordering::Release);
                    if let Err(close_err) = run.channel.close() {
                        warn!(error = %close_err, "Failed to close tunnel channel");
                    }
                }
                Err(Error::Io(e))
            }
        }
    }

    /// Stop filtering
    ///
    /// Idempotent. Closes the tunnel channel at most once per run, then
    /// waits a bounded time for the worker.
    #[instrument(skip(self), fields(session = %self.tunnel.session_name))]
    pub fn stop(&self) -> Result<()> {
        let mut worker = self.worker.lock();

        let run = {
            let mut control = self.shared.control.lock();
            let run = control.run.take();
            if let Some(run) = &run {
                run.running.store(false, Ordering::Release);
                info!(from = %control.state, to = %SessionState::Stopping, "Session state changed");
                control.state = SessionState::Stopping;
            }
            run
        };

        if let Some(run) = &run {
            if let Err(e) = run.channel.close() {
                warn!(error = %e, "Failed to close tunnel channel");
            }
        }

        if let Some(handle) = worker.take() {
            handle.wait(self.stop_timeout);
        }

        if run.is_some() {
            self.shared.set_state(SessionState::Stopped);
        }
        Ok(())
    }

    /// Replace the blocklist with freshly normalized entries
    ///
    /// Unusable entries are skipped and listed in the report. The swap is
    /// atomic: a match in progress sees either the old or the new list.
    #[instrument(skip_all)]
    pub fn update_blocklist<I, S>(&self, entries: I) -> Result<BuildReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (blocklist, report) = BlockList::build(entries);
        if !report.rejected.is_empty() {
            warn!(rejected = report.rejected.len(), "Skipped invalid blocklist entries");
        }
        info!(
            domains = blocklist.len(),
            duplicates = report.duplicates,
            "Blocklist updated"
        );
        *self.shared.blocklist.write() = Arc::new(blocklist);
        Ok(report)
    }

    /// Reload the blocklist from the configured source
    pub fn reload_blocklist(&self) -> Result<BuildReport> {
        let entries = self.source.load()?;
        self.update_blocklist(entries)
    }

    /// Whether the blocklist source reports new data
    pub fn blocklist_source_changed(&self) -> bool {
        self.source.has_changed()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
