//! Host lifecycle adapter
//!
//! Mobile hosts drive the filter through service callbacks rather than
//! direct calls. [`HostAdapter`] maps those callbacks and their action
//! strings onto [`Session`] operations.

use dnsgate_core::{Result, Session};
use std::sync::Arc;
use tracing::{info, warn};

/// Action asking the service to shut the tunnel down
pub const ACTION_STOP: &str = "stop_vpn";

/// Action sent after the stored blocklist was edited
pub const ACTION_UPDATE_BLOCKLIST: &str = "update_blocked_urls";

/// Command carried by a host start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    /// Start filtering if not already running
    Start,
    /// Stop filtering
    Stop,
    /// Reload the stored blocklist, then make sure filtering runs
    UpdateBlocklist,
}

impl HostCommand {
    /// Map a host action string; unknown or missing actions mean `Start`
    pub fn from_action(action: Option<&str>) -> Self {
        match action {
            Some(ACTION_STOP) => HostCommand::Stop,
            Some(ACTION_UPDATE_BLOCKLIST) => HostCommand::UpdateBlocklist,
            _ => HostCommand::Start,
        }
    }
}

/// Whether the host should recreate the service after killing it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Recreate and resend the last start request
    Sticky,
    /// Stay down; the user stopped filtering
    NotSticky,
}

/// Forwards host service callbacks to a session
pub struct HostAdapter {
    session: Arc<Session>,
}

impl HostAdapter {
    /// Wrap a session
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// The wrapped session
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Handle a start request carrying an optional action
    pub fn on_start_command(&self, action: Option<&str>) -> Result<RestartPolicy> {
        let command = HostCommand::from_action(action);
        info!(?command, "Host start request");

        match command {
            HostCommand::Stop => {
                self.session.stop()?;
                Ok(RestartPolicy::NotSticky)
            }
            HostCommand::UpdateBlocklist => {
                if self.session.state().is_active() {
                    self.session.reload_blocklist()?;
                } else {
                    self.session.start()?;
                }
                Ok(RestartPolicy::Sticky)
            }
            HostCommand::Start => {
                self.session.start()?;
                Ok(RestartPolicy::Sticky)
            }
        }
    }

    /// The user or system withdrew tunnel permission
    pub fn on_revoke(&self) -> Result<()> {
        warn!("Tunnel permission revoked by host");
        self.session.stop()
    }

    /// The host is destroying the service
    pub fn on_destroy(&self) -> Result<()> {
        self.session.stop()
    }
}
