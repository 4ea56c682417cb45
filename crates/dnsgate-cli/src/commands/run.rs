//! Run command - filter DNS queries on a tunnel descriptor

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use dnsgate_core::{Config, Session, TunnelProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{build_source, load_blocklist, BlocklistArgs};

/// How often the supervisor checks the session for a fatal error
const WATCH_INTERVAL: Duration = Duration::from_millis(500);

/// Run command arguments
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Tunnel descriptor inherited from the host process
    #[arg(long, value_name = "FD", env = "DNSGATE_TUN_FD")]
    pub tun_fd: Option<i32>,

    #[command(flatten)]
    pub blocklist: BlocklistArgs,

    /// Seconds between blocklist file change checks (overrides config)
    #[arg(long, value_name = "SECS")]
    pub reload_interval: Option<u64>,

    /// Seconds between statistics log lines (0 = off)
    #[arg(long, value_name = "SECS", default_value = "0")]
    pub stats_interval: u64,

    /// Validate configuration and blocklist, then exit
    #[arg(long)]
    pub dry_run: bool,
}

/// Execute the run command
pub fn execute(args: RunArgs, mut config: Config) -> Result<()> {
    args.blocklist.apply(&mut config.filter);
    if let Some(secs) = args.reload_interval {
        config.filter.reload_interval_secs = secs;
    }
    config.validate().context("Configuration validation failed")?;

    if args.dry_run {
        return dry_run(&config);
    }

    let Some(fd) = args.tun_fd else {
        bail!("--tun-fd is required unless --dry-run is given");
    };

    let provider = provider(fd)?;
    let source = Arc::new(build_source(&config.filter));
    let session = Arc::new(Session::new(&config, provider, source));

    session.start().context("Failed to start filtering session")?;
    info!(
        fd,
        domains = session.blocklist().len(),
        policy = ?session.failure_policy(),
        "Filtering started"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;
    let result = runtime.block_on(supervise(
        Arc::clone(&session),
        config.filter.reload_interval_secs,
        args.stats_interval,
    ));

    session.stop().context("Failed to stop filtering session")?;
    let stats = session.stats();
    info!(
        packets = stats.packets_read,
        dns_queries = stats.dns_queries,
        allowed = stats.allowed,
        blocked = stats.blocked,
        write_failures = stats.write_failures,
        "Filtering stopped"
    );

    result
}

fn dry_run(config: &Config) -> Result<()> {
    let (blocklist, report) = load_blocklist(&config.filter)?;

    println!("{}", "Configuration is valid".green());
    println!("  Tunnel:         {}/{}", config.tunnel.address, config.tunnel.prefix_len);
    println!("  DNS server:     {}", config.tunnel.dns_server);
    println!("  Routes:         {}", config.tunnel.routes.join(", "));
    println!("  Failure policy: {:?}", config.filter.failure_policy);
    println!("  Blocked domains: {}", blocklist.len());
    println!("    accepted:   {}", report.accepted);
    println!("    duplicates: {}", report.duplicates);
    println!("    rejected:   {}", report.rejected.len());

    warn!("Dry run mode - no tunnel was opened");
    Ok(())
}

#[cfg(unix)]
fn provider(fd: i32) -> Result<Arc<dyn TunnelProvider>> {
    let provider = dnsgate_platform::FdProvider::from_inherited(fd)
        .with_context(|| format!("Cannot use tunnel descriptor {fd}"))?;
    Ok(Arc::new(provider))
}

#[cfg(not(unix))]
fn provider(fd: i32) -> Result<Arc<dyn TunnelProvider>> {
    bail!("Inherited tunnel descriptors are only supported on Unix (got {fd})")
}

/// Wait for Ctrl+C or a fatal session error, reloading the blocklist on change
async fn supervise(session: Arc<Session>, reload_secs: u64, stats_secs: u64) -> Result<()> {
    let mut watch = interval(WATCH_INTERVAL);
    let mut reload = interval(Duration::from_secs(reload_secs.max(1)));
    let mut stats = interval(Duration::from_secs(stats_secs.max(1)));
    reload.set_missed_tick_behavior(MissedTickBehavior::Skip);
    stats.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                signal.context("Failed to listen for Ctrl+C")?;
                info!("Received interrupt signal, shutting down...");
                return Ok(());
            }
            _ = watch.tick() => {
                if let Some(err) = session.take_fatal_error() {
                    return Err(err).context("Filtering session failed");
                }
            }
            _ = reload.tick(), if reload_secs > 0 => {
                if session.blocklist_source_changed() {
                    let report = session.reload_blocklist().context("Failed to reload blocklist")?;
                    info!(accepted = report.accepted, rejected = report.rejected.len(), "Blocklist reloaded");
                } else {
                    debug!("Blocklist unchanged");
                }
            }
            _ = stats.tick(), if stats_secs > 0 => {
                let snapshot = session.stats();
                info!(
                    packets = snapshot.packets_read,
                    dns_queries = snapshot.dns_queries,
                    allowed = snapshot.allowed,
                    blocked = snapshot.blocked,
                    "Statistics"
                );
            }
        }
    }
}
