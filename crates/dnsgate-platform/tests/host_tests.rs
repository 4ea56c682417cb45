//! Integration tests for platform adapters driving a real session

use dnsgate_core::filter::{ListFile, StaticList};
use dnsgate_core::tunnel::MemoryProvider;
use dnsgate_core::{Config, Error, EstablishFailure, Session, SessionState};
use dnsgate_platform::host::{ACTION_STOP, ACTION_UPDATE_BLOCKLIST};
use dnsgate_platform::{HostAdapter, RestartPolicy};
use std::sync::Arc;

fn adapter_with_file(content: &str) -> (HostAdapter, Arc<MemoryProvider>, tempfile::NamedTempFile) {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), content).unwrap();

    let provider = Arc::new(MemoryProvider::new());
    let source = Arc::new(ListFile::new(file.path()));
    let session = Arc::new(Session::new(&Config::default(), provider.clone(), source));
    (HostAdapter::new(session), provider, file)
}

#[test]
fn test_start_then_stop() {
    let (adapter, provider, _file) = adapter_with_file("example.com\n");

    assert_eq!(adapter.on_start_command(None).unwrap(), RestartPolicy::Sticky);
    assert_eq!(adapter.session().state(), SessionState::Running);
    assert!(adapter.session().blocklist().contains("example.com"));

    // Repeated start requests do not open a second tunnel
    adapter.on_start_command(Some("start")).unwrap();
    assert_eq!(provider.establish_count(), 1);

    assert_eq!(adapter.on_start_command(Some(ACTION_STOP)).unwrap(), RestartPolicy::NotSticky);
    assert_eq!(adapter.session().state(), SessionState::Stopped);
}

#[test]
fn test_update_reloads_stored_list() {
    let (adapter, provider, file) = adapter_with_file("example.com\n");
    adapter.on_start_command(None).unwrap();

    std::fs::write(file.path(), "https://www.tracker.net/pixel\n").unwrap();
    adapter.on_start_command(Some(ACTION_UPDATE_BLOCKLIST)).unwrap();

    let blocklist = adapter.session().blocklist();
    assert!(blocklist.contains("tracker.net"));
    assert!(!blocklist.contains("example.com"));
    assert_eq!(provider.establish_count(), 1);
}

#[test]
fn test_update_starts_stopped_session() {
    let (adapter, _provider, _file) = adapter_with_file("example.com\n");
    adapter.on_start_command(Some(ACTION_UPDATE_BLOCKLIST)).unwrap();
    assert_eq!(adapter.session().state(), SessionState::Running);
}

#[test]
fn test_revoke_and_destroy_stop() {
    let (adapter, provider, _file) = adapter_with_file("");
    adapter.on_start_command(None).unwrap();
    let peer = provider.last_peer().unwrap();

    adapter.on_revoke().unwrap();
    assert_eq!(adapter.session().state(), SessionState::Stopped);
    adapter.on_destroy().unwrap();
    assert_eq!(peer.tunnel().close_calls(), 1);
}

#[test]
fn test_permission_failure_reported() {
    let provider = Arc::new(MemoryProvider::new());
    provider.set_failure(Some(EstablishFailure::PermissionDenied));
    let session = Session::new(&Config::default(), provider, Arc::new(StaticList::default()));
    let adapter = HostAdapter::new(Arc::new(session));

    let err = adapter.on_start_command(None).unwrap_err();
    assert!(matches!(err, Error::TunnelEstablish { kind: EstablishFailure::PermissionDenied, .. }));
    assert_eq!(adapter.session().state(), SessionState::Stopped);
}

#[cfg(unix)]
mod fd_session {
    use super::*;
    use dnsgate_platform::FdProvider;
    use std::os::fd::OwnedFd;
    use std::os::unix::net::UnixDatagram;
    use std::time::Duration;

    fn dns_packet(name: &str) -> Vec<u8> {
        let mut dns = vec![0xAB, 0xCD, 0x01, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        for label in name.split('.') {
            dns.push(label.len() as u8);
            dns.extend_from_slice(label.as_bytes());
        }
        dns.extend_from_slice(&[0x00, 0x00, 0x01, 0x00, 0x01]);

        let udp_len = (8 + dns.len()) as u16;
        let total_len = 20 + udp_len;
        let mut packet = vec![
            0x45, 0x00, (total_len >> 8) as u8, (total_len & 0xFF) as u8,
            0x00, 0x01, 0x00, 0x00,
            0x40, 0x11, 0x00, 0x00,
            0x0A, 0x00, 0x00, 0x02,
            0x08, 0x08, 0x08, 0x08,
            0xD4, 0x31, 0x00, 0x35,
            (udp_len >> 8) as u8, (udp_len & 0xFF) as u8, 0x00, 0x00,
        ];
        packet.extend(dns);
        packet
    }

    #[test]
    fn test_filtering_over_descriptor() {
        let (tunnel_end, host) = UnixDatagram::pair().unwrap();
        host.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        let provider = FdProvider::new(OwnedFd::from(tunnel_end))
            .with_poll_interval(Duration::from_millis(20));
        let source = StaticList::new(["ads.example.com"]);
        let session = Session::new(&Config::default(), Arc::new(provider), Arc::new(source));
        session.start().unwrap();

        host.send(&dns_packet("x.ads.example.com")).unwrap();
        let allowed = dns_packet("example.com");
        host.send(&allowed).unwrap();

        let mut buf = [0u8; 512];
        let n = host.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], allowed.as_slice());

        session.stop().unwrap();
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(session.stats().blocked, 1);
    }
}
