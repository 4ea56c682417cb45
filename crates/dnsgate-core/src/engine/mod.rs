//! Per-packet decision engine
//!
//! Composes the packet parsers and the blocklist matcher into an
//! allow/block verdict. The engine holds no per-packet state, so one
//! instance can be shared by any number of callers.

use crate::filter::BlockList;
use crate::packet::{DnsQuestion, Ip4Header, Protocol, UdpHeader};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::error;

/// What to do with a packet the engine could not classify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Let the packet through; filtering errors never break connectivity
    #[default]
    FailOpen,
    /// Drop the packet when its DNS question cannot be checked
    FailClosed,
}

/// Why a verdict was reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    /// IPv4 header failed validation
    InvalidIp,
    /// Not UDP, or UDP on ports other than 53
    PassThrough,
    /// UDP header failed validation
    InvalidUdp,
    /// DNS payload without a recoverable question name
    NoDnsQuestion,
    /// DNS query for this domain
    Domain(String),
    /// Classification failed unexpectedly
    InternalError,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::InvalidIp => f.write_str("invalid ip"),
            Reason::PassThrough => f.write_str("pass-through"),
            Reason::InvalidUdp => f.write_str("invalid udp"),
            Reason::NoDnsQuestion => f.write_str("no dns question"),
            Reason::Domain(domain) => f.write_str(domain),
            Reason::InternalError => f.write_str("internal error"),
        }
    }
}

/// Verdict for a single packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketDecision {
    /// Drop the packet instead of writing it back
    pub block: bool,
    /// Why
    pub reason: Reason,
}

impl PacketDecision {
    /// Allow with a reason
    pub fn allow(reason: Reason) -> Self {
        Self { block: false, reason }
    }

    /// Block with a reason
    pub fn block(reason: Reason) -> Self {
        Self { block: true, reason }
    }

    /// Whether the packet is dropped
    pub fn is_block(&self) -> bool {
        self.block
    }

    /// Whether the packet is written back
    pub fn is_allow(&self) -> bool {
        !self.block
    }

    /// Queried domain, for DNS packets
    pub fn domain(&self) -> Option<&str> {
        match &self.reason {
            Reason::Domain(domain) => Some(domain),
            _ => None,
        }
    }
}

/// Stateless packet classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionEngine {
    policy: FailurePolicy,
}

impl DecisionEngine {
    /// Create an engine with the given failure policy
    pub fn new(policy: FailurePolicy) -> Self {
        Self { policy }
    }

    /// Configured failure policy
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Decide what to do with one raw IPv4 packet
    ///
    /// Never panics: an unexpected failure inside classification is caught
    /// here and resolved through the failure policy.
    pub fn decide(&self, packet: &[u8], blocklist: &BlockList) -> PacketDecision {
        self.guarded(packet.len(), || self.classify(packet, blocklist))
    }

    fn guarded<F>(&self, packet_len: usize, classify: F) -> PacketDecision
    where
        F: FnOnce() -> PacketDecision,
    {
        match panic::catch_unwind(AssertUnwindSafe(classify)) {
            Ok(decision) => decision,
            Err(_) => {
                error!(packet_len, policy = ?self.policy, "Packet classification failed");
                self.unclassified(Reason::InternalError)
            }
        }
    }

    fn classify(&self, packet: &[u8], blocklist: &BlockList) -> PacketDecision {
        let ip = Ip4Header::from_bytes(packet);
        if !ip.is_valid() {
            return PacketDecision::allow(Reason::InvalidIp);
        }
        if ip.protocol() != Protocol::Udp {
            return PacketDecision::allow(Reason::PassThrough);
        }
        let Some(transport) = ip.payload() else {
            return PacketDecision::allow(Reason::InvalidIp);
        };

        let udp = UdpHeader::from_view(transport);
        if !udp.is_valid() {
            return if udp.is_dns() {
                self.unclassified(Reason::InvalidUdp)
            } else {
                PacketDecision::allow(Reason::InvalidUdp)
            };
        }
        if !udp.is_dns() {
            return PacketDecision::allow(Reason::PassThrough);
        }

        let Some(question) = udp.payload().and_then(DnsQuestion::parse) else {
            return self.unclassified(Reason::NoDnsQuestion);
        };

        let domain = question.name();
        if blocklist.is_blocked(&domain) {
            PacketDecision::block(Reason::Domain(domain))
        } else {
            PacketDecision::allow(Reason::Domain(domain))
        }
    }

    fn unclassified(&self, reason: Reason) -> PacketDecision {
        match self.policy {
            FailurePolicy::FailOpen => PacketDecision::allow(reason),
            FailurePolicy::FailClosed => PacketDecision::block(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dns_packet(labels: &[&str]) -> Vec<u8> {
        let mut dns = vec![0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        for label in labels {
            dns.push(label.len() as u8);
            dns.extend_from_slice(label.as_bytes());
        }
        dns.extend_from_slice(&[0x00, 0x00, 0x01, 0x00, 0x01]);

        let udp_len = (8 + dns.len()) as u16;
        let total_len = 20 + udp_len;
        let mut packet = vec![
            0x45, 0x00,
            (total_len >> 8) as u8, (total_len & 0xFF) as u8,
            0x00, 0x01, 0x00, 0x00,
            0x40, 0x11, 0x00, 0x00,
            0x0A, 0x00, 0x00, 0x02,
            0x08, 0x08, 0x08, 0x08,
            0xC3, 0x50, 0x00, 0x35,
            (udp_len >> 8) as u8, (udp_len & 0xFF) as u8,
            0x00, 0x00,
        ];
        packet.extend(dns);
        packet
    }

    #[test]
    fn test_blocked_query() {
        let bl = BlockList::from_entries(["example.com"]);
        let decision = DecisionEngine::default().decide(&dns_packet(&["blocked", "example", "com"]), &bl);
        assert!(decision.is_block());
        assert_eq!(decision.domain(), Some("blocked.example.com"));
    }

    #[test]
    fn test_allowed_query() {
        let bl = BlockList::from_entries(["example.com"]);
        let decision = DecisionEngine::default().decide(&dns_packet(&["notexample", "com"]), &bl);
        assert!(decision.is_allow());
        assert_eq!(decision.reason.to_string(), "notexample.com");
    }

    #[test]
    fn test_no_question_fail_open_and_closed() {
        let bl = BlockList::new();
        let packet = dns_packet(&[]);

        let open = DecisionEngine::new(FailurePolicy::FailOpen).decide(&packet, &bl);
        assert_eq!(open, PacketDecision::allow(Reason::NoDnsQuestion));

        let closed = DecisionEngine::new(FailurePolicy::FailClosed).decide(&packet, &bl);
        assert_eq!(closed, PacketDecision::block(Reason::NoDnsQuestion));
    }

    #[test]
    fn test_invalid_ip_allowed_under_both_policies() {
        let bl = BlockList::new();
        for policy in [FailurePolicy::FailOpen, FailurePolicy::FailClosed] {
            let decision = DecisionEngine::new(policy).decide(&[0x45, 0x00], &bl);
            assert_eq!(decision, PacketDecision::allow(Reason::InvalidIp));
        }
    }

    #[test]
    fn test_panic_is_contained() {
        let open = DecisionEngine::new(FailurePolicy::FailOpen);
        let decision = open.guarded(0, || panic!("parser bug"));
        assert_eq!(decision, PacketDecision::allow(Reason::InternalError));

        let closed = DecisionEngine::new(FailurePolicy::FailClosed);
        let decision = closed.guarded(0, || panic!("parser bug"));
        assert_eq!(decision, PacketDecision::block(Reason::InternalError));
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(Reason::InvalidIp.to_string(), "invalid ip");
        assert_eq!(Reason::PassThrough.to_string(), "pass-through");
        assert_eq!(Reason::InvalidUdp.to_string(), "invalid udp");
        assert_eq!(Reason::NoDnsQuestion.to_string(), "no dns question");
    }

    #[test]
    fn test_policy_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: FailurePolicy,
        }
        let w: Wrapper = toml::from_str("policy = \"fail-closed\"").unwrap();
        assert_eq!(w.policy, FailurePolicy::FailClosed);
    }
}
