//! Integration tests for packet parsing and the decision engine
//!
//! These tests exercise the parsers end to end on whole packets, and check
//! that no input makes them read out of bounds or panic.

mod common;

use common::*;
use dnsgate_core::engine::{DecisionEngine, FailurePolicy, PacketDecision, Reason};
use dnsgate_core::filter::BlockList;
use dnsgate_core::packet::*;
use proptest::prelude::*;
use std::net::Ipv4Addr;

#[test]
fn test_dns_packet_parse_chain() {
    let packet = dns_packet("blocked.example.com");

    let ip = Ip4Header::from_bytes(&packet);
    assert!(ip.is_valid());
    assert_eq!(ip.version(), 4);
    assert_eq!(ip.header_len(), 20);
    assert_eq!(ip.total_len(), packet.len());
    assert_eq!(ip.protocol(), Protocol::Udp);
    assert_eq!(ip.source(), Ipv4Addr::new(10, 0, 0, 2));
    assert_eq!(ip.destination(), Ipv4Addr::new(8, 8, 8, 8));

    let udp = UdpHeader::from_view(ip.payload().unwrap());
    assert!(udp.is_valid());
    assert_eq!(udp.source_port(), 50000);
    assert_eq!(udp.destination_port(), 53);
    assert!(udp.is_dns());

    let question = DnsQuestion::parse(udp.payload().unwrap()).unwrap();
    assert_eq!(question.name(), "blocked.example.com");
    assert_eq!(question.label_count(), 3);
    assert_eq!(question.end(), NameEnd::Terminated);
    assert_eq!(question.qtype(), Some(1));
    assert_eq!(question.qclass(), Some(1));
}

#[test]
fn test_parse_at_offset() {
    let packet = dns_packet("example.com");
    let mut buffer = vec![0xEE; 7];
    buffer.extend_from_slice(&packet);
    buffer.extend_from_slice(&[0xEE; 5]);

    let ip = Ip4Header::parse(&buffer, 7, packet.len());
    assert!(ip.is_valid());
    assert_eq!(ip.packet_len(), packet.len());

    let udp = UdpHeader::parse(&buffer, 7 + 20, packet.len() - 20);
    assert!(udp.is_valid());
    assert_eq!(udp.destination_port(), 53);
}

#[test]
fn test_blocked_dns_query() {
    let bl = BlockList::from_entries(["example.com"]);
    let decision = DecisionEngine::default().decide(&dns_packet("blocked.example.com"), &bl);
    assert_eq!(
        decision,
        PacketDecision::block(Reason::Domain("blocked.example.com".into()))
    );
}

#[test]
fn test_uppercase_query_blocked() {
    let bl = BlockList::from_entries(["example.com"]);
    let decision = DecisionEngine::default().decide(&dns_packet("ADS.Example.COM"), &bl);
    assert!(decision.is_block());
}

#[test]
fn test_tcp_is_pass_through() {
    let bl = BlockList::from_entries(["example.com"]);
    // A DNS query over TCP is still not inspected
    let packet = tcp_packet(&dns_query("blocked.example.com"));
    let decision = DecisionEngine::new(FailurePolicy::FailClosed).decide(&packet, &bl);
    assert_eq!(decision, PacketDecision::allow(Reason::PassThrough));
}

#[test]
fn test_non_dns_udp_is_pass_through() {
    let bl = BlockList::from_entries(["example.com"]);
    let packet = ipv4_packet(17, &udp_datagram(50000, 443, &dns_query("example.com")));
    let decision = DecisionEngine::default().decide(&packet, &bl);
    assert_eq!(decision, PacketDecision::allow(Reason::PassThrough));
}

#[test]
fn test_dns_response_from_port_53_inspected() {
    let bl = BlockList::from_entries(["example.com"]);
    let packet = ipv4_packet(17, &udp_datagram(53, 50000, &dns_query("example.com")));
    assert!(DecisionEngine::default().decide(&packet, &bl).is_block());
}

#[test]
fn test_header_longer_than_packet() {
    let mut packet = dns_packet("example.com");
    packet.truncate(24);
    packet[0] = 0x4F; // IHL 15 -> 60 byte header

    let ip = Ip4Header::from_bytes(&packet);
    assert!(!ip.is_valid());
    assert!(ip.payload().is_none());

    let decision = DecisionEngine::default().decide(&packet, &BlockList::new());
    assert_eq!(decision, PacketDecision::allow(Reason::InvalidIp));
}

#[test]
fn test_total_length_beyond_buffer() {
    let mut packet = dns_packet("example.com");
    packet[2] = 0xFF;
    packet[3] = 0xFF;
    assert!(!Ip4Header::from_bytes(&packet).is_valid());
}

#[test]
fn test_ipv6_rejected() {
    let mut packet = dns_packet("example.com");
    packet[0] = 0x65;
    let decision = DecisionEngine::default().decide(&packet, &BlockList::new());
    assert_eq!(decision.reason, Reason::InvalidIp);
}

#[test]
fn test_invalid_udp_length() {
    let mut packet = dns_packet("example.com");
    // UDP length field beyond the datagram
    packet[24] = 0xFF;
    packet[25] = 0xFF;

    let open = DecisionEngine::new(FailurePolicy::FailOpen).decide(&packet, &BlockList::new());
    assert_eq!(open, PacketDecision::allow(Reason::InvalidUdp));

    let closed = DecisionEngine::new(FailurePolicy::FailClosed).decide(&packet, &BlockList::new());
    assert_eq!(closed, PacketDecision::block(Reason::InvalidUdp));
}

#[test]
fn test_short_dns_payload() {
    let packet = ipv4_packet(17, &udp_datagram(50000, 53, &[0x12, 0x34, 0x01]));
    let decision = DecisionEngine::default().decide(&packet, &BlockList::new());
    assert_eq!(decision, PacketDecision::allow(Reason::NoDnsQuestion));
}

#[test]
fn test_compression_pointer_gives_partial_name() {
    let mut msg = dns_query("");
    msg.truncate(12);
    msg.extend_from_slice(&[3, b'a', b'd', b's', 0xC0, 0x0C]);

    let question = DnsQuestion::parse(ByteView::new(&msg)).unwrap();
    assert_eq!(question.name(), "ads");
    assert_eq!(question.end(), NameEnd::CompressionPointer);
    assert!(!question.is_complete());
    assert_eq!(question.qtype(), None);
}

#[test]
fn test_pointer_first_has_no_question() {
    let mut msg = dns_query("");
    msg.truncate(12);
    msg.extend_from_slice(&[0xC0, 0x0C]);
    assert!(DnsQuestion::parse(ByteView::new(&msg)).is_none());
}

#[test]
fn test_dns_message_header() {
    let msg = dns_query("example.com");
    let message = DnsMessage::parse(ByteView::new(&msg)).unwrap();
    assert_eq!(message.id(), 0x1234);
    assert!(!message.is_response());
    assert_eq!(message.question_count(), 1);
    assert!(DnsMessage::parse(ByteView::new(&msg[..11])).is_none());
}

/// Name the parser should recover from `labels` cut at byte `cut`
fn expected_prefix(labels: &[String], cut: usize) -> (String, bool) {
    let mut end = DNS_HEADER_LEN;
    let mut kept = Vec::new();
    for label in labels {
        end += 1 + label.len();
        if end > cut {
            return (kept.join("."), false);
        }
        kept.push(label.as_str());
    }
    (kept.join("."), cut > end)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_short_buffers_invalid(data in prop::collection::vec(any::<u8>(), 0..20)) {
        let ip = Ip4Header::from_bytes(&data);
        prop_assert!(!ip.is_valid());
        prop_assert!(ip.payload().is_none());
        prop_assert_eq!(ip.header_len(), 0);
    }

    #[test]
    fn prop_window_past_buffer_end(
        data in prop::collection::vec(any::<u8>(), 0..64),
        offset in 0usize..128,
        length in 0usize..256,
    ) {
        let _ = Ip4Header::parse(&data, offset, length);
        let _ = UdpHeader::parse(&data, offset, length);
    }

    #[test]
    fn prop_decide_never_panics(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let bl = BlockList::from_entries(["example.com"]);
        let decision = DecisionEngine::new(FailurePolicy::FailOpen).decide(&data, &bl);
        prop_assert_ne!(decision.reason, Reason::InternalError);
    }

    #[test]
    fn prop_mangled_dns_never_panics(
        labels in prop::collection::vec(any::<u8>(), 0..300),
    ) {
        let mut msg = dns_query("");
        msg.truncate(DNS_HEADER_LEN);
        msg.extend_from_slice(&labels);
        let packet = ipv4_packet(17, &udp_datagram(40000, 53, &msg));
        let decision = DecisionEngine::default().decide(&packet, &BlockList::from_entries(["a.b"]));
        prop_assert_ne!(decision.reason, Reason::InternalError);
    }

    #[test]
    fn prop_truncated_labels_give_longest_prefix(
        labels in prop::collection::vec("[a-z0-9]{1,20}", 1..6),
        cut_seed in any::<usize>(),
    ) {
        let msg = dns_query(&labels.join("."));
        let cut = DNS_HEADER_LEN + cut_seed % (msg.len() - DNS_HEADER_LEN + 1);
        let (expected, complete) = expected_prefix(&labels, cut);

        match DnsQuestion::parse(ByteView::new(&msg[..cut])) {
            Some(question) => {
                prop_assert_eq!(question.name(), expected);
                prop_assert_eq!(question.is_complete(), complete);
            }
            None => prop_assert!(expected.is_empty()),
        }
    }
}
