//! Packet builders shared by the integration tests

#![allow(dead_code)]

/// DNS query message (header + one question) for `name`
pub fn dns_query(name: &str) -> Vec<u8> {
    let mut msg = vec![
        0x12, 0x34, // ID
        0x01, 0x00, // Flags: standard query, RD
        0x00, 0x01, // QDCOUNT
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // AN/NS/AR counts
    ];
    for label in name.split('.').filter(|l| !l.is_empty()) {
        msg.push(label.len() as u8);
        msg.extend_from_slice(label.as_bytes());
    }
    msg.push(0x00);
    msg.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]); // A, IN
    msg
}

/// IPv4 packet with the given protocol number and transport bytes
pub fn ipv4_packet(protocol: u8, transport: &[u8]) -> Vec<u8> {
    let total_len = (20 + transport.len()) as u16;
    let mut packet = vec![
        0x45, 0x00, // Version 4, IHL 5
        (total_len >> 8) as u8, (total_len & 0xFF) as u8,
        0x00, 0x01, 0x00, 0x00, // Identification, Flags, Fragment Offset
        0x40, protocol, 0x00, 0x00, // TTL 64, Protocol, Checksum
        0x0A, 0x00, 0x00, 0x02, // Source IP: 10.0.0.2
        0x08, 0x08, 0x08, 0x08, // Dest IP: 8.8.8.8
    ];
    packet.extend_from_slice(transport);
    packet
}

/// UDP datagram between the given ports
pub fn udp_datagram(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let len = (8 + payload.len()) as u16;
    let mut datagram = vec![
        (src_port >> 8) as u8, (src_port & 0xFF) as u8,
        (dst_port >> 8) as u8, (dst_port & 0xFF) as u8,
        (len >> 8) as u8, (len & 0xFF) as u8,
        0x00, 0x00, // Checksum
    ];
    datagram.extend_from_slice(payload);
    datagram
}

/// Complete IPv4/UDP/DNS query packet to port 53
pub fn dns_packet(name: &str) -> Vec<u8> {
    ipv4_packet(17, &udp_datagram(50000, 53, &dns_query(name)))
}

/// IPv4/TCP packet carrying `payload`
pub fn tcp_packet(payload: &[u8]) -> Vec<u8> {
    let mut segment = vec![
        0x04, 0xD2, 0x00, 0x35, // Src Port (1234), Dst Port (53)
        0x00, 0x00, 0x00, 0x01, // Sequence Number
        0x00, 0x00, 0x00, 0x00, // Acknowledgment Number
        0x50, 0x18, 0xFF, 0xFF, // Data Offset, PSH+ACK, Window
        0x00, 0x00, 0x00, 0x00, // Checksum, Urgent Pointer
    ];
    segment.extend_from_slice(payload);
    ipv4_packet(6, &segment)
}
