//! Packet parsing
//!
//! Pure, stateless views over raw IPv4 packets read from the tunnel. None of
//! the parsers copy packet bytes or panic on malformed input; invalidity is
//! reported through `is_valid()` or an `Option`.

mod dns;
mod ipv4;
mod types;
mod udp;
mod view;

pub use dns::{DnsMessage, DnsQuestion, Labels, NameEnd, DNS_HEADER_LEN, MAX_LABEL_LEN};
pub use ipv4::Ip4Header;
pub use types::*;
pub use udp::UdpHeader;
pub use view::ByteView;

/// Largest packet read from the tunnel in one call
pub const MAX_PACKET_SIZE: usize = 32767;
