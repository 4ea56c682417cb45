//! IPv4 header view

use super::types::Protocol;
use super::view::ByteView;
use std::net::Ipv4Addr;

/// Read-only view of an IPv4 header
///
/// Derived fields are only meaningful once [`Ip4Header::is_valid`] returns
/// true. For inputs shorter than the 20-byte minimum no field is read at all
/// and every accessor reports zero.
#[derive(Debug, Clone, Copy)]
pub struct Ip4Header<'a> {
    view: ByteView<'a>,
    valid: bool,
    version: u8,
    header_len: usize,
    total_len: usize,
    protocol: u8,
    source: Ipv4Addr,
    destination: Ipv4Addr,
}

impl<'a> Ip4Header<'a> {
    /// Minimum IPv4 header length
    pub const MIN_HEADER_LEN: usize = 20;

    /// Parse `length` bytes of `buffer` starting at `offset`
    pub fn parse(buffer: &'a [u8], offset: usize, length: usize) -> Self {
        Self::from_view(ByteView::window(buffer, offset, length))
    }

    /// Parse a whole packet
    pub fn from_bytes(packet: &'a [u8]) -> Self {
        Self::from_view(ByteView::new(packet))
    }

    /// Parse from an existing view
    pub fn from_view(view: ByteView<'a>) -> Self {
        let mut header = Self {
            view,
            valid: false,
            version: 0,
            header_len: 0,
            total_len: 0,
            protocol: 0,
            source: Ipv4Addr::UNSPECIFIED,
            destination: Ipv4Addr::UNSPECIFIED,
        };

        if view.len() < Self::MIN_HEADER_LEN {
            return header;
        }

        // The length check above guarantees these reads succeed; the
        // fallbacks only keep the code panic-free.
        let first = view.u8_at(0).unwrap_or(0);
        header.version = first >> 4;
        header.header_len = usize::from(first & 0x0F) * 4;
        header.total_len = usize::from(view.u16_at(2).unwrap_or(0));
        header.protocol = view.u8_at(9).unwrap_or(0);
        header.source = view.array_at::<4>(12).map(Ipv4Addr::from).unwrap_or(Ipv4Addr::UNSPECIFIED);
        header.destination = view.array_at::<4>(16).map(Ipv4Addr::from).unwrap_or(Ipv4Addr::UNSPECIFIED);

        header.valid = header.version == 4
            && header.header_len >= Self::MIN_HEADER_LEN
            && header.header_len <= view.len()
            && header.total_len <= view.len();

        header
    }

    /// Whether the header passed validation
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// IP version nibble
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Header length in bytes (IHL × 4)
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Total length field
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    /// Length of the parsed byte range
    pub fn packet_len(&self) -> usize {
        self.view.len()
    }

    /// Raw protocol number
    pub fn protocol_number(&self) -> u8 {
        self.protocol
    }

    /// Transport protocol
    pub fn protocol(&self) -> Protocol {
        Protocol::from_u8(self.protocol)
    }

    /// Source address (formats as dotted decimal)
    pub fn source(&self) -> Ipv4Addr {
        self.source
    }

    /// Destination address (formats as dotted decimal)
    pub fn destination(&self) -> Ipv4Addr {
        self.destination
    }

    /// Bytes following the header, `None` unless the header is valid
    pub fn payload(&self) -> Option<ByteView<'a>> {
        if !self.valid {
            return None;
        }
        self.view.tail(self.header_len)
    }
}
