//! UDP header view

use super::types::ports;
use super::view::ByteView;

/// Read-only view of a UDP header
#[derive(Debug, Clone, Copy)]
pub struct UdpHeader<'a> {
    view: ByteView<'a>,
    valid: bool,
    source_port: u16,
    destination_port: u16,
    length: usize,
}

impl<'a> UdpHeader<'a> {
    /// UDP header length (fixed)
    pub const HEADER_LEN: usize = 8;

    /// Parse `length` bytes of `buffer` starting at `offset`
    pub fn parse(buffer: &'a [u8], offset: usize, length: usize) -> Self {
        Self::from_view(ByteView::window(buffer, offset, length))
    }

    /// Parse from an existing view (typically an IPv4 payload)
    pub fn from_view(view: ByteView<'a>) -> Self {
        let (Some(source_port), Some(destination_port), Some(length)) =
            (view.u16_at(0), view.u16_at(2), view.u16_at(4))
        else {
            return Self {
                view,
                valid: false,
                source_port: 0,
                destination_port: 0,
                length: 0,
            };
        };

        let length = usize::from(length);
        let valid = view.len() >= Self::HEADER_LEN
            && length >= Self::HEADER_LEN
            && length <= view.len();

        Self {
            view,
            valid,
            source_port,
            destination_port,
            length,
        }
    }

    /// Whether the header passed validation
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Source port
    pub fn source_port(&self) -> u16 {
        self.source_port
    }

    /// Destination port
    pub fn destination_port(&self) -> u16 {
        self.destination_port
    }

    /// Length field (header + payload)
    pub fn length(&self) -> usize {
        self.length
    }

    /// Header length, always 8
    pub fn header_len(&self) -> usize {
        Self::HEADER_LEN
    }

    /// Whether either port is the DNS port
    pub fn is_dns(&self) -> bool {
        self.source_port == ports::DNS || self.destination_port == ports::DNS
    }

    /// Datagram payload bounded by the length field, `None` unless valid
    pub fn payload(&self) -> Option<ByteView<'a>> {
        if !self.valid {
            return None;
        }
        self.view
            .subview(Self::HEADER_LEN, self.length - Self::HEADER_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let data = [0xC3, 0x50, 0x00, 0x35, 0x00, 0x0A, 0x00, 0x00, 0xAA, 0xBB];
        let header = UdpHeader::parse(&data, 0, data.len());

        assert!(header.is_valid());
        assert_eq!(header.source_port(), 50000);
        assert_eq!(header.destination_port(), 53);
        assert_eq!(header.length(), 10);
        assert!(header.is_dns());
        assert_eq!(header.payload().map(|p| p.as_bytes()), Some(&[0xAA, 0xBB][..]));
    }

    #[test]
    fn test_payload_bounded_by_length_field() {
        let data = [0x00, 0x35, 0x30, 0x39, 0x00, 0x09, 0x00, 0x00, 0x01, 0x02, 0x03];
        let header = UdpHeader::parse(&data, 0, data.len());
        assert!(header.is_valid());
        assert_eq!(header.payload().map(|p| p.len()), Some(1));
    }

    #[test]
    fn test_too_short() {
        let data = [0x00, 0x35, 0x00, 0x35, 0x00, 0x08, 0x00];
        let header = UdpHeader::parse(&data, 0, data.len());
        assert!(!header.is_valid());
        assert!(header.payload().is_none());
    }

    #[test]
    fn test_length_field_out_of_range() {
        let below = [0x00, 0x35, 0x00, 0x35, 0x00, 0x07, 0x00, 0x00];
        assert!(!UdpHeader::parse(&below, 0, below.len()).is_valid());

        let above = [0x00, 0x35, 0x00, 0x35, 0x00, 0x09, 0x00, 0x00];
        assert!(!UdpHeader::parse(&above, 0, above.len()).is_valid());
    }

    #[test]
    fn test_not_dns() {
        let data = [0x01, 0xBB, 0x01, 0xBB, 0x00, 0x08, 0x00, 0x00];
        let header = UdpHeader::parse(&data, 0, data.len());
        assert!(header.is_valid());
        assert!(!header.is_dns());
    }
}
