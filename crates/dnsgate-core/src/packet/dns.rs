//! DNS message header and first-question view
//!
//! Only the fixed header and the first question name are decoded.
//!
//! ```text
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                      ID                       |
//! |QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE   |
//! |                    QDCOUNT                    |
//! |                    ANCOUNT                    |
//! |                    NSCOUNT                    |
//! |                    ARCOUNT                    |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! |                 QNAME / QTYPE / QCLASS        |
//! +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! ```
//!
//! Compression pointers are not followed. A query's first name starts right
//! after the header, so a pointer there can only reference header bytes;
//! decoding stops and the labels read so far are reported as a partial name.

use super::view::ByteView;
use std::fmt;

/// Fixed DNS header length
pub const DNS_HEADER_LEN: usize = 12;

/// Maximum length of a single label
pub const MAX_LABEL_LEN: u8 = 63;

const POINTER_MASK: u8 = 0xC0;

/// How decoding of the question name ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameEnd {
    /// Reached the zero-length root label
    Terminated,
    /// Ran out of bytes mid-name
    Truncated,
    /// Hit a compression pointer, which is not followed
    CompressionPointer,
}

impl NameEnd {
    /// Whether the name was fully decoded
    pub fn is_complete(self) -> bool {
        matches!(self, NameEnd::Terminated)
    }
}

/// View over a DNS message carried in a UDP payload
#[derive(Debug, Clone, Copy)]
pub struct DnsMessage<'a> {
    view: ByteView<'a>,
}

impl<'a> DnsMessage<'a> {
    /// Wrap a payload, `None` if it cannot hold the fixed header
    pub fn parse(payload: ByteView<'a>) -> Option<Self> {
        if payload.len() < DNS_HEADER_LEN {
            return None;
        }
        Some(Self { view: payload })
    }

    /// Transaction ID
    pub fn id(&self) -> u16 {
        self.view.u16_at(0).unwrap_or(0)
    }

    /// QR bit: true for responses
    pub fn is_response(&self) -> bool {
        self.view.u8_at(2).map_or(false, |b| b & 0x80 != 0)
    }

    /// QDCOUNT field
    pub fn question_count(&self) -> u16 {
        self.view.u16_at(4).unwrap_or(0)
    }

    /// Decode the first question
    ///
    /// Returns `None` when no label could be decoded or a label length byte
    /// uses one of the reserved label types (64-191).
    pub fn question(&self) -> Option<DnsQuestion<'a>> {
        let view = self.view;
        let mut pos = DNS_HEADER_LEN;
        let mut label_count = 0usize;

        let end = loop {
            let Some(len) = view.u8_at(pos) else {
                break NameEnd::Truncated;
            };
            if len == 0 {
                pos += 1;
                break NameEnd::Terminated;
            }
            if len & POINTER_MASK == POINTER_MASK {
                break NameEnd::CompressionPointer;
            }
            if len > MAX_LABEL_LEN {
                return None;
            }
            if view.slice(pos + 1, usize::from(len)).is_none() {
                break NameEnd::Truncated;
            }
            pos += 1 + usize::from(len);
            label_count += 1;
        };

        if label_count == 0 {
            return None;
        }

        let (qtype, qclass) = if end.is_complete() {
            (view.u16_at(pos), view.u16_at(pos + 2))
        } else {
            (None, None)
        };

        Some(DnsQuestion {
            view,
            label_count,
            end,
            qtype,
            qclass,
        })
    }
}

/// First question of a DNS message
///
/// Holds only offsets into the message; the name is assembled on demand.
#[derive(Debug, Clone, Copy)]
pub struct DnsQuestion<'a> {
    view: ByteView<'a>,
    label_count: usize,
    end: NameEnd,
    qtype: Option<u16>,
    qclass: Option<u16>,
}

impl<'a> DnsQuestion<'a> {
    /// Decode the first question of a UDP payload
    pub fn parse(payload: ByteView<'a>) -> Option<Self> {
        DnsMessage::parse(payload)?.question()
    }

    /// Iterate over the raw labels
    pub fn labels(&self) -> Labels<'a> {
        Labels {
            view: self.view,
            pos: DNS_HEADER_LEN,
            remaining: self.label_count,
        }
    }

    /// Number of decoded labels
    pub fn label_count(&self) -> usize {
        self.label_count
    }

    /// Dotted name built from the decoded labels
    pub fn name(&self) -> String {
        let mut name = String::new();
        for (i, label) in self.labels().enumerate() {
            if i > 0 {
                name.push('.');
            }
            name.push_str(&String::from_utf8_lossy(label));
        }
        name
    }

    /// How decoding ended
    pub fn end(&self) -> NameEnd {
        self.end
    }

    /// Whether the name was fully decoded
    pub fn is_complete(&self) -> bool {
        self.end.is_complete()
    }

    /// QTYPE, available only after a complete name
    pub fn qtype(&self) -> Option<u16> {
        self.qtype
    }

    /// QCLASS, available only after a complete name
    pub fn qclass(&self) -> Option<u16> {
        self.qclass
    }
}

impl fmt::Display for DnsQuestion<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Iterator over already validated labels of a question name
#[derive(Debug, Clone)]
pub struct Labels<'a> {
    view: ByteView<'a>,
    pos: usize,
    remaining: usize,
}

impl<'a> Iterator for Labels<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let len = usize::from(self.view.u8_at(self.pos)?);
        let label = self.view.slice(self.pos + 1, len)?;
        self.pos += 1 + len;
        self.remaining -= 1;
        Some(label)
    }
}
