//! Packet type definitions

/// Transport protocol carried by an IPv4 packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// TCP (protocol number 6)
    Tcp,
    /// UDP (protocol number 17)
    Udp,
    /// ICMP (protocol number 1)
    Icmp,
    /// Unknown protocol
    Unknown,
}

impl Protocol {
    /// Create from protocol number
    pub fn from_u8(proto: u8) -> Self {
        match proto {
            1 => Protocol::Icmp,
            6 => Protocol::Tcp,
            17 => Protocol::Udp,
            _ => Protocol::Unknown,
        }
    }
}

/// Common well-known ports
pub mod ports {
    /// DNS port
    pub const DNS: u16 = 53;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_from_u8() {
        assert_eq!(Protocol::from_u8(6), Protocol::Tcp);
        assert_eq!(Protocol::from_u8(17), Protocol::Udp);
        assert_eq!(Protocol::from_u8(1), Protocol::Icmp);
        assert_eq!(Protocol::from_u8(58), Protocol::Unknown);
        assert_eq!(Protocol::from_u8(0), Protocol::Unknown);
        assert_eq!(Protocol::from_u8(255), Protocol::Unknown);
    }
}
