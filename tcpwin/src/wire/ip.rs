use core::fmt;

enum_with_unknown! {
    /// IP datagram encapsulated protocol.
    ///
    /// For IPv6 this is the value space of the `next header` field, which also identifies the
    /// extension headers that may be chained between the fixed header and the upper layer.
    pub doc enum Protocol(u8) {
        /// IPv6 hop-by-hop options.
        HopByHop  = 0x00,
        /// Internet control message protocol.
        Icmp      = 0x01,
        /// Internet group management protocol.
        Igmp      = 0x02,
        /// Transmission control protocol.
        Tcp       = 0x06,
        /// User datagram protocol.
        Udp       = 0x11,
        /// IPv6 routing header.
        Ipv6Route = 0x2b,
        /// IPv6 fragment header.
        Ipv6Frag  = 0x2c,
        /// Encapsulating security payload.
        Esp       = 0x32,
        /// Authentication header.
        Ah        = 0x33,
        /// Internet control message protocol for IPv6.
        Icmpv6    = 0x3a,
        /// No next header for IPv6.
        Ipv6NoNxt = 0x3b,
        /// IPv6 destination options.
        Ipv6Opts  = 0x3c,
        /// IPv6 mobility header.
        Mobility  = 0x87,
    }
}

impl Protocol {
    /// Whether this identifies one of the chained IPv6 extension headers.
    pub fn is_extension_header(self) -> bool {
        match self {
            Protocol::HopByHop
            | Protocol::Ipv6Route
            | Protocol::Ipv6Frag
            | Protocol::Esp
            | Protocol::Ah
            | Protocol::Ipv6Opts
            | Protocol::Mobility => true,
            _ => false,
        }
    }

    /// Whether the upper layer is handed to a transport after the filter.
    pub fn is_transport(self) -> bool {
        match self {
            Protocol::Tcp | Protocol::Udp | Protocol::Icmp | Protocol::Icmpv6 | Protocol::Igmp => true,
            _ => false,
        }
    }

    /// The minimum length of the upper layer header.
    ///
    /// `None` for all protocols without a transport behind the filter.
    pub fn min_header_len(self) -> Option<usize> {
        match self {
            Protocol::Tcp => Some(20),
            Protocol::Udp => Some(8),
            Protocol::Icmp | Protocol::Icmpv6 => Some(8),
            Protocol::Igmp => Some(8),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Protocol::HopByHop    => write!(f, "Hop-by-Hop"),
            Protocol::Icmp        => write!(f, "ICMP"),
            Protocol::Igmp        => write!(f, "IGMP"),
            Protocol::Tcp         => write!(f, "TCP"),
            Protocol::Udp         => write!(f, "UDP"),
            Protocol::Ipv6Route   => write!(f, "IPv6-Route"),
            Protocol::Ipv6Frag    => write!(f, "IPv6-Frag"),
            Protocol::Esp         => write!(f, "ESP"),
            Protocol::Ah          => write!(f, "AH"),
            Protocol::Icmpv6      => write!(f, "ICMPv6"),
            Protocol::Ipv6NoNxt   => write!(f, "IPv6-NoNxt"),
            Protocol::Ipv6Opts    => write!(f, "IPv6-Opts"),
            Protocol::Mobility    => write!(f, "Mobility"),
            Protocol::Unknown(id) => write!(f, "0x{:02x}", id)
        }
    }
}

/// The RFC 1071 internet checksum.
pub mod checksum {
    use byteorder::{ByteOrder, NetworkEndian};

    use super::Protocol;

    /// The folded sum of a correctly checksummed range, including its checksum field.
    pub const CORRECT: u16 = 0xffff;

    fn propagate_carries(word: u32) -> u16 {
        let sum = (word >> 16) + (word & 0xffff);
        ((sum >> 16) as u16) + (sum as u16)
    }

    /// Compute an RFC 1071 compliant checksum (without the final complement).
    pub fn data(mut data: &[u8]) -> u16 {
        let mut accum = 0;

        // For each 32-byte chunk...
        const CHUNK_SIZE: usize = 32;
        while data.len() >= CHUNK_SIZE {
            let mut d = &data[..CHUNK_SIZE];
            // ... take by 2 bytes and sum them.
            while d.len() >= 2 {
                accum += NetworkEndian::read_u16(d) as u32;
                d = &d[2..];
            }

            data = &data[CHUNK_SIZE..];
        }

        // Sum the rest that does not fit the last 32-byte chunk,
        // taking by 2 bytes.
        while data.len() >= 2 {
            accum += NetworkEndian::read_u16(data) as u32;
            data = &data[2..];
        }

        // Add the last remaining odd byte, if any.
        if let Some(&value) = data.first() {
            accum += (value as u32) << 8;
        }

        propagate_carries(accum)
    }

    /// Combine several RFC 1071 compliant checksums.
    pub fn combine(checksums: &[u16]) -> u16 {
        let mut accum: u32 = 0;
        for &word in checksums {
            accum += word as u32;
        }
        propagate_carries(accum)
    }

    /// Compute an IP pseudo header checksum.
    ///
    /// The addresses are either both four octets (IPv4) or both sixteen octets (IPv6) long. The
    /// layout of the length and protocol fields follows from that.
    pub fn pseudo_header(src_addr: &[u8], dst_addr: &[u8], protocol: Protocol, length: u32) -> u16 {
        if src_addr.len() == 4 {
            let mut proto_len = [0u8; 4];
            proto_len[1] = protocol.into();
            NetworkEndian::write_u16(&mut proto_len[2..4], length as u16);

            combine(&[
                data(src_addr),
                data(dst_addr),
                data(&proto_len[..])
            ])
        } else {
            let mut proto_len = [0u8; 8];
            proto_len[7] = protocol.into();
            NetworkEndian::write_u32(&mut proto_len[0..4], length);
            combine(&[
                data(src_addr),
                data(dst_addr),
                data(&proto_len[..])
            ])
        }
    }
}
