use core::fmt;
use byteorder::{ByteOrder, NetworkEndian};

use super::{Error, Result};
pub use super::IpProtocol as Protocol;

/// The length of the fixed IPv6 header.
pub const HEADER_LEN: usize = 40;

/// A sixteen-octet IPv6 address.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Address(pub [u8; 16]);

impl Address {
    /// The [unspecified address].
    ///
    /// [unspecified address]: https://tools.ietf.org/html/rfc4291#section-2.5.2
    pub const UNSPECIFIED: Address = Address([0x00; 16]);

    /// The link-local [all nodes multicast address].
    ///
    /// [all nodes multicast address]: https://tools.ietf.org/html/rfc4291#section-2.7.1
    pub const LINK_LOCAL_ALL_NODES: Address =
        Address([0xff, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
                 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01]);

    /// The [loopback address].
    ///
    /// [loopback address]: https://tools.ietf.org/html/rfc4291#section-2.5.3
    pub const LOOPBACK: Address =
        Address([0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
                 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01]);

    /// Construct an IPv6 address from its eight 16-bit groups.
    pub fn new(
        a0: u16, a1: u16, a2: u16, a3: u16,
        a4: u16, a5: u16, a6: u16, a7: u16,
    ) -> Address {
        let mut addr = [0u8; 16];
        let groups = [a0, a1, a2, a3, a4, a5, a6, a7];
        NetworkEndian::write_u16_into(&groups, &mut addr);
        Address(addr)
    }

    /// Construct an IPv6 address from a sequence of octets, in big-endian.
    ///
    /// # Panics
    /// The function panics if `data` is not sixteen octets long.
    pub fn from_bytes(data: &[u8]) -> Address {
        let mut bytes = [0; 16];
        bytes.copy_from_slice(data);
        Address(bytes)
    }

    /// Return an IPv6 address as a sequence of octets, in big-endian.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Query whether the IPv6 address is a [multicast address].
    ///
    /// [multicast address]: https://tools.ietf.org/html/rfc4291#section-2.7
    pub fn is_multicast(&self) -> bool {
        self.0[0] == 0xff
    }

    /// The 4-bit scope of a multicast address, `None` for other addresses.
    pub fn multicast_scope(&self) -> Option<u8> {
        if self.is_multicast() {
            Some(self.0[1] & 0x0f)
        } else {
            None
        }
    }

    /// Query whether this is a multicast group that a host may listen to.
    ///
    /// A scope of zero is reserved. So is the `ff0x::` group of every scope, which consists of
    /// nothing but the prefix and has no group ID.
    pub fn is_allowed_multicast(&self) -> bool {
        match self.multicast_scope() {
            None | Some(0) => false,
            Some(_) => self.0[1] & 0xf0 != 0 || self.0[2..] != [0; 14],
        }
    }

    /// Query whether the IPv6 address is the [unspecified address].
    ///
    /// [unspecified address]: https://tools.ietf.org/html/rfc4291#section-2.5.2
    pub fn is_unspecified(&self) -> bool {
        self.0 == [0x00; 16]
    }

    /// Query whether the IPv6 address is the [loopback address].
    ///
    /// [loopback address]: https://tools.ietf.org/html/rfc4291#section-2.5.3
    pub fn is_loopback(&self) -> bool {
        *self == Self::LOOPBACK
    }
}

impl fmt::Display for Address {
    /// Groups in hex, the first run of zero groups collapsed to `::`.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut groups = [0u16; 8];
        NetworkEndian::read_u16_into(&self.0, &mut groups);

        let zeros = groups.iter().position(|&group| group == 0);
        let (head, tail) = match zeros {
            Some(start) => {
                let end = groups[start..].iter()
                    .position(|&group| group != 0)
                    .map_or(groups.len(), |len| start + len);
                (&groups[..start], Some(&groups[end..]))
            },
            None => (&groups[..], None),
        };

        let write_all = |f: &mut fmt::Formatter, groups: &[u16]| -> fmt::Result {
            for (index, group) in groups.iter().enumerate() {
                if index > 0 {
                    f.write_str(":")?;
                }
                write!(f, "{:x}", group)?;
            }
            Ok(())
        };

        write_all(f, head)?;
        if let Some(tail) = tail {
            f.write_str("::")?;
            write_all(f, tail)?;
        }
        Ok(())
    }
}

byte_wrapper! {
    /// A byte sequence representing an IPv6 packet.
    #[derive(Debug, PartialEq, Eq)]
    pub struct ipv6([u8]);
}

// See https://tools.ietf.org/html/rfc8200#section-3 for details.
mod field {
    use crate::wire::field::Field;
    // 4-bit version number, 8-bit traffic class, and the
    // 20-bit flow label.
    pub(crate) const VER_TC_FLOW: Field = 0..4;
    // Length of the payload, extension headers included.
    pub(crate) const LENGTH:      Field = 4..6;
    pub(crate) const NXT_HDR:     usize = 6;
    pub(crate) const HOP_LIMIT:   usize = 7;
    pub(crate) const SRC_ADDR:    Field = 8..24;
    pub(crate) const DST_ADDR:    Field = 24..40;
}

impl ipv6 {
    /// Create a raw octet buffer with an IPv6 packet structure.
    #[inline]
    pub fn new_unchecked(buffer: &[u8]) -> &Self {
        Self::__from_macro_new_unchecked(buffer)
    }

    /// Create a raw octet buffer with an IPv6 packet structure.
    #[inline]
    pub fn new_unchecked_mut(buffer: &mut [u8]) -> &mut Self {
        Self::__from_macro_new_unchecked_mut(buffer)
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    #[inline]
    pub fn new_checked(buffer: &[u8]) -> Result<&Self> {
        let packet = Self::new_unchecked(buffer);
        packet.check_len()?;
        Ok(packet)
    }

    /// View the packet as a raw byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error::Truncated)` if the buffer is shorter than the fixed header and the
    /// declared payload.
    ///
    /// The result of this check is invalidated by calling [set_payload_len].
    ///
    /// [set_payload_len]: #method.set_payload_len
    #[inline]
    pub fn check_len(&self) -> Result<()> {
        let len = self.0.len();
        if len < HEADER_LEN || len < self.total_len() {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    /// Return the version field.
    #[inline]
    pub fn version(&self) -> u8 {
        self.0[field::VER_TC_FLOW.start] >> 4
    }

    /// Return the payload length field.
    ///
    /// This includes all extension headers.
    #[inline]
    pub fn payload_len(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::LENGTH])
    }

    /// Return the payload length added to the fixed header length.
    #[inline]
    pub fn total_len(&self) -> usize {
        HEADER_LEN + usize::from(self.payload_len())
    }

    /// Return the next header field.
    #[inline]
    pub fn next_header(&self) -> Protocol {
        Protocol::from(self.0[field::NXT_HDR])
    }

    /// Return the hop limit field.
    #[inline]
    pub fn hop_limit(&self) -> u8 {
        self.0[field::HOP_LIMIT]
    }

    /// Return the source address field.
    #[inline]
    pub fn src_addr(&self) -> Address {
        Address::from_bytes(&self.0[field::SRC_ADDR])
    }

    /// Return the destination address field.
    #[inline]
    pub fn dst_addr(&self) -> Address {
        Address::from_bytes(&self.0[field::DST_ADDR])
    }

    /// Set the version field.
    #[inline]
    pub fn set_version(&mut self, value: u8) {
        // Retain the higher order bits of the traffic class.
        self.0[0] = (self.0[0] & 0x0f) | ((value & 0x0f) << 4);
    }

    /// Set the payload length field.
    #[inline]
    pub fn set_payload_len(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::LENGTH], value);
    }

    /// Set the next header field.
    #[inline]
    pub fn set_next_header(&mut self, value: Protocol) {
        self.0[field::NXT_HDR] = value.into();
    }

    /// Set the hop limit field.
    #[inline]
    pub fn set_hop_limit(&mut self, value: u8) {
        self.0[field::HOP_LIMIT] = value;
    }

    /// Set the source address field.
    #[inline]
    pub fn set_src_addr(&mut self, value: Address) {
        self.0[field::SRC_ADDR].copy_from_slice(value.as_bytes());
    }

    /// Set the destination address field.
    #[inline]
    pub fn set_dst_addr(&mut self, value: Address) {
        self.0[field::DST_ADDR].copy_from_slice(value.as_bytes());
    }

    /// The payload, starting with the first extension header if there is any.
    #[inline]
    pub fn payload_slice(&self) -> &[u8] {
        &self.0[HEADER_LEN..self.total_len()]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    static LINK_LOCAL_ADDR: Address = Address([0xfe, 0x80, 0x00, 0x00,
                                               0x00, 0x00, 0x00, 0x00,
                                               0x00, 0x00, 0x00, 0x00,
                                               0x00, 0x00, 0x00, 0x01]);

    #[test]
    fn multicast_scope() {
        assert!(Address::LINK_LOCAL_ALL_NODES.is_multicast());
        assert_eq!(Address::LINK_LOCAL_ALL_NODES.multicast_scope(), Some(2));
        assert_eq!(LINK_LOCAL_ADDR.multicast_scope(), None);
        assert!(!Address::LOOPBACK.is_multicast());
        assert!(Address::LOOPBACK.is_loopback());
        assert!(Address::UNSPECIFIED.is_unspecified());
    }

    #[test]
    fn allowed_multicast() {
        assert!(Address::LINK_LOCAL_ALL_NODES.is_allowed_multicast());
        // Scope zero is reserved.
        assert!(!Address::new(0xff00, 0, 0, 0, 0, 0, 0, 1).is_allowed_multicast());
        // The reserved group without id.
        assert!(!Address::new(0xff02, 0, 0, 0, 0, 0, 0, 0).is_allowed_multicast());
        assert!(!Address::new(0xff05, 0, 0, 0, 0, 0, 0, 0).is_allowed_multicast());
        // Flags make it a different group.
        assert!(Address::new(0xff12, 0, 0, 0, 0, 0, 0, 0).is_allowed_multicast());
        assert!(!LINK_LOCAL_ADDR.is_allowed_multicast());
    }

    #[test]
    fn address_format() {
        assert_eq!("ff02::1", format!("{}", Address::LINK_LOCAL_ALL_NODES));
        assert_eq!("fe80::1", format!("{}", LINK_LOCAL_ADDR));
        assert_eq!("fe80::7f00:0:1",
            format!("{}", Address::new(0xfe80, 0, 0, 0, 0, 0x7f00, 0x0000, 0x0001)));
        assert_eq!("2001:db8:1:2:3:4:5:6",
            format!("{}", Address::new(0x2001, 0xdb8, 1, 2, 3, 4, 5, 6)));
        assert_eq!("1::", format!("{}", Address::new(1, 0, 0, 0, 0, 0, 0, 0)));
        assert_eq!("::", format!("{}", Address::UNSPECIFIED));
        assert_eq!("::1", format!("{}", Address::LOOPBACK));
    }

    // A UDP datagram from fe80::1 to all nodes, behind no extension headers.
    static PACKET_BYTES: [u8; 52] = [0x60, 0x00, 0x00, 0x00,
                                     0x00, 0x0c, 0x11, 0x40,
                                     0xfe, 0x80, 0x00, 0x00,
                                     0x00, 0x00, 0x00, 0x00,
                                     0x00, 0x00, 0x00, 0x00,
                                     0x00, 0x00, 0x00, 0x01,
                                     0xff, 0x02, 0x00, 0x00,
                                     0x00, 0x00, 0x00, 0x00,
                                     0x00, 0x00, 0x00, 0x00,
                                     0x00, 0x00, 0x00, 0x01,
                                     0x00, 0x01, 0x00, 0x02,
                                     0x00, 0x0c, 0x02, 0x4e,
                                     0xff, 0xff, 0xff, 0xff];

    #[test]
    fn fields() {
        let packet = ipv6::new_checked(&PACKET_BYTES[..]).unwrap();
        assert_eq!(packet.version(), 6);
        assert_eq!(packet.total_len(), 52);
        assert_eq!(packet.payload_len(), 12);
        assert_eq!(packet.next_header(), Protocol::Udp);
        assert_eq!(packet.hop_limit(), 0x40);
        assert_eq!(packet.src_addr(), LINK_LOCAL_ADDR);
        assert_eq!(packet.dst_addr(), Address::LINK_LOCAL_ALL_NODES);
        assert_eq!(packet.payload_slice(), &PACKET_BYTES[40..]);
    }

    #[test]
    fn rewrite_after_strip() {
        let mut bytes = PACKET_BYTES;
        let packet = ipv6::new_unchecked_mut(&mut bytes[..]);
        packet.set_next_header(Protocol::Tcp);
        packet.set_payload_len(4);
        assert_eq!(packet.version(), 6);
        assert_eq!(packet.next_header(), Protocol::Tcp);
        assert_eq!(packet.payload_slice(), &PACKET_BYTES[40..44]);
    }

    #[test]
    fn payload_beyond_buffer() {
        let mut bytes = PACKET_BYTES;
        ipv6::new_unchecked_mut(&mut bytes[..]).set_payload_len(0x80);
        assert_eq!(ipv6::new_checked(&bytes).map(|_| ()), Err(Error::Truncated));
        assert_eq!(ipv6::new_checked(&bytes[..39]).map(|_| ()), Err(Error::Truncated));
    }
}
