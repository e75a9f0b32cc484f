//! The chain of IPv6 extension headers.
//!
//! The fixed IPv6 header names the type of the header that follows it. That may be the upper
//! layer or one of the extension headers, each of which again names its successor. All nodes of
//! the chain are read through a [`Cursor`] as their lengths are only known while walking.
//!
//! Receivers accept extension headers in any order, as [RFC 8200, section 4.1] demands. The one
//! exception is the hop-by-hop options, which may only appear directly after the fixed header.
//!
//! [`Cursor`]: ../../wire/cursor/struct.Cursor.html
//! [RFC 8200, section 4.1]: https://tools.ietf.org/html/rfc8200#section-4.1
use crate::wire::{
    cursor, ipv6_packet, Cursor, Error, IpProtocol, Result, ETHERNET_HEADER_LEN, IPV6_HEADER_LEN};

/// The upper layer protocol and the extension headers in front of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Chain {
    /// The protocol of the upper layer header following the chain.
    pub protocol: IpProtocol,
    /// The combined length of all extension headers, zero if there are none.
    pub length: usize,
}

fn is_extension(protocol: IpProtocol) -> bool {
    match protocol {
        IpProtocol::HopByHop
        | IpProtocol::Ipv6Opts
        | IpProtocol::Ipv6Route
        | IpProtocol::Ipv6Frag
        | IpProtocol::Ah
        | IpProtocol::Mobility => true,
        _ => false,
    }
}

/// Walk the extension headers of a packet.
///
/// Returns the upper layer protocol and where its header begins relative to the end of the fixed
/// header. Chains that run past the payload are `Truncated`, a hop-by-hop header after the first
/// node is `Malformed`. Payloads behind ESP and non-initial fragments are `Unsupported`, they can
/// not be inspected without decryption or reassembly.
pub fn walk(packet: &ipv6_packet) -> Result<Chain> {
    let payload = Cursor::new(packet.payload_slice());
    let mut protocol = packet.next_header();
    let mut length = 0;

    loop {
        match protocol {
            IpProtocol::Tcp | IpProtocol::Udp | IpProtocol::Icmpv6 => {
                return Ok(Chain { protocol, length });
            },
            IpProtocol::HopByHop if length != 0 => return Err(Error::Malformed),
            IpProtocol::Esp => return Err(Error::Unsupported),
            _ => (),
        }

        if !is_extension(protocol) {
            return Err(Error::Unrecognized);
        }

        let next = IpProtocol::from(payload.read_u8(length)?);
        let node_len = match protocol {
            // Counted in units of four octets, not including the first eight.
            IpProtocol::Ah => (usize::from(payload.read_u8(length + 1)?) + 2) * 4,
            IpProtocol::Ipv6Frag => {
                let offset_flags = payload.read_u16(length + 2)?;
                if offset_flags & 0xfff9 != 0 {
                    return Err(Error::Unsupported);
                }
                8
            },
            _ => 8 + 8 * usize::from(payload.read_u8(length + 1)?),
        };

        // The whole node must be there, not only its first octets.
        payload.slice(length..length + node_len)?;

        net_trace!("filter: ipv6 extension {} of {} octets", protocol, node_len);
        length += node_len;
        protocol = next;
    }
}

/// Cut the extension headers out of an Ethernet frame carrying an IPv6 packet.
///
/// The upper layer header is moved directly behind the fixed header, and the next header and
/// payload length fields are rewritten. Returns the new length of the frame up to the end of the
/// packet.
pub fn strip_extension_headers(frame: &mut [u8], chain: &Chain) -> Result<usize> {
    let ip = frame.get(ETHERNET_HEADER_LEN..).ok_or(Error::Truncated)?;
    let payload_len = usize::from(ipv6_packet::new_checked(ip)?.payload_len());
    if chain.length >= payload_len {
        return Err(Error::Malformed);
    }

    let start = ETHERNET_HEADER_LEN + IPV6_HEADER_LEN;
    let end = start + payload_len;
    let frame_len = cursor::remove_range(frame, start..start + chain.length, end)?;

    let packet = ipv6_packet::new_unchecked_mut(&mut frame[ETHERNET_HEADER_LEN..]);
    packet.set_next_header(chain.protocol);
    packet.set_payload_len((payload_len - chain.length) as u16);

    net_trace!("filter: stripped {} octets of ipv6 extension headers", chain.length);
    Ok(frame_len)
}
