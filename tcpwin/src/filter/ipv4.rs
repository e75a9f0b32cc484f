use crate::wire::{
    checksum, cursor, ipv4_packet, Checksum, Error, IpProtocol, Ipv4Address, Result,
    ETHERNET_HEADER_LEN, IPV4_MIN_HEADER_LEN};

use super::{check_upper_layer, transport_header_len, ChecksumProvider, Config, PacketSummary};

pub(super) fn admit<P: ChecksumProvider>(config: &Config, provider: &P, frame: &mut [u8])
    -> Result<PacketSummary>
{
    if frame.len() < ETHERNET_HEADER_LEN + IPV4_MIN_HEADER_LEN {
        return Err(Error::Truncated);
    }

    let (header_len, total_len, protocol, src_addr) = {
        let packet = ipv4_packet::new_unchecked(&frame[ETHERNET_HEADER_LEN..]);
        if packet.version() != 4 {
            return Err(Error::Malformed);
        }
        packet.check_len()?;

        if packet.more_frags() || packet.frag_offset() != 0 {
            return Err(Error::Unsupported);
        }

        let src_addr = packet.src_addr();
        let dst_addr = packet.dst_addr();
        check_addresses(config, src_addr, dst_addr)?;

        if config.checksum == Checksum::Manual
            && provider.header(packet.header_slice()) != checksum::CORRECT
        {
            return Err(Error::WrongChecksum);
        }

        (usize::from(packet.header_len()), usize::from(packet.total_len()), packet.protocol(), src_addr)
    };

    let (header_len, total_len) = if header_len > IPV4_MIN_HEADER_LEN {
        if !config.strip_ipv4_options {
            return Err(Error::Unsupported);
        }
        strip_options(frame, header_len, total_len)?
    } else {
        (header_len, total_len)
    };

    match protocol {
        IpProtocol::Tcp | IpProtocol::Udp | IpProtocol::Icmp | IpProtocol::Igmp => (),
        _ => return Err(Error::Unrecognized),
    }

    let segment_start = ETHERNET_HEADER_LEN + header_len;
    let segment_end = ETHERNET_HEADER_LEN + total_len;
    let protocol_header_len = transport_header_len(protocol, &frame[segment_start..segment_end])?;

    let summary = PacketSummary {
        is_ipv6: false,
        ip_header_len: header_len,
        protocol_header_len,
        payload_len: total_len - header_len - protocol_header_len,
        protocol,
        extension_header_len: 0,
        frame_len: segment_end,
    };

    let from_self = src_addr.is_loopback()
        || config.ipv4.iter().any(|cidr| cidr.address() == src_addr);
    check_upper_layer(config, provider, &summary, frame, from_self)?;

    Ok(summary)
}

fn check_addresses(config: &Config, src_addr: Ipv4Address, dst_addr: Ipv4Address) -> Result<()> {
    if src_addr.is_loopback() != dst_addr.is_loopback() {
        return Err(Error::Filtered);
    }

    let has_address = !config.ipv4.is_empty() && !config.acquiring_address;
    let for_us = dst_addr.is_loopback()
        || config.ipv4.iter().any(|cidr| cidr.accepts(dst_addr))
        || dst_addr.is_broadcast_pattern()
        || dst_addr.is_multicast();
    if has_address && !for_us {
        return Err(Error::Filtered);
    }

    // Covers the limited broadcast as well.
    if src_addr.is_broadcast_pattern() || src_addr.is_multicast() {
        return Err(Error::Filtered);
    }

    Ok(())
}

/// Cut the options out of the header, returning the new header and total length.
fn strip_options(frame: &mut [u8], header_len: usize, total_len: usize) -> Result<(usize, usize)> {
    let options = ETHERNET_HEADER_LEN + IPV4_MIN_HEADER_LEN..ETHERNET_HEADER_LEN + header_len;
    let removed = options.end - options.start;
    cursor::remove_range(frame, options, ETHERNET_HEADER_LEN + total_len)?;

    let total_len = total_len - removed;
    let packet = ipv4_packet::new_unchecked_mut(&mut frame[ETHERNET_HEADER_LEN..]);
    packet.set_header_len(IPV4_MIN_HEADER_LEN as u8);
    packet.set_total_len(total_len as u16);
    packet.fill_checksum();

    net_trace!("filter: stripped {} octets of ipv4 options", removed);
    Ok((IPV4_MIN_HEADER_LEN, total_len))
}
