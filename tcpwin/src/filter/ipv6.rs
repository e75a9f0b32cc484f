use crate::wire::{
    ipv6_packet, Error, IpProtocol, Ipv6Address, Result, ETHERNET_HEADER_LEN, IPV6_HEADER_LEN};

use super::{check_upper_layer, transport_header_len, ChecksumProvider, Config, PacketSummary};
use super::extension::{strip_extension_headers, walk};

pub(super) fn admit<P: ChecksumProvider>(config: &Config, provider: &P, frame: &mut [u8])
    -> Result<PacketSummary>
{
    if frame.len() < ETHERNET_HEADER_LEN + IPV6_HEADER_LEN {
        return Err(Error::Truncated);
    }

    let (chain, payload_len, src_addr) = {
        let packet = ipv6_packet::new_unchecked(&frame[ETHERNET_HEADER_LEN..]);
        if packet.version() != 6 {
            return Err(Error::Malformed);
        }
        packet.check_len()?;

        let src_addr = packet.src_addr();
        check_addresses(config, src_addr, packet.dst_addr())?;

        (walk(packet)?, usize::from(packet.payload_len()), src_addr)
    };

    let (extension_header_len, payload_len) = if config.strip_ipv6_extensions && chain.length > 0 {
        strip_extension_headers(frame, &chain)?;
        (0, payload_len - chain.length)
    } else {
        (chain.length, payload_len)
    };

    let segment_start = ETHERNET_HEADER_LEN + IPV6_HEADER_LEN + extension_header_len;
    let segment_end = ETHERNET_HEADER_LEN + IPV6_HEADER_LEN + payload_len;
    let segment = frame.get(segment_start..segment_end).ok_or(Error::Truncated)?;
    let protocol_header_len = transport_header_len(chain.protocol, segment)?;

    let summary = PacketSummary {
        is_ipv6: true,
        ip_header_len: IPV6_HEADER_LEN,
        protocol_header_len,
        payload_len: segment.len() - protocol_header_len,
        protocol: chain.protocol,
        extension_header_len,
        frame_len: segment_end,
    };

    let from_self = src_addr.is_loopback() || config.ipv6.contains(&src_addr);
    check_upper_layer(config, provider, &summary, frame, from_self)?;

    Ok(summary)
}

fn check_addresses(config: &Config, src_addr: Ipv6Address, dst_addr: Ipv6Address) -> Result<()> {
    if src_addr.is_loopback() != dst_addr.is_loopback() || src_addr.is_multicast() {
        return Err(Error::Filtered);
    }

    if dst_addr.is_multicast() {
        return if dst_addr.is_allowed_multicast() {
            Ok(())
        } else {
            Err(Error::Filtered)
        };
    }

    let has_address = !config.ipv6.is_empty() && !config.acquiring_address;
    if has_address && !dst_addr.is_loopback() && !config.ipv6.contains(&dst_addr) {
        return Err(Error::Filtered);
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn multicast_scope_policy() {
        let config = Config::default();
        let local = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);
        let all_nodes = Ipv6Address::LINK_LOCAL_ALL_NODES;
        let scope_zero = Ipv6Address::new(0xff00, 0, 0, 0, 0, 0, 0, 1);
        let reserved = Ipv6Address::new(0xff02, 0, 0, 0, 0, 0, 0, 0);

        assert_eq!(check_addresses(&config, local, all_nodes), Ok(()));
        assert_eq!(check_addresses(&config, local, scope_zero), Err(Error::Filtered));
        assert_eq!(check_addresses(&config, local, reserved), Err(Error::Filtered));
        assert_eq!(check_addresses(&config, all_nodes, local), Err(Error::Filtered));
    }

    #[test]
    fn loopback_only_paired() {
        let config = Config::default();
        let local = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);
        let loopback = Ipv6Address::LOOPBACK;

        assert_eq!(check_addresses(&config, loopback, loopback), Ok(()));
        assert_eq!(check_addresses(&config, local, loopback), Err(Error::Filtered));
        assert_eq!(check_addresses(&config, loopback, local), Err(Error::Filtered));
    }
}
