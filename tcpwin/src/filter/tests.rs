use crate::wire::*;
use super::*;

const HOST: Ipv4Address = Ipv4Address::new(10, 0, 0, 1);
const PEER: Ipv4Address = Ipv4Address::new(10, 0, 0, 2);
const LOOPBACK: Ipv4Address = Ipv4Address::new(127, 0, 0, 1);

fn host_cidr() -> [Ipv4Cidr; 1] {
    [Ipv4Cidr::new(HOST, 24)]
}

fn host6() -> Ipv6Address {
    Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 1)
}

fn peer6() -> Ipv6Address {
    Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 2)
}

fn tcp_segment(payload: &[u8]) -> Vec<u8> {
    let mut segment = vec![0u8; TCP_MIN_HEADER_LEN];
    {
        let tcp = tcp_packet::new_unchecked_mut(&mut segment);
        tcp.set_src_port(49152);
        tcp.set_dst_port(80);
        tcp.set_seq_number(TcpSeqNumber(1000));
        tcp.set_header_len(20);
        tcp.set_window_len(8760);
    }
    segment.extend_from_slice(payload);
    segment
}

/// Fill the transport checksum of a segment starting at `start` and reaching to the frame end.
fn fill_transport_checksum(frame: &mut [u8], start: usize, protocol: IpProtocol, is_ipv6: bool) {
    let field = match protocol {
        IpProtocol::Tcp => 16,
        IpProtocol::Udp => 6,
        _ => 2,
    };
    let len = frame.len() - start;
    if len < field + 2 {
        return;
    }

    frame[start + field..start + field + 2].copy_from_slice(&[0, 0]);
    let (src, dst) = if is_ipv6 { (22..38, 38..54) } else { (26..30, 30..34) };
    let pseudo = match protocol {
        IpProtocol::Tcp | IpProtocol::Udp | IpProtocol::Icmpv6 => {
            checksum::pseudo_header(&frame[src], &frame[dst], protocol, len as u32)
        },
        _ => 0,
    };
    let sum = !checksum::combine(&[pseudo, checksum::data(&frame[start..])]);
    frame[start + field..start + field + 2].copy_from_slice(&sum.to_be_bytes());
}

fn ipv4_frame(
    src: Ipv4Address,
    dst: Ipv4Address,
    options: usize,
    protocol: IpProtocol,
    transport: &[u8],
) -> Vec<u8> {
    let header_len = IPV4_MIN_HEADER_LEN + options;
    let total_len = header_len + transport.len();
    let mut frame = vec![0u8; ETHERNET_HEADER_LEN + total_len];
    ethernet_frame::new_unchecked_mut(&mut frame).set_ethertype(EthernetProtocol::Ipv4);

    let transport_start = ETHERNET_HEADER_LEN + header_len;
    for option in &mut frame[ETHERNET_HEADER_LEN + IPV4_MIN_HEADER_LEN..transport_start] {
        // No-operation
        *option = 1;
    }
    frame[transport_start..].copy_from_slice(transport);

    {
        let packet = ipv4_packet::new_unchecked_mut(&mut frame[ETHERNET_HEADER_LEN..]);
        packet.set_version(4);
        packet.set_header_len(header_len as u8);
        packet.set_total_len(total_len as u16);
        packet.set_hop_limit(64);
        packet.set_protocol(protocol);
        packet.set_src_addr(src);
        packet.set_dst_addr(dst);
        packet.fill_checksum();
    }

    fill_transport_checksum(&mut frame, transport_start, protocol, false);
    frame
}

fn ipv6_frame(
    src: Ipv6Address,
    dst: Ipv6Address,
    next_header: IpProtocol,
    extensions: &[u8],
    protocol: IpProtocol,
    transport: &[u8],
) -> Vec<u8> {
    let payload_len = extensions.len() + transport.len();
    let mut frame = vec![0u8; ETHERNET_HEADER_LEN + IPV6_HEADER_LEN + payload_len];
    ethernet_frame::new_unchecked_mut(&mut frame).set_ethertype(EthernetProtocol::Ipv6);

    {
        let packet = ipv6_packet::new_unchecked_mut(&mut frame[ETHERNET_HEADER_LEN..]);
        packet.set_version(6);
        packet.set_payload_len(payload_len as u16);
        packet.set_next_header(next_header);
        packet.set_hop_limit(64);
        packet.set_src_addr(src);
        packet.set_dst_addr(dst);
    }

    let extension_start = ETHERNET_HEADER_LEN + IPV6_HEADER_LEN;
    let transport_start = extension_start + extensions.len();
    frame[extension_start..transport_start].copy_from_slice(extensions);
    frame[transport_start..].copy_from_slice(transport);

    fill_transport_checksum(&mut frame, transport_start, protocol, true);
    frame
}

/// An extension header of `8 + 8 * units` octets.
fn node(next: IpProtocol, units: u8) -> Vec<u8> {
    let mut node = vec![0u8; 8 + 8 * usize::from(units)];
    node[0] = next.into();
    node[1] = units;
    node
}

#[test]
fn ipv4_tcp_admitted() {
    let cidrs = host_cidr();
    let filter = Filter::new(Config { ipv4: &cidrs, ..Config::default() });

    let mut frame = ipv4_frame(PEER, HOST, 0, IpProtocol::Tcp, &tcp_segment(b"data"));
    // Ethernet padding is not part of the packet.
    frame.extend_from_slice(&[0; 6]);

    let summary = filter.admit(&mut frame).unwrap();
    assert_eq!(summary, PacketSummary {
        is_ipv6: false,
        ip_header_len: 20,
        protocol_header_len: 20,
        payload_len: 4,
        protocol: IpProtocol::Tcp,
        extension_header_len: 0,
        frame_len: 14 + 20 + 24,
    });
    assert_eq!(&frame[summary.payload_range()], b"data");
}

#[test]
fn ipv4_full_header_leaves_no_transport() {
    let cidrs = host_cidr();
    let mut frame = ipv4_frame(PEER, HOST, 40, IpProtocol::Tcp, &[]);
    assert_eq!(frame.len(), 14 + 60);

    let filter = Filter::new(Config { ipv4: &cidrs, ..Config::default() });
    assert_eq!(filter.admit(&mut frame), Err(Error::Unsupported));

    let filter = Filter::new(Config { ipv4: &cidrs, strip_ipv4_options: true, ..Config::default() });
    assert_eq!(filter.admit(&mut frame), Err(Error::Truncated));
}

#[test]
fn ipv4_options_stripped() {
    let cidrs = host_cidr();
    let filter = Filter::new(Config { ipv4: &cidrs, strip_ipv4_options: true, ..Config::default() });
    let mut frame = ipv4_frame(PEER, HOST, 4, IpProtocol::Tcp, &tcp_segment(b"abc"));
    // The segment as built, checksum included.
    let transport = frame[14 + 24..].to_vec();

    let summary = filter.admit(&mut frame).unwrap();
    assert_eq!(summary.ip_header_len, 20);
    assert_eq!(summary.frame_len, 14 + 20 + 23);
    assert_eq!(&frame[summary.transport_range()], &transport[..]);

    let packet = ipv4_packet::new_checked(&frame[14..summary.frame_len]).unwrap();
    assert_eq!(packet.header_len(), 20);
    assert_eq!(packet.total_len(), 43);
    assert_eq!(checksum::data(packet.header_slice()), checksum::CORRECT);
}

#[test]
fn ipv4_malformed_header() {
    let cidrs = host_cidr();
    let filter = Filter::new(Config { ipv4: &cidrs, ..Config::default() });
    let frame = ipv4_frame(PEER, HOST, 0, IpProtocol::Tcp, &tcp_segment(b""));

    let mut version = frame.clone();
    version[14] = 0x55;
    assert_eq!(filter.admit(&mut version), Err(Error::Malformed));

    let mut short_ihl = frame.clone();
    short_ihl[14] = 0x44;
    assert_eq!(filter.admit(&mut short_ihl), Err(Error::Malformed));

    let mut cut = frame.clone();
    cut.truncate(14 + 30);
    assert_eq!(filter.admit(&mut cut), Err(Error::Truncated));

    let mut tiny = frame.clone();
    tiny.truncate(14 + 19);
    assert_eq!(filter.admit(&mut tiny), Err(Error::Truncated));
}

#[test]
fn ipv4_fragments_unsupported() {
    let cidrs = host_cidr();
    let filter = Filter::new(Config { ipv4: &cidrs, ..Config::default() });

    let mut frame = ipv4_frame(PEER, HOST, 0, IpProtocol::Tcp, &tcp_segment(b"x"));
    {
        let packet = ipv4_packet::new_unchecked_mut(&mut frame[14..]);
        packet.set_more_frags(true);
        packet.fill_checksum();
    }
    assert_eq!(filter.admit(&mut frame), Err(Error::Unsupported));

    let mut frame = ipv4_frame(PEER, HOST, 0, IpProtocol::Tcp, &tcp_segment(b"x"));
    {
        let packet = ipv4_packet::new_unchecked_mut(&mut frame[14..]);
        packet.set_frag_offset(8);
        packet.fill_checksum();
    }
    assert_eq!(filter.admit(&mut frame), Err(Error::Unsupported));
}

#[test]
fn ipv4_address_policy() {
    let cidrs = host_cidr();
    let filter = Filter::new(Config { ipv4: &cidrs, ..Config::default() });
    let segment = tcp_segment(b"x");
    let admit = |src, dst| {
        let mut frame = ipv4_frame(src, dst, 0, IpProtocol::Tcp, &segment);
        filter.admit(&mut frame).map(|_| ())
    };

    assert_eq!(admit(PEER, Ipv4Address::new(10, 0, 1, 5)), Err(Error::Filtered));
    assert_eq!(admit(PEER, Ipv4Address::new(10, 0, 0, 255)), Ok(()));
    assert_eq!(admit(PEER, Ipv4Address::BROADCAST), Ok(()));
    assert_eq!(admit(PEER, Ipv4Address::MULTICAST_ALL_SYSTEMS), Ok(()));
    assert_eq!(admit(Ipv4Address::new(10, 0, 0, 255), HOST), Err(Error::Filtered));
    assert_eq!(admit(Ipv4Address::BROADCAST, HOST), Err(Error::Filtered));
    assert_eq!(admit(Ipv4Address::new(224, 0, 0, 5), HOST), Err(Error::Filtered));
    assert_eq!(admit(LOOPBACK, HOST), Err(Error::Filtered));
    assert_eq!(admit(PEER, LOOPBACK), Err(Error::Filtered));
    assert_eq!(admit(LOOPBACK, LOOPBACK), Ok(()));

    let acquiring = Filter::new(Config { ipv4: &cidrs, acquiring_address: true, ..Config::default() });
    let mut frame = ipv4_frame(PEER, Ipv4Address::new(10, 0, 1, 5), 0, IpProtocol::Tcp, &segment);
    assert!(acquiring.admit(&mut frame).is_ok());

    // Without any address everything is accepted.
    let unconfigured = Filter::new(Config::default());
    let mut frame = ipv4_frame(PEER, Ipv4Address::new(10, 0, 1, 5), 0, IpProtocol::Tcp, &segment);
    assert!(unconfigured.admit(&mut frame).is_ok());
}

#[test]
fn ipv4_checksums() {
    let cidrs = host_cidr();
    let filter = Filter::new(Config { ipv4: &cidrs, ..Config::default() });
    let frame = ipv4_frame(PEER, HOST, 0, IpProtocol::Tcp, &tcp_segment(b"data"));

    let mut header = frame.clone();
    header[14 + 8] ^= 0xff;
    assert_eq!(filter.admit(&mut header), Err(Error::WrongChecksum));

    let mut payload = frame.clone();
    let last = payload.len() - 1;
    payload[last] ^= 0x01;
    assert_eq!(filter.admit(&mut payload), Err(Error::WrongChecksum));

    let offloaded = Filter::new(Config { ipv4: &cidrs, checksum: Checksum::Ignored, ..Config::default() });
    assert!(offloaded.admit(&mut header).is_ok());
    assert!(offloaded.admit(&mut payload).is_ok());

    // Our own packets are not checked again.
    let mut looped = ipv4_frame(LOOPBACK, LOOPBACK, 0, IpProtocol::Tcp, &tcp_segment(b"data"));
    let last = looped.len() - 1;
    looped[last] ^= 0x01;
    assert!(filter.admit(&mut looped).is_ok());
}

#[test]
fn ipv4_protocols() {
    let cidrs = host_cidr();
    let filter = Filter::new(Config { ipv4: &cidrs, ..Config::default() });

    let mut udp = ipv4_frame(PEER, HOST, 0, IpProtocol::Udp, &[0, 53, 0, 53, 0, 12, 0, 0, 1, 2, 3, 4]);
    let summary = filter.admit(&mut udp).unwrap();
    assert_eq!((summary.protocol_header_len, summary.payload_len), (8, 4));

    // A zero checksum means the sender did not compute one.
    let mut udp_unchecked = udp.clone();
    udp_unchecked[14 + 20 + 6..14 + 20 + 8].copy_from_slice(&[0, 0]);
    assert!(filter.admit(&mut udp_unchecked).is_ok());

    let mut icmp = ipv4_frame(PEER, HOST, 0, IpProtocol::Icmp, &[8, 0, 0, 0, 0, 1, 0, 1]);
    assert_eq!(filter.admit(&mut icmp).unwrap().protocol, IpProtocol::Icmp);

    let mut short_udp = ipv4_frame(PEER, HOST, 0, IpProtocol::Udp, &[0, 53, 0, 53]);
    assert_eq!(filter.admit(&mut short_udp), Err(Error::Truncated));

    let mut unknown = ipv4_frame(PEER, HOST, 0, IpProtocol::Unknown(0x99), &[0; 8]);
    assert_eq!(filter.admit(&mut unknown), Err(Error::Unrecognized));

    let mut icmpv6 = ipv4_frame(PEER, HOST, 0, IpProtocol::Icmpv6, &[0; 8]);
    assert_eq!(filter.admit(&mut icmpv6), Err(Error::Unrecognized));

    let mut segment = tcp_segment(b"");
    segment[12] = 4 << 4;
    let mut bad_offset = ipv4_frame(PEER, HOST, 0, IpProtocol::Tcp, &segment);
    assert_eq!(filter.admit(&mut bad_offset), Err(Error::Malformed));
}

#[test]
fn not_ip() {
    let filter = Filter::new(Config::default());
    let mut arp = vec![0u8; 42];
    ethernet_frame::new_unchecked_mut(&mut arp).set_ethertype(EthernetProtocol::Arp);
    assert_eq!(filter.admit(&mut arp), Err(Error::Unrecognized));
    assert_eq!(filter.admit(&mut [0u8; 10]), Err(Error::Truncated));
}

#[test]
fn ipv6_tcp_admitted() {
    let addresses = [host6()];
    let filter = Filter::new(Config { ipv6: &addresses, ..Config::default() });
    let mut frame = ipv6_frame(peer6(), host6(), IpProtocol::Tcp, &[], IpProtocol::Tcp,
        &tcp_segment(b"data"));

    let summary = filter.admit(&mut frame).unwrap();
    assert_eq!(summary, PacketSummary {
        is_ipv6: true,
        ip_header_len: 40,
        protocol_header_len: 20,
        payload_len: 4,
        protocol: IpProtocol::Tcp,
        extension_header_len: 0,
        frame_len: 14 + 40 + 24,
    });
}

#[test]
fn ipv6_extensions_walked() {
    let addresses = [host6()];
    let filter = Filter::new(Config { ipv6: &addresses, ..Config::default() });
    let mut extensions = node(IpProtocol::Ipv6Route, 0);
    extensions.extend(node(IpProtocol::Tcp, 1));
    let mut frame = ipv6_frame(peer6(), host6(), IpProtocol::Ipv6Opts, &extensions,
        IpProtocol::Tcp, &tcp_segment(b"data"));
    let transport = frame[14 + 40 + 24..].to_vec();

    let packet = ipv6_packet::new_checked(&frame[14..]).unwrap();
    assert_eq!(walk(packet), Ok(Chain { protocol: IpProtocol::Tcp, length: 24 }));

    let summary = filter.admit(&mut frame).unwrap();
    assert_eq!(summary.extension_header_len, 24);
    assert_eq!(summary.payload_len, 4);
    assert_eq!(&frame[summary.transport_range()], &transport[..]);
}

#[test]
fn ipv6_extensions_stripped() {
    let addresses = [host6()];
    let filter = Filter::new(Config {
        ipv6: &addresses,
        strip_ipv6_extensions: true,
        ..Config::default()
    });
    let mut extensions = node(IpProtocol::Ipv6Frag, 0);
    extensions.extend(node(IpProtocol::Tcp, 0));
    let mut frame = ipv6_frame(peer6(), host6(), IpProtocol::HopByHop, &extensions,
        IpProtocol::Tcp, &tcp_segment(b"data"));
    let transport = frame[14 + 40 + 16..].to_vec();

    let summary = filter.admit(&mut frame).unwrap();
    assert_eq!(summary.extension_header_len, 0);
    assert_eq!(summary.frame_len, 14 + 40 + 24);
    assert_eq!(&frame[54..78], &transport[..]);

    let packet = ipv6_packet::new_checked(&frame[14..summary.frame_len]).unwrap();
    assert_eq!(packet.next_header(), IpProtocol::Tcp);
    assert_eq!(packet.payload_len(), 24);
}

#[test]
fn ipv6_hop_by_hop_second() {
    let mut extensions = node(IpProtocol::HopByHop, 0);
    extensions.extend(node(IpProtocol::Tcp, 0));
    let mut frame = ipv6_frame(peer6(), host6(), IpProtocol::Ipv6Opts, &extensions,
        IpProtocol::Tcp, &tcp_segment(b""));

    let packet = ipv6_packet::new_checked(&frame[14..]).unwrap();
    assert_eq!(walk(packet), Err(Error::Malformed));
    assert_eq!(Filter::new(Config::default()).admit(&mut frame), Err(Error::Malformed));
}

#[test]
fn ipv6_chain_order() {
    let walk_chain = |first: IpProtocol, extensions: &[u8]| {
        let frame = ipv6_frame(peer6(), host6(), first, extensions, IpProtocol::Tcp,
            &tcp_segment(b""));
        walk(ipv6_packet::new_checked(&frame[14..]).unwrap())
    };

    // Destination options before routing and again at the end.
    let mut extensions = node(IpProtocol::Ipv6Route, 0);
    extensions.extend(node(IpProtocol::Ipv6Opts, 0));
    extensions.extend(node(IpProtocol::Tcp, 0));
    assert_eq!(walk_chain(IpProtocol::Ipv6Opts, &extensions),
        Ok(Chain { protocol: IpProtocol::Tcp, length: 24 }));

    // Any order is accepted, a fragment header in front of routing included.
    let mut extensions = node(IpProtocol::Ipv6Route, 0);
    extensions.extend(node(IpProtocol::Tcp, 1));
    assert_eq!(walk_chain(IpProtocol::Ipv6Frag, &extensions),
        Ok(Chain { protocol: IpProtocol::Tcp, length: 24 }));

    let mut extensions = node(IpProtocol::Ipv6Opts, 0);
    extensions.extend(node(IpProtocol::Tcp, 0));
    assert_eq!(walk_chain(IpProtocol::Ipv6Opts, &extensions),
        Ok(Chain { protocol: IpProtocol::Tcp, length: 16 }));

    // Hop-by-hop options are still only allowed first.
    let mut extensions = node(IpProtocol::HopByHop, 0);
    extensions.extend(node(IpProtocol::Tcp, 0));
    assert_eq!(walk_chain(IpProtocol::Ipv6Frag, &extensions), Err(Error::Malformed));
}

#[test]
fn ipv6_chain_limits() {
    let walk_chain = |first: IpProtocol, extensions: &[u8]| {
        let frame = ipv6_frame(peer6(), host6(), first, extensions, IpProtocol::Tcp, &[]);
        walk(ipv6_packet::new_checked(&frame[14..]).unwrap())
    };

    // Claims 24 octets but only 8 are there.
    let mut truncated = node(IpProtocol::Tcp, 0);
    truncated[1] = 2;
    assert_eq!(walk_chain(IpProtocol::Ipv6Opts, &truncated), Err(Error::Truncated));
    assert_eq!(walk_chain(IpProtocol::Ipv6Opts, &[]), Err(Error::Truncated));

    let mut fragment = node(IpProtocol::Tcp, 0);
    fragment[3] = 0x08;
    assert_eq!(walk_chain(IpProtocol::Ipv6Frag, &fragment), Err(Error::Unsupported));
    assert_eq!(walk_chain(IpProtocol::Esp, &[0; 16]), Err(Error::Unsupported));
    assert_eq!(walk_chain(IpProtocol::Ipv6NoNxt, &[]), Err(Error::Unrecognized));
    assert_eq!(walk_chain(IpProtocol::Unknown(0x99), &[0; 8]), Err(Error::Unrecognized));
}

#[test]
fn ipv6_strip_requires_payload() {
    let extensions = node(IpProtocol::Tcp, 2);
    let mut frame = ipv6_frame(peer6(), host6(), IpProtocol::Ipv6Opts, &extensions,
        IpProtocol::Tcp, &[]);
    let chain = Chain { protocol: IpProtocol::Tcp, length: 24 };
    assert_eq!(strip_extension_headers(&mut frame, &chain), Err(Error::Malformed));

    let mut short = vec![0u8; 20];
    assert_eq!(strip_extension_headers(&mut short, &chain), Err(Error::Truncated));
}

#[test]
fn ipv6_policy_and_checksum() {
    let addresses = [host6()];
    let filter = Filter::new(Config { ipv6: &addresses, ..Config::default() });
    let segment = tcp_segment(b"data");
    let admit = |src, dst| {
        let mut frame = ipv6_frame(src, dst, IpProtocol::Tcp, &[], IpProtocol::Tcp, &segment);
        filter.admit(&mut frame).map(|_| ())
    };

    let other = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 5);
    assert_eq!(admit(peer6(), other), Err(Error::Filtered));
    assert_eq!(admit(peer6(), Ipv6Address::LINK_LOCAL_ALL_NODES), Ok(()));
    assert_eq!(admit(Ipv6Address::LINK_LOCAL_ALL_NODES, host6()), Err(Error::Filtered));
    assert_eq!(admit(Ipv6Address::LOOPBACK, host6()), Err(Error::Filtered));
    assert_eq!(admit(Ipv6Address::LOOPBACK, Ipv6Address::LOOPBACK), Ok(()));

    let mut frame = ipv6_frame(peer6(), host6(), IpProtocol::Tcp, &[], IpProtocol::Tcp, &segment);
    let last = frame.len() - 1;
    frame[last] ^= 0x01;
    assert_eq!(filter.admit(&mut frame), Err(Error::WrongChecksum));

    let mut icmp = ipv6_frame(peer6(), host6(), IpProtocol::Icmpv6, &[], IpProtocol::Icmpv6,
        &[128, 0, 0, 0, 0, 1, 0, 1]);
    assert_eq!(filter.admit(&mut icmp).unwrap().protocol, IpProtocol::Icmpv6);

    let mut truncated = ipv6_frame(peer6(), host6(), IpProtocol::Tcp, &[], IpProtocol::Tcp, &segment);
    truncated.truncate(14 + 40 + 10);
    assert_eq!(filter.admit(&mut truncated), Err(Error::Truncated));
}
