//! Admission of inbound frames.
//!
//! Every frame received from the link passes the [`Filter`] before any of its payload reaches a
//! window. The filter checks the structure of the IP header against the received length, rejects
//! fragments, applies the address policy of the host and verifies checksums. For IPv6 it walks
//! the chain of extension headers to find the upper layer protocol.
//!
//! The filter answers with a [`PacketSummary`] describing where the transport header and payload
//! are, or with an [`Error`]. Any error means the frame is to be dropped without a reply.
//!
//! Two in-place modifications are supported. IPv4 options and IPv6 extension headers can be cut
//! out of the frame so that the transport header directly follows the fixed IP header. Both are
//! off by default, such frames are then dropped and reported as unsupported.
//!
//! [`Filter`]: struct.Filter.html
//! [`PacketSummary`]: struct.PacketSummary.html
//! [`Error`]: ../wire/enum.Error.html
use core::ops::Range;

use crate::wire::{
    checksum, tcp_packet, Checksum, Error, ethernet_frame, EthernetProtocol, IpProtocol,
    Ipv4Cidr, Ipv6Address, Result, ETHERNET_HEADER_LEN};

mod extension;
mod ipv4;
mod ipv6;

#[cfg(test)]
mod tests;

pub use self::extension::{strip_extension_headers, walk, Chain};

/// The addresses and policy of the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Config<'a> {
    /// The IPv4 addresses of the host, each with its subnet.
    pub ipv4: &'a [Ipv4Cidr],
    /// The IPv6 addresses of the host.
    pub ipv6: &'a [Ipv6Address],
    /// Accept any destination while the host is still acquiring an address, e.g. by DHCP.
    pub acquiring_address: bool,
    /// Cut IPv4 options out of the frame instead of dropping it.
    pub strip_ipv4_options: bool,
    /// Cut IPv6 extension headers out of the frame instead of keeping them.
    pub strip_ipv6_extensions: bool,
    /// Whether checksums were already validated by the interface.
    pub checksum: Checksum,
}

/// Where the parts of an admitted frame are.
///
/// All lengths are in octets. The transport header starts at
/// `ETHERNET_HEADER_LEN + ip_header_len + extension_header_len` within the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PacketSummary {
    /// The frame carries an IPv6 packet.
    pub is_ipv6: bool,
    /// The length of the IP header, after options were stripped.
    pub ip_header_len: usize,
    /// The length of the transport header, including its options.
    pub protocol_header_len: usize,
    /// The transport payload following its header.
    pub payload_len: usize,
    /// The upper layer protocol.
    pub protocol: IpProtocol,
    /// IPv6 extension headers still in front of the transport header. Zero once stripped.
    pub extension_header_len: usize,
    /// The length of the frame up to the end of the IP packet, after stripping.
    pub frame_len: usize,
}

impl PacketSummary {
    /// The offset of the IP header within the frame.
    pub fn ip_offset(&self) -> usize {
        ETHERNET_HEADER_LEN
    }

    /// The offset of the transport header within the frame.
    pub fn transport_offset(&self) -> usize {
        ETHERNET_HEADER_LEN + self.ip_header_len + self.extension_header_len
    }

    /// The transport header and payload within the frame.
    pub fn transport_range(&self) -> Range<usize> {
        let start = self.transport_offset();
        start..start + self.protocol_header_len + self.payload_len
    }

    /// The transport payload within the frame.
    pub fn payload_range(&self) -> Range<usize> {
        let start = self.transport_offset() + self.protocol_header_len;
        start..start + self.payload_len
    }
}

/// Computes checksums over admitted packets.
///
/// Both methods return `checksum::CORRECT` if the checksum embedded in the covered bytes is
/// correct. An implementation may hand the work to hardware that already did it.
pub trait ChecksumProvider {
    /// The folded checksum of an IPv4 header.
    fn header(&self, header: &[u8]) -> u16;

    /// The folded checksum of the transport header and payload, pseudo header included.
    fn upper_layer(&self, summary: &PacketSummary, frame: &[u8]) -> u16;
}

/// The RFC 1071 internet checksum, computed in software.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct InternetChecksum;

impl ChecksumProvider for InternetChecksum {
    fn header(&self, header: &[u8]) -> u16 {
        checksum::data(header)
    }

    fn upper_layer(&self, summary: &PacketSummary, frame: &[u8]) -> u16 {
        let segment = match frame.get(summary.transport_range()) {
            Some(segment) => segment,
            None => return 0,
        };

        let ip = &frame[summary.ip_offset()..];
        let addresses = if summary.is_ipv6 {
            ip.get(8..24).zip(ip.get(24..40))
        } else {
            ip.get(12..16).zip(ip.get(16..20))
        };
        let (src_addr, dst_addr) = match addresses {
            Some(addresses) => addresses,
            None => return 0,
        };

        match summary.protocol {
            // A zero UDP checksum over IPv4 means none was computed.
            IpProtocol::Udp if !summary.is_ipv6 && segment.get(6..8) == Some(&[0, 0][..]) => {
                checksum::CORRECT
            },
            IpProtocol::Tcp | IpProtocol::Udp | IpProtocol::Icmpv6 => checksum::combine(&[
                checksum::pseudo_header(src_addr, dst_addr, summary.protocol, segment.len() as u32),
                checksum::data(segment),
            ]),
            _ => checksum::data(segment),
        }
    }
}

/// Validates inbound frames against the configuration of the host.
#[derive(Clone, Copy, Debug)]
pub struct Filter<'a, P = InternetChecksum> {
    config: Config<'a>,
    provider: P,
}

impl<'a> Filter<'a> {
    /// Create a filter that computes checksums in software.
    pub fn new(config: Config<'a>) -> Self {
        Filter::with_provider(config, InternetChecksum)
    }
}

impl<'a, P: ChecksumProvider> Filter<'a, P> {
    /// Create a filter with a custom checksum implementation.
    pub fn with_provider(config: Config<'a>, provider: P) -> Self {
        Filter { config, provider }
    }

    /// The configuration the filter was created with.
    pub fn config(&self) -> &Config<'a> {
        &self.config
    }

    /// Check an Ethernet II frame.
    ///
    /// The frame may be modified when stripping of IPv4 options or IPv6 extension headers is
    /// configured. Bytes beyond `PacketSummary::frame_len` are undefined afterwards.
    pub fn admit(&self, frame: &mut [u8]) -> Result<PacketSummary> {
        let ethertype = ethernet_frame::new_checked(frame)?.ethertype();
        let result = match ethertype {
            EthernetProtocol::Ipv4 => ipv4::admit(&self.config, &self.provider, frame),
            EthernetProtocol::Ipv6 => ipv6::admit(&self.config, &self.provider, frame),
            _ => Err(Error::Unrecognized),
        };

        if let Err(err) = result {
            net_debug!("filter: dropped {} frame: {}", ethertype, err);
        }

        result
    }
}

/// The length of the transport header at the start of `segment`.
///
/// TCP headers carry their own length, which must fit the segment. Other protocols only need
/// their fixed minimum.
fn transport_header_len(protocol: IpProtocol, segment: &[u8]) -> Result<usize> {
    let min = protocol.min_header_len().ok_or(Error::Unrecognized)?;
    if segment.len() < min {
        return Err(Error::Truncated);
    }

    match protocol {
        IpProtocol::Tcp => Ok(usize::from(tcp_packet::new_checked(segment)?.header_len())),
        _ => Ok(min),
    }
}

/// Verify the transport checksum unless the interface did or the packet is our own.
fn check_upper_layer<P: ChecksumProvider>(
    config: &Config,
    provider: &P,
    summary: &PacketSummary,
    frame: &[u8],
    from_self: bool,
) -> Result<()> {
    if config.checksum == Checksum::Ignored || from_self {
        return Ok(());
    }

    if provider.upper_layer(summary, frame) == checksum::CORRECT {
        Ok(())
    } else {
        Err(Error::WrongChecksum)
    }
}
