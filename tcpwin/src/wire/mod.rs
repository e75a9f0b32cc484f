/*! Low-level packet access.

The `wire` module deals with the packet *representation*. The lowercase structures, e.g.
[`ipv4_packet`] or [`ipv6_packet`], are dynamically sized wrappers around a byte slice. They
provide functions to extract fields from sequences of octets and to insert fields into sequences
of octets.

[`ipv4_packet`]: struct.ipv4_packet.html
[`ipv6_packet`]: struct.ipv6_packet.html

The packet family of data structures guarantees that, if the `packet::check_len()` method
returned `Ok(())`, then no field accessor or setter method will panic; however, the guarantee only
holds while specific fields are mutated, which are listed in the documentation for the specific
packet. When parsing untrusted input, it is *necessary* to use either `check_len` or the
`new_checked` constructor.

Structures whose layout is only discovered while reading them, such as the chain of IPv6
extension headers, are read through a [`Cursor`] instead. It returns an error for every access out
of bounds rather than relying on a preceding length check.

[`Cursor`]: cursor/struct.Cursor.html

# Examples

To fill in an IPv4 header and then parse it back:

```rust
use tcpwin::wire::*;

let mut buffer = vec![0; 28];
{ // emission
    let packet = ipv4_packet::new_unchecked_mut(&mut buffer);
    packet.set_version(4);
    packet.set_header_len(20);
    packet.set_total_len(28);
    packet.set_hop_limit(64);
    packet.set_protocol(IpProtocol::Udp);
    packet.set_src_addr(Ipv4Address::new(10, 0, 0, 1));
    packet.set_dst_addr(Ipv4Address::new(10, 0, 0, 2));
    packet.fill_checksum();
}
{ // parsing
    let packet = ipv4_packet::new_checked(&buffer)
        .expect("truncated packet");
    assert_eq!(packet.protocol(), IpProtocol::Udp);
    assert_eq!(checksum::data(packet.header_slice()), checksum::CORRECT);
}
```
*/
// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
//
// Applies to files in this folder unless otherwise noted. These are:
// * `error.rs`
// * `ethernet.rs`
// * `ip.rs`
// * `ipv4.rs`
// * `ipv6.rs`
// * `mod.rs` (this file)
// * `tcp.rs`

mod field {
    pub(crate) type Field = ::core::ops::Range<usize>;
}

pub mod cursor;

mod ethernet;
mod error;
mod ip;
mod ipv4;
mod ipv6;
mod tcp;

/// Describes how to handle checksums.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Checksum {
    /// Checksum must be computed or checked manually.
    Manual,

    /// The checksum field is filled or checked by the NIC.
    Ignored,
}

impl Default for Checksum {
    fn default() -> Self {
        Checksum::Manual
    }
}

pub use self::cursor::Cursor;

pub use self::ethernet::{
    ethernet as ethernet_frame,
    EtherType as EthernetProtocol,
    HEADER_LEN as ETHERNET_HEADER_LEN};

pub use self::error::{
    Error,
    Result};

pub use self::ip::{
    checksum,
    Protocol as IpProtocol};

pub use self::ipv4::{
    ipv4 as ipv4_packet,
    Address as Ipv4Address,
    Cidr as Ipv4Cidr,
    MIN_HEADER_LEN as IPV4_MIN_HEADER_LEN,
    MAX_HEADER_LEN as IPV4_MAX_HEADER_LEN};

pub use self::ipv6::{
    ipv6 as ipv6_packet,
    Address as Ipv6Address,
    HEADER_LEN as IPV6_HEADER_LEN};

pub use self::tcp::{
    tcp as tcp_packet,
    SeqNumber as TcpSeqNumber,
    SackRange as TcpSackRange,
    MIN_HEADER_LEN as TCP_MIN_HEADER_LEN,
    SACK_OPTION_LEN as TCP_SACK_OPTION_LEN};
