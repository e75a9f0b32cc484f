use core::fmt;

/// The reason a frame was not admitted.
///
/// None of these are fatal. The only sensible reaction to any of them is to drop the frame
/// silently: answering a malformed or unwanted packet would make the host a convenient
/// amplification vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// An incoming packet could not be parsed because it was shorter than assumed.
    ///
    /// The packet may be shorter than the minimum length specified, a size longer than the actual
    /// payload. For variable length packets, this may be because some of its fields were out of
    /// bounds of the received data.
    Truncated,

    /// An incoming packet had an incorrect checksum and was dropped.
    WrongChecksum,

    /// An incoming packet could not be recognized and was dropped.
    ///
    /// E.g. an Ethernet packet with an unknown EtherType or an IP packet carrying an upper layer
    /// protocol that has no transport behind the filter.
    Unrecognized,

    /// An incoming packet was recognized but was self-contradictory.
    ///
    /// Examples: an IPv4 header length outside of 20 to 60 bytes; an IPv6 extension header chain
    /// where the hop-by-hop options are not the first header.
    Malformed,

    /// Parsing depends on information derived from a non-implemented feature.
    ///
    /// Fragmented datagrams are the prime example, there is no reassembly. IPv4 options also end
    /// up here unless the filter was configured to strip them.
    Unsupported,

    /// The packet is well-formed but the address policy of the host does not accept it.
    ///
    /// For example it is addressed to another host, or pretends to come from a broadcast or
    /// multicast address, or mixes loopback with non-loopback addresses.
    Filtered,
}

/// The result type for the admission filter.
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Truncated     => write!(f, "truncated packet"),
            Error::WrongChecksum => write!(f, "checksum error"),
            Error::Unrecognized  => write!(f, "unrecognized packet"),
            Error::Malformed     => write!(f, "malformed packet"),
            Error::Unsupported   => write!(f, "unsupported option"),
            Error::Filtered      => write!(f, "filtered by address policy"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
