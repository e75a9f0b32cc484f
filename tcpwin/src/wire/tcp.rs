use core::{cmp, fmt, ops};
use byteorder::{ByteOrder, NetworkEndian};

use super::{Error, Result};

/// A TCP sequence number.
///
/// A sequence number is a monotonically advancing integer modulo 2<sup>32</sup>.
/// Sequence numbers do not have a discontiguity when compared pairwise across an overflow. The
/// comparison is only meaningful for numbers within 2<sup>31</sup> of each other, which is why
/// `SeqNumber` implements `PartialOrd` but not `Ord`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub struct SeqNumber(pub u32);

impl SeqNumber {
    /// Advance the sequence number, wrapping around.
    pub fn wrapping_add(self, rhs: u32) -> SeqNumber {
        SeqNumber(self.0.wrapping_add(rhs))
    }

    /// The number of sequence numbers from `earlier` to `self`.
    ///
    /// This is only meaningful if `earlier` is not greater than `self`.
    pub fn distance(self, earlier: SeqNumber) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    fn signed_diff(self, other: SeqNumber) -> i32 {
        self.0.wrapping_sub(other.0) as i32
    }

    /// `self` comes strictly before `other`.
    pub fn less_than(self, other: SeqNumber) -> bool {
        self.signed_diff(other) < 0
    }

    /// `self` comes before or is equal to `other`.
    pub fn less_or_equal(self, other: SeqNumber) -> bool {
        self.signed_diff(other) <= 0
    }

    /// `self` comes strictly after `other`.
    pub fn greater_than(self, other: SeqNumber) -> bool {
        self.signed_diff(other) > 0
    }

    /// `self` comes after or is equal to `other`.
    pub fn greater_or_equal(self, other: SeqNumber) -> bool {
        self.signed_diff(other) >= 0
    }
}

impl fmt::Display for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ops::Add<u32> for SeqNumber {
    type Output = SeqNumber;

    fn add(self, rhs: u32) -> SeqNumber {
        self.wrapping_add(rhs)
    }
}

impl ops::Sub<u32> for SeqNumber {
    type Output = SeqNumber;

    fn sub(self, rhs: u32) -> SeqNumber {
        SeqNumber(self.0.wrapping_sub(rhs))
    }
}

impl ops::AddAssign<u32> for SeqNumber {
    fn add_assign(&mut self, rhs: u32) {
        *self = *self + rhs;
    }
}

impl cmp::PartialOrd for SeqNumber {
    fn partial_cmp(&self, other: &SeqNumber) -> Option<cmp::Ordering> {
        self.signed_diff(*other).partial_cmp(&0)
    }
}

byte_wrapper! {
    /// A byte sequence representing a TCP header and its payload.
    #[derive(Debug, PartialEq, Eq)]
    pub struct tcp([u8]);
}

mod field {
    use crate::wire::field::Field;

    pub(crate) const SRC_PORT: Field = 0..2;
    pub(crate) const DST_PORT: Field = 2..4;
    pub(crate) const SEQ_NUM:  Field = 4..8;
    pub(crate) const ACK_NUM:  Field = 8..12;
    pub(crate) const FLAGS:    Field = 12..14;
    pub(crate) const WIN_SIZE: Field = 14..16;
    pub(crate) const CHECKSUM: Field = 16..18;
    pub(crate) const URGENT:   Field = 18..20;

    pub(crate) const OPT_NOP:     u8 = 0x01;
    pub(crate) const OPT_SACKRNG: u8 = 0x05;
}

/// The length of a TCP header without options.
pub const MIN_HEADER_LEN: usize = field::URGENT.end;

impl tcp {
    /// Imbue a raw octet buffer with TCP packet structure.
    pub fn new_unchecked(buffer: &[u8]) -> &Self {
        Self::__from_macro_new_unchecked(buffer)
    }

    /// Imbue a mutable octet buffer with TCP packet structure.
    pub fn new_unchecked_mut(buffer: &mut [u8]) -> &mut Self {
        Self::__from_macro_new_unchecked_mut(buffer)
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(buffer: &[u8]) -> Result<&Self> {
        let packet = Self::new_unchecked(buffer);
        packet.check_len()?;
        Ok(packet)
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error::Truncated)` if the buffer is too short.
    /// Returns `Err(Error::Malformed)` if the data offset is shorter than the fixed header.
    pub fn check_len(&self) -> Result<()> {
        let len = self.0.len();
        if len < MIN_HEADER_LEN {
            Err(Error::Truncated)
        } else {
            let header_len = self.header_len() as usize;
            if header_len < MIN_HEADER_LEN {
                Err(Error::Malformed)
            } else if len < header_len {
                Err(Error::Truncated)
            } else {
                Ok(())
            }
        }
    }

    /// Return the source port field.
    #[inline]
    pub fn src_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::SRC_PORT])
    }

    /// Return the destination port field.
    #[inline]
    pub fn dst_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::DST_PORT])
    }

    /// Return the sequence number field.
    #[inline]
    pub fn seq_number(&self) -> SeqNumber {
        SeqNumber(NetworkEndian::read_u32(&self.0[field::SEQ_NUM]))
    }

    /// Return the acknowledgement number field.
    #[inline]
    pub fn ack_number(&self) -> SeqNumber {
        SeqNumber(NetworkEndian::read_u32(&self.0[field::ACK_NUM]))
    }

    /// Return the header length, in octets.
    #[inline]
    pub fn header_len(&self) -> u8 {
        let raw = NetworkEndian::read_u16(&self.0[field::FLAGS]);
        ((raw >> 12) * 4) as u8
    }

    /// Return the window size field.
    #[inline]
    pub fn window_len(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::WIN_SIZE])
    }

    /// Return the checksum field.
    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    /// Set the source port field.
    #[inline]
    pub fn set_src_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::SRC_PORT], value)
    }

    /// Set the destination port field.
    #[inline]
    pub fn set_dst_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::DST_PORT], value)
    }

    /// Set the sequence number field.
    #[inline]
    pub fn set_seq_number(&mut self, value: SeqNumber) {
        NetworkEndian::write_u32(&mut self.0[field::SEQ_NUM], value.0)
    }

    /// Set the acknowledgement number field.
    #[inline]
    pub fn set_ack_number(&mut self, value: SeqNumber) {
        NetworkEndian::write_u32(&mut self.0[field::ACK_NUM], value.0)
    }

    /// Set the header length, in octets.
    #[inline]
    pub fn set_header_len(&mut self, length: u8) {
        let raw = NetworkEndian::read_u16(&self.0[field::FLAGS]);
        let raw = (raw & !0xf000) | ((length as u16) / 4) << 12;
        NetworkEndian::write_u16(&mut self.0[field::FLAGS], raw)
    }

    /// Set the window size field.
    #[inline]
    pub fn set_window_len(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::WIN_SIZE], value)
    }

    /// Set the checksum field.
    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::CHECKSUM], value)
    }

    /// Return the payload following the header and its options.
    pub fn payload_slice(&self) -> &[u8] {
        &self.0[usize::from(self.header_len())..]
    }
}

/// A selective acknowledgment of one contiguous range.
///
/// Encoded as the option block `01 01 05 0a` followed by both edges in network byte order. The
/// two leading no-ops keep the edges aligned to four octets in the header.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct SackRange {
    /// The first sequence number received.
    pub first: SeqNumber,
    /// The sequence number after the last one received.
    pub last: SeqNumber,
}

/// The length of an encoded single-range SACK option, including padding.
pub const SACK_OPTION_LEN: usize = 12;

impl SackRange {
    /// Write the option block to a buffer.
    ///
    /// # Panics
    /// This function panics if `buffer` is shorter than `SACK_OPTION_LEN`.
    pub fn emit(&self, buffer: &mut [u8]) {
        buffer[0] = field::OPT_NOP;
        buffer[1] = field::OPT_NOP;
        buffer[2] = field::OPT_SACKRNG;
        buffer[3] = 2 + 8;
        NetworkEndian::write_u32(&mut buffer[4..8], self.first.0);
        NetworkEndian::write_u32(&mut buffer[8..12], self.last.0);
    }

    /// The encoded option block.
    pub fn to_bytes(&self) -> [u8; SACK_OPTION_LEN] {
        let mut bytes = [0; SACK_OPTION_LEN];
        self.emit(&mut bytes);
        bytes
    }

    /// Parse an option block as produced by `emit`.
    pub fn parse(buffer: &[u8]) -> Result<Self> {
        if buffer.len() < SACK_OPTION_LEN {
            return Err(Error::Truncated);
        }

        if buffer[..4] != [field::OPT_NOP, field::OPT_NOP, field::OPT_SACKRNG, 10] {
            return Err(Error::Unrecognized);
        }

        Ok(SackRange {
            first: SeqNumber(NetworkEndian::read_u32(&buffer[4..8])),
            last: SeqNumber(NetworkEndian::read_u32(&buffer[8..12])),
        })
    }
}
