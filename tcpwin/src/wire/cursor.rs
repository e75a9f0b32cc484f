//! Bounds-checked access to untrusted octets.
//!
//! Header views such as [`ipv4`] first check their fixed length and then index directly. That does
//! not work for structures whose layout is only discovered while reading them, like the chain of
//! IPv6 extension headers. The [`Cursor`] fails closed instead: every read outside the buffer is
//! an `Error::Truncated`, never a panic.
//!
//! [`ipv4`]: ../ipv4/struct.ipv4.html
//! [`Cursor`]: struct.Cursor.html
use core::ops::Range;
use byteorder::{ByteOrder, NetworkEndian};

use super::{Error, Result};

/// Reads network endian integers from a byte slice at arbitrary offsets.
#[derive(Clone, Copy, Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
}

impl<'a> Cursor<'a> {
    /// Read from the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Cursor { data }
    }

    /// The number of readable bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether there is nothing to read.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the bytes in `range`.
    pub fn slice(&self, range: Range<usize>) -> Result<&'a [u8]> {
        self.data.get(range).ok_or(Error::Truncated)
    }

    /// Read the octet at `offset`.
    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        self.data.get(offset).copied().ok_or(Error::Truncated)
    }

    /// Read a big endian `u16` starting at `offset`.
    pub fn read_u16(&self, offset: usize) -> Result<u16> {
        let end = offset.checked_add(2).ok_or(Error::Truncated)?;
        Ok(NetworkEndian::read_u16(self.slice(offset..end)?))
    }

    /// Read a big endian `u32` starting at `offset`.
    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        let end = offset.checked_add(4).ok_or(Error::Truncated)?;
        Ok(NetworkEndian::read_u32(self.slice(offset..end)?))
    }
}

/// Remove `range` from the first `len` bytes of `buffer`, moving the rest forward.
///
/// Returns the new length of the valid data. Nothing is moved unless both the removed range and
/// the data behind it are inside of `buffer[..len]`.
pub fn remove_range(buffer: &mut [u8], range: Range<usize>, len: usize) -> Result<usize> {
    if len > buffer.len() || range.start > range.end || range.end > len {
        return Err(Error::Truncated);
    }

    buffer.copy_within(range.end..len, range.start);
    Ok(len - (range.end - range.start))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads_fail_closed() {
        let data = [0x12, 0x34, 0x56, 0x78];
        let cursor = Cursor::new(&data);
        assert_eq!(cursor.read_u8(3), Ok(0x78));
        assert_eq!(cursor.read_u16(2), Ok(0x5678));
        assert_eq!(cursor.read_u32(0), Ok(0x12345678));
        assert_eq!(cursor.read_u8(4), Err(Error::Truncated));
        assert_eq!(cursor.read_u16(3), Err(Error::Truncated));
        assert_eq!(cursor.read_u32(usize::max_value()), Err(Error::Truncated));
    }

    #[test]
    fn remove_middle() {
        let mut data = [1, 2, 3, 4, 5, 6, 0, 0];
        assert_eq!(remove_range(&mut data, 1..3, 6), Ok(4));
        assert_eq!(&data[..4], &[1, 4, 5, 6]);
    }

    #[test]
    fn remove_out_of_bounds() {
        let mut data = [1, 2, 3, 4];
        assert_eq!(remove_range(&mut data, 2..5, 4), Err(Error::Truncated));
        assert_eq!(remove_range(&mut data, 0..1, 5), Err(Error::Truncated));
        assert_eq!(data, [1, 2, 3, 4]);
    }
}
