use core::borrow::{Borrow, BorrowMut};

/// A circular byte buffer with a fixed capacity.
///
/// The buffer is described by four cursors into the underlying storage of length `L`:
///
/// * `tail` is the next byte to read,
/// * `head` is the end of the committed bytes,
/// * `front` is the furthest end ever written, which may be ahead of `head` when bytes were
///   placed out of order,
/// * `mid` is a secondary read cursor between `tail` and `head`, for bytes already handed to a
///   consumer but not yet purged.
///
/// `head == tail` means that the buffer is empty, so at most `L - 1` bytes are ever occupied.
/// Reads and writes that straddle the end of the storage are split into two copies.
///
/// None of the operations fail. If there is less space or data than requested they transfer
/// fewer bytes and return the number actually transferred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RingBuffer<C> {
    storage: C,
    head: usize,
    tail: usize,
    front: usize,
    mid: usize,
}

impl<C: Borrow<[u8]>> RingBuffer<C> {
    /// Create an empty ring buffer over some storage.
    ///
    /// # Panics
    /// This function panics if `storage` is empty.
    pub fn new(storage: C) -> Self {
        assert!(!storage.borrow().is_empty(), "ring buffer needs at least one byte of storage");
        RingBuffer {
            storage,
            head: 0,
            tail: 0,
            front: 0,
            mid: 0,
        }
    }

    /// Return the underlying storage.
    pub fn into_inner(self) -> C {
        self.storage
    }

    fn len(&self) -> usize {
        self.storage.borrow().len()
    }

    fn wrap(&self, index: usize) -> usize {
        let len = self.len();
        if index >= len { index - len } else { index }
    }

    fn space_between(&self, lower: usize, upper: usize) -> usize {
        self.wrap(self.len() + upper - lower - 1)
    }

    /// The number of bytes from `lower` forward to `upper`.
    pub fn distance(&self, lower: usize, upper: usize) -> usize {
        self.wrap(self.len() + upper - lower)
    }

    /// The maximum number of bytes the buffer holds at once.
    pub fn capacity(&self) -> usize {
        self.len() - 1
    }

    /// Free bytes ahead of `head`, before running into `tail`.
    pub fn space(&self) -> usize {
        self.space_between(self.head, self.tail)
    }

    /// Free bytes ahead of `front`, before running into `tail`.
    pub fn front_space(&self) -> usize {
        self.space_between(self.front, self.tail)
    }

    /// The number of committed bytes that can be read.
    pub fn size(&self) -> usize {
        self.distance(self.tail, self.head)
    }

    /// The number of bytes between `mid` and `head`.
    pub fn mid_space(&self) -> usize {
        self.distance(self.mid, self.head)
    }

    /// Whether no committed bytes are available.
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// The position after the last committed byte.
    pub fn head(&self) -> usize {
        self.head
    }

    /// The position of the next byte to read.
    pub fn tail(&self) -> usize {
        self.tail
    }

    /// The position after the furthest byte ever written.
    pub fn front(&self) -> usize {
        self.front
    }

    /// The position of the secondary read cursor.
    pub fn mid(&self) -> usize {
        self.mid
    }

    /// Compare two positions by their distance from `tail`.
    pub fn less_or_equal(&self, left: usize, right: usize) -> bool {
        let len = self.len();
        let left = if left < self.tail { left + len } else { left };
        let right = if right < self.tail { right + len } else { right };
        left <= right
    }

    /// Advance the secondary read cursor, at most up to `head`.
    pub fn move_mid(&mut self, count: usize) {
        let count = count.min(self.mid_space());
        self.mid = self.wrap(self.mid + count);
    }

    /// Read up to `max` bytes starting `offset` bytes after `tail`.
    ///
    /// Only a read at offset zero that is not a `peek` consumes the bytes by moving `tail`. With
    /// `None` as the output the bytes are skipped without copying them. Returns the number of
    /// bytes read.
    pub fn get(&mut self, offset: usize, out: Option<&mut [u8]>, max: usize, peek: bool) -> usize {
        let max = match &out {
            Some(out) => max.min(out.len()),
            None => max,
        };

        let available = self.size().saturating_sub(offset);
        let count = available.min(max);
        if count == 0 {
            return 0;
        }

        let start = self.wrap(self.tail + offset);
        if let Some(out) = out {
            let storage = self.storage.borrow();
            let first = (storage.len() - start).min(count);
            out[..first].copy_from_slice(&storage[start..start + first]);
            if count > first {
                out[first..count].copy_from_slice(&storage[..count - first]);
            }
        }

        if !peek && offset == 0 {
            self.tail = self.wrap(start + count);
        }

        count
    }

    /// Forget all bytes and reset every cursor.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.front = 0;
        self.mid = 0;
    }
}

impl<C: BorrowMut<[u8]>> RingBuffer<C> {
    /// Write up to `count` bytes starting `offset` bytes ahead of `head`.
    ///
    /// Bytes written at a non-zero offset are placed without moving `head`, they are committed by
    /// a later write at offset zero. Passing `None` as data commits `count` bytes without copying
    /// anything, for bytes that had been placed before. Returns the number of bytes written.
    pub fn add(&mut self, offset: usize, data: Option<&[u8]>, count: usize) -> usize {
        let count = match data {
            Some(data) => count.min(data.len()),
            None => count,
        };

        let space = self.space().saturating_sub(offset);
        let count = space.min(count);
        if count == 0 {
            return 0;
        }

        let start = self.wrap(self.head + offset);
        if let Some(data) = data {
            let storage = self.storage.borrow_mut();
            let first = (storage.len() - start).min(count);
            storage[start..start + first].copy_from_slice(&data[..first]);
            if count > first {
                storage[..count - first].copy_from_slice(&data[first..count]);
            }
        }

        let end = self.wrap(start + count);
        if offset == 0 {
            self.head = end;
        }

        if self.less_or_equal(self.front, end) {
            self.front = end;
        }

        count
    }
}

#[cfg(test)]
mod test {
    use std::collections::VecDeque;
    use super::*;

    #[test]
    fn empty() {
        let ring = RingBuffer::new(vec![0u8; 8]);
        assert_eq!(ring.capacity(), 7);
        assert_eq!(ring.space(), 7);
        assert_eq!(ring.size(), 0);
        assert!(ring.is_empty());
    }

    #[test]
    fn add_get_wrapping() {
        let mut ring = RingBuffer::new(vec![0u8; 8]);
        assert_eq!(ring.add(0, Some(b"hello"), 5), 5);
        let mut out = [0u8; 8];
        assert_eq!(ring.get(0, Some(&mut out), 8, false), 5);
        assert_eq!(&out[..5], b"hello");

        // Straddles the end of the storage.
        assert_eq!(ring.add(0, Some(b"wrapped"), 7), 7);
        assert_eq!(ring.head(), 4);
        assert_eq!(ring.get(0, Some(&mut out), 8, false), 7);
        assert_eq!(&out[..7], b"wrapped");
        assert!(ring.is_empty());
    }

    #[test]
    fn add_beyond_capacity() {
        let mut ring = RingBuffer::new([0u8; 8]);
        assert_eq!(ring.add(0, Some(b"0123456789"), 10), 7);
        assert_eq!(ring.space(), 0);
        assert_eq!(ring.add(0, Some(b"x"), 1), 0);
    }

    #[test]
    fn add_ahead_then_commit() {
        let mut ring = RingBuffer::new(vec![0u8; 16]);
        assert_eq!(ring.add(2, Some(b"cd"), 2), 2);
        assert_eq!(ring.head(), 0);
        assert_eq!(ring.front(), 4);
        assert_eq!(ring.size(), 0);
        assert_eq!(ring.front_space(), 11);

        assert_eq!(ring.add(0, Some(b"ab"), 2), 2);
        assert_eq!(ring.head(), 2);
        // The front was further ahead already.
        assert_eq!(ring.front(), 4);

        assert_eq!(ring.add(0, None, 2), 2);
        assert_eq!(ring.size(), 4);
        let mut out = [0u8; 4];
        assert_eq!(ring.get(0, Some(&mut out), 4, false), 4);
        assert_eq!(&out, b"abcd");
    }

    #[test]
    fn peek_and_offset_do_not_consume() {
        let mut ring = RingBuffer::new(vec![0u8; 16]);
        ring.add(0, Some(b"abcdef"), 6);
        let mut out = [0u8; 3];
        assert_eq!(ring.get(0, Some(&mut out), 3, true), 3);
        assert_eq!(&out, b"abc");
        assert_eq!(ring.size(), 6);

        assert_eq!(ring.get(4, Some(&mut out), 3, false), 2);
        assert_eq!(&out[..2], b"ef");
        assert_eq!(ring.size(), 6);

        assert_eq!(ring.get(0, None, 2, false), 2);
        assert_eq!(ring.size(), 4);
        assert_eq!(ring.get(7, None, 2, false), 0);
    }

    #[test]
    fn mid_cursor() {
        let mut ring = RingBuffer::new(vec![0u8; 8]);
        ring.add(0, Some(b"abcdef"), 6);
        assert_eq!(ring.mid_space(), 6);
        ring.move_mid(4);
        assert_eq!(ring.mid(), 4);
        assert_eq!(ring.mid_space(), 2);
        ring.move_mid(10);
        assert_eq!(ring.mid_space(), 0);
        assert_eq!(ring.mid(), ring.head());
    }

    #[test]
    fn positions_relative_to_tail() {
        let mut ring = RingBuffer::new(vec![0u8; 8]);
        ring.add(0, None, 6);
        ring.get(0, None, 6, false);
        assert_eq!(ring.tail(), 6);
        // Position 1 is after the wrap, so later than position 7.
        assert!(ring.less_or_equal(7, 1));
        assert!(!ring.less_or_equal(1, 7));
        assert_eq!(ring.distance(7, 1), 2);

        ring.clear();
        assert_eq!((ring.head(), ring.tail(), ring.front(), ring.mid()), (0, 0, 0, 0));
    }

    #[test]
    fn round_trip() {
        let mut ring = RingBuffer::new(vec![0u8; 37]);
        let mut reference = VecDeque::new();
        let mut state = 0x2545_f491u32;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state
        };
        let mut byte = 0u8;

        for _ in 0..1000 {
            let len = (next() % 20) as usize;
            if next() % 2 == 0 {
                let data: Vec<u8> = (0..len).map(|_| { byte = byte.wrapping_add(1); byte }).collect();
                let written = ring.add(0, Some(&data), len);
                assert_eq!(written, len.min(36 - reference.len()));
                reference.extend(&data[..written]);
                // Unwritten bytes are not part of the stream.
                byte = byte.wrapping_sub((len - written) as u8);
            } else {
                let mut out = vec![0u8; len];
                let read = ring.get(0, Some(&mut out), len, false);
                assert_eq!(read, len.min(reference.len()));
                let expected: Vec<u8> = reference.drain(..read).collect();
                assert_eq!(&out[..read], &expected[..]);
            }
            assert_eq!(ring.size(), reference.len());
        }
    }
}
