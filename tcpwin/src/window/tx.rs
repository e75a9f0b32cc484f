//! The transmit side of the multi-segment window.
//!
//! Every queued byte belongs to exactly one segment on the transmit list of the window, in
//! sequence order. A segment additionally waits in one of three queues:
//!
//! * pending, from `tx_add` until it is sent for the first time,
//! * wait, while it is outstanding,
//! * priority, after a fast retransmit was triggered for it.
//!
//! Segments leave the queues when the peer acknowledges them. They are only released once the
//! left edge of the window reaches them, which may be much later when they were confirmed by a
//! selective acknowledgment.
use core::borrow::{Borrow, BorrowMut};

use crate::time::{Duration, Instant};
use crate::wire::TcpSeqNumber as SeqNumber;

use super::TxSegment;
use super::engine::Window;
use super::pool::{Links, Pool, Queue, Role, Segment, SegmentId};

/// Duplicate acknowledgments after which a segment is sent again without waiting for its timer.
const FAST_RETRANSMIT_THRESHOLD: u8 = 3;

/// Transmissions after which the local window is cut down.
const CONGESTION_TRANSMIT_COUNT: u8 = 4;

impl Window {
    /// Queue `len` bytes that were appended to the transmit buffer at `position`.
    ///
    /// Tops up the last queued segment if it has not been sent yet, then cuts the rest into
    /// segments of at most `mss` bytes. Returns the number of bytes queued, which is less than
    /// `len` when the pool ran out of descriptors.
    pub fn tx_add<C>(&mut self, pool: &mut Pool<C>, len: u32, position: usize, buffer_len: usize) -> u32
        where C: BorrowMut<[Segment]>
    {
        let mut left = len;
        let mut done = 0;
        let mut position = position;

        if let Some(id) = self.head_segment {
            let segment = &mut pool.segments_mut()[id.index()];
            if segment.data_len < segment.max_len && !segment.outstanding && segment.data_len != 0 {
                let n = left.min(segment.max_len - segment.data_len);
                segment.data_len += n;
                if segment.data_len >= segment.max_len {
                    self.head_segment = None;
                }
                left -= n;
                done += n;
                position = advance(position, n, buffer_len);
                self.tx.next_to_queue += n;
            }
        }

        while left > 0 {
            let id = match pool.allocate(Role::Tx) {
                Some(id) => id,
                None => {
                    net_debug!("window: no segment left to queue {} bytes", left);
                    break;
                },
            };

            let n = left.min(self.mss);
            let segments = pool.segments_mut();
            {
                let segment = &mut segments[id.index()];
                segment.sequence = self.tx.next_to_queue;
                segment.max_len = self.mss;
                segment.data_len = n;
                segment.stream_position = position;
            }
            self.tx_segments.push_back(segments, Links::Owner, id);
            self.queues.push(segments, Queue::Pending, id);
            self.head_segment = if n < self.mss { Some(id) } else { None };

            net_trace!("window: tx queued {} len {}",
                self.tx.next_to_queue.distance(self.tx.first), n);

            left -= n;
            done += n;
            position = advance(position, n, buffer_len);
            self.tx.next_to_queue += n;
        }

        done
    }

    /// Whether the next pending segment fits into the window of the peer and our own.
    pub fn tx_has_space<C>(&self, pool: &Pool<C>, peer_window: u32) -> bool
        where C: Borrow<[Segment]>
    {
        match self.queues.pending.front() {
            Some(id) => self.has_space_for(pool.segments()[id.index()].data_len, peer_window),
            None => false,
        }
    }

    /// Whether `get` has something to return, and after how long.
    pub fn has_data_to_send<C>(&self, pool: &Pool<C>, peer_window: u32, now: Instant) -> Option<Duration>
        where C: Borrow<[Segment]>
    {
        let segments = pool.segments();
        if !self.queues.priority.is_empty() {
            return Some(Duration::from_millis(0));
        }

        let waiting = self.queues.wait.front().map(|id| {
            let segment = &segments[id.index()];
            self.timing.remaining(segment.transmit_count, segment.retransmit_timer, now)
        });

        if waiting == Some(Duration::from_millis(0)) {
            return waiting;
        }

        if let Some(id) = self.queues.pending.front() {
            if self.pending_ready(&segments[id.index()], peer_window) {
                return Some(Duration::from_millis(0));
            }
        }

        waiting
    }

    /// Take the next segment to transmit.
    ///
    /// Prefers segments marked for fast retransmit, then segments whose retransmission timer
    /// expired, then new data that fits the windows. The segment moves to the wait queue and its
    /// timer restarts.
    pub fn get<C>(&mut self, pool: &mut Pool<C>, peer_window: u32, now: Instant) -> Option<TxSegment>
        where C: BorrowMut<[Segment]>
    {
        let id = self.tx_pick(pool, peer_window, now)?;

        let segments = pool.segments_mut();
        self.queues.push(segments, Queue::Wait, id);
        let segment = &mut segments[id.index()];
        segment.outstanding = true;
        segment.transmit_count = segment.transmit_count.saturating_add(1);
        segment.retransmit_timer = now;
        let segment = *segment;

        if segment.transmit_count >= CONGESTION_TRANSMIT_COUNT {
            let cut = self.mss.saturating_mul(2);
            if self.tx_window_len > cut {
                net_debug!("window: tx {} sent {} times, window cut to {}",
                    segment.sequence.distance(self.tx.first), segment.transmit_count, cut);
                self.tx_window_len = cut;
            }
        }

        self.our_sequence = segment.sequence;
        net_trace!("window: tx sending {} len {} attempt {}",
            segment.sequence.distance(self.tx.first), segment.data_len, segment.transmit_count);

        Some(TxSegment {
            sequence: segment.sequence,
            len: segment.data_len,
            stream_position: segment.stream_position,
        })
    }

    /// Process a cumulative acknowledgment.
    pub fn ack<C>(&mut self, pool: &mut Pool<C>, ack_number: SeqNumber, now: Instant) -> u32
        where C: BorrowMut<[Segment]>
    {
        if ack_number.less_or_equal(self.tx.current) {
            return 0;
        }
        let first = self.tx.current;
        self.ack_range(pool, first, ack_number, now)
    }

    /// Confirm the segments covering `[first, last)`.
    ///
    /// Every sent segment that starts within the range and ends at or before `last` is marked as
    /// acknowledged. Only bytes at the left edge of the window are released and counted. Segments
    /// further ahead stay until the gap in front of them is closed.
    pub fn ack_range<C>(&mut self, pool: &mut Pool<C>, first: SeqNumber, last: SeqNumber, now: Instant) -> u32
        where C: BorrowMut<[Segment]>
    {
        let mut next = self.tx_segments.front();

        while let Some(id) = next {
            let segment = pool.segments()[id.index()];
            next = segment.next(Links::Owner);

            if segment.acked || segment.sequence.less_than(first) {
                continue;
            }
            // Beyond the range, or data that was never sent.
            if !segment.sequence.less_than(last) || !segment.outstanding {
                break;
            }
            if segment.end().greater_than(last) {
                net_trace!("window: tx {} only partially acknowledged",
                    segment.sequence.distance(self.tx.first));
                break;
            }

            let segments = pool.segments_mut();
            segments[id.index()].acked = true;
            self.queues.remove(segments, id);
            if segment.transmit_count == 1 {
                self.timing.sample(now.saturating_duration_since(segment.retransmit_timer));
            }
        }

        let confirmed = self.tx_release_acked(pool);
        if confirmed > 0 {
            net_trace!("window: tx confirmed {} bytes, left edge at {}",
                confirmed, self.tx.current.distance(self.tx.first));
        }

        confirmed
    }

    /// Process a selective acknowledgment of `[first, last)`.
    ///
    /// Outstanding segments before `first` count a duplicate acknowledgment. On the third one a
    /// segment is queued for immediate retransmission.
    pub fn ack_sack<C>(&mut self, pool: &mut Pool<C>, first: SeqNumber, last: SeqNumber, now: Instant) -> u32
        where C: BorrowMut<[Segment]>
    {
        let confirmed = self.ack_range(pool, first, last, now);
        self.fast_retransmit(pool, first);
        confirmed
    }

    /// Whether nothing is queued or in flight.
    pub fn tx_done(&self) -> bool {
        self.tx_segments.is_empty()
    }

    /// The number of bytes sent and not yet acknowledged at the left edge.
    pub fn tx_outstanding(&self) -> u32 {
        if self.tx.highest.greater_or_equal(self.tx.current) {
            self.tx.highest.distance(self.tx.current)
        } else {
            0
        }
    }

    fn tx_pick<C>(&mut self, pool: &mut Pool<C>, peer_window: u32, now: Instant) -> Option<SegmentId>
        where C: BorrowMut<[Segment]>
    {
        if let Some(id) = self.queues.pop_front(pool.segments_mut(), Queue::Priority) {
            return Some(id);
        }

        if let Some(id) = self.queues.wait.front() {
            let segment = pool.segments()[id.index()];
            if self.timing.expired(segment.transmit_count, segment.retransmit_timer, now) {
                let segments = pool.segments_mut();
                self.queues.remove(segments, id);
                segments[id.index()].dup_ack_count = 0;
                net_trace!("window: tx {} timed out", segment.sequence.distance(self.tx.first));
                return Some(id);
            }
        }

        let id = self.queues.pending.front()?;
        let segment = pool.segments()[id.index()];
        if !self.pending_ready(&segment, peer_window) {
            return None;
        }

        self.queues.remove(pool.segments_mut(), id);
        if self.head_segment == Some(id) {
            self.head_segment = None;
        }
        if segment.end().greater_than(self.tx.highest) {
            self.tx.highest = segment.end();
        }
        Some(id)
    }

    fn pending_ready(&self, segment: &Segment, peer_window: u32) -> bool {
        if self.send_full_segments && segment.data_len < segment.max_len {
            return false;
        }
        self.has_space_for(segment.data_len, peer_window)
    }

    fn has_space_for(&self, len: u32, peer_window: u32) -> bool {
        let outstanding = self.tx_outstanding();
        let available = peer_window - peer_window.min(outstanding);
        if available < len {
            false
        } else {
            outstanding == 0 || self.tx_window_len >= outstanding.saturating_add(len)
        }
    }

    fn fast_retransmit<C>(&mut self, pool: &mut Pool<C>, first: SeqNumber)
        where C: BorrowMut<[Segment]>
    {
        let segments = pool.segments_mut();
        let mut next = self.queues.wait.front();
        while let Some(id) = next {
            next = segments[id.index()].next(Links::Queue);

            let segment = &mut segments[id.index()];
            if segment.acked || !segment.sequence.less_than(first) {
                continue;
            }

            segment.dup_ack_count = segment.dup_ack_count.saturating_add(1);
            if segment.dup_ack_count == FAST_RETRANSMIT_THRESHOLD {
                segment.transmit_count = 0;
                net_trace!("window: tx {} fast retransmit",
                    segment.sequence.distance(self.tx.first));
                self.queues.push(segments, Queue::Priority, id);
            }
        }
    }

    /// Release acknowledged segments that the left edge has reached.
    fn tx_release_acked<C>(&mut self, pool: &mut Pool<C>) -> u32
        where C: BorrowMut<[Segment]>
    {
        let mut released = 0;
        while let Some(id) = self.tx_segments.front() {
            let segment = pool.segments()[id.index()];
            if !segment.acked || segment.sequence != self.tx.current {
                break;
            }
            self.tx.current += segment.data_len;
            released += segment.data_len;
            self.free(pool, id);
        }
        released
    }
}

/// Advance a position in a ring buffer of `buffer_len` bytes.
fn advance(position: usize, count: u32, buffer_len: usize) -> usize {
    if buffer_len == 0 {
        position
    } else {
        (position + count as usize) % buffer_len
    }
}
