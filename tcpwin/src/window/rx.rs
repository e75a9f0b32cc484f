//! The receive side of the multi-segment window.
use core::borrow::BorrowMut;

use crate::wire::{TcpSackRange as SackRange, TcpSeqNumber as SeqNumber};

use super::{RxCheck, RxOutcome};
use super::engine::Window;
use super::pool::{Links, Pool, Role, Segment, SegmentId};

impl Window {
    /// Decide what to do with `len` bytes received at `seq`.
    ///
    /// `space` is the number of free bytes in the receive buffer. A segment that starts before
    /// the next expected byte but reaches beyond it is clipped first, the returned `skip` tells
    /// how many leading bytes of the payload to discard.
    ///
    /// In-order data is always accepted, but only its first `space` bytes advance the window. The
    /// rest is dropped and will be sent again by the peer. Appending the payload to a
    /// [`RingBuffer`] with that much space stores exactly the accepted bytes.
    ///
    /// [`RingBuffer`]: ../storage/struct.RingBuffer.html
    pub fn rx_check<C>(&mut self, pool: &mut Pool<C>, seq: SeqNumber, len: u32, space: u32) -> RxCheck
        where C: BorrowMut<[Segment]>
    {
        let current = self.rx.current;
        let mut seq = seq;
        let mut len = len;
        let mut skip = 0;

        let last = seq + len;
        if seq.less_than(current) && last.greater_than(current) {
            skip = current.distance(seq);
            seq = current;
            len = last.distance(current);
        }

        let outcome = if seq == current {
            if len > space {
                net_trace!("window: rx {} len {} cut to buffer space {}",
                    seq.distance(self.rx.first), len, space);
            }
            self.rx_expected(pool, len.min(space))
        } else if seq + 1 == current && len <= 1 {
            RxOutcome::KeepAlive
        } else if len == 0 || last.less_or_equal(current) {
            RxOutcome::Stale
        } else if last.distance(current) > space {
            net_trace!("window: rx {} len {} out of window", seq.distance(self.rx.first), len);
            RxOutcome::Reject
        } else {
            self.rx_unexpected(pool, seq, len)
        };

        RxCheck { outcome, skip }
    }

    /// The next sequence number expected from the peer.
    pub fn rx_current(&self) -> SeqNumber {
        self.rx.current
    }

    /// Whether nothing is stored out of order and every byte seen was delivered.
    pub fn rx_empty(&self) -> bool {
        self.rx_segments.is_empty() && self.rx.current.greater_or_equal(self.rx.highest)
    }

    /// The selective acknowledgment to attach to the next outgoing segment.
    ///
    /// Set after out-of-order data was stored, cleared again once the gap in front of it closed.
    pub fn sack(&self) -> Option<SackRange> {
        self.sack
    }

    fn rx_expected<C>(&mut self, pool: &mut Pool<C>, len: u32) -> RxOutcome
        where C: BorrowMut<[Segment]>
    {
        let start = self.rx.current;
        let delivered = start + len;
        let mut current = delivered;

        // Stored segments that now lie within the delivered stream, possibly reaching past it.
        while let Some(id) = self.rx_find_within(pool.segments(), start, current) {
            let end = pool.segments()[id.index()].end();
            if end.greater_than(current) {
                current = end;
            }
            self.free(pool, id);
        }

        let extra = current.distance(delivered);
        self.rx.current = current;
        if current.greater_than(self.rx.highest) {
            self.rx.highest = current;
        }
        self.sack = None;

        net_trace!("window: rx accepted {} bytes, {} more from storage, now at {}",
            len, extra, current.distance(self.rx.first));
        RxOutcome::Accept { extra }
    }

    fn rx_unexpected<C>(&mut self, pool: &mut Pool<C>, seq: SeqNumber, len: u32) -> RxOutcome
        where C: BorrowMut<[Segment]>
    {
        let mut last = seq + len;
        while let Some(id) = self.rx_find_at(pool.segments(), last) {
            let following = pool.segments()[id.index()].data_len;
            if following == 0 {
                break;
            }
            last += following;
        }
        self.sack = Some(SackRange { first: seq, last });

        if self.rx_find_at(pool.segments(), seq).is_some() {
            net_trace!("window: rx {} already stored", seq.distance(self.rx.first));
            return RxOutcome::Duplicate;
        }

        let id = match pool.allocate(Role::Rx) {
            Some(id) => id,
            None => {
                net_debug!("window: no segment left to store rx {}", seq.distance(self.rx.first));
                self.sack = None;
                return RxOutcome::Reject;
            },
        };

        let segments = pool.segments_mut();
        {
            let segment = &mut segments[id.index()];
            segment.sequence = seq;
            segment.data_len = len;
            segment.max_len = len;
        }
        self.rx_segments.push_back(segments, Links::Owner, id);

        let end = seq + len;
        if end.greater_than(self.rx.highest) {
            self.rx.highest = end;
        }

        let offset = seq.distance(self.rx.current);
        net_trace!("window: rx stored {} len {} at offset {}",
            seq.distance(self.rx.first), len, offset);
        RxOutcome::StoreAt { offset }
    }

    /// A stored segment starting exactly at `seq`.
    fn rx_find_at(&self, segments: &[Segment], seq: SeqNumber) -> Option<SegmentId> {
        self.rx_find(segments, |segment| segment.sequence == seq)
    }

    /// A stored segment starting within `[first, last]`.
    fn rx_find_within(&self, segments: &[Segment], first: SeqNumber, last: SeqNumber)
        -> Option<SegmentId>
    {
        self.rx_find(segments, |segment| {
            segment.sequence.greater_or_equal(first) && segment.sequence.less_or_equal(last)
        })
    }

    fn rx_find<F>(&self, segments: &[Segment], predicate: F) -> Option<SegmentId>
        where F: Fn(&Segment) -> bool
    {
        let mut next = self.rx_segments.front();
        while let Some(id) = next {
            let segment = &segments[id.index()];
            if predicate(segment) {
                return Some(id);
            }
            next = segment.next(Links::Owner);
        }
        None
    }
}
