use core::borrow::{Borrow, BorrowMut};

use crate::time::{Duration, Instant};
use crate::wire::{TcpSackRange as SackRange, TcpSeqNumber as SeqNumber};

use super::{Config, Engine, RxCheck, RxOutcome, Timing, TxSegment};
use super::pool::{Pool, Segment};

/// A window with a single segment in flight.
///
/// Only accepts data at exactly the next expected sequence number and never stores anything out
/// of order, so it does not produce selective acknowledgments either. The one transmit segment is
/// held inline, the pool passed to the operations is never touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SingleWindow {
    rx_first: SeqNumber,
    rx_current: SeqNumber,
    tx_first: SeqNumber,
    tx_current: SeqNumber,
    mss: u32,
    timing: Timing,
    segment: Segment,
}

impl SingleWindow {
    /// Create the window of a connection that starts transfer.
    pub fn new(config: &Config, rx_initial: SeqNumber, tx_initial: SeqNumber) -> Self {
        SingleWindow {
            rx_first: rx_initial,
            rx_current: rx_initial,
            tx_first: tx_initial,
            tx_current: tx_initial,
            mss: config.mss.max(1),
            timing: Timing::new(config),
            segment: Segment::default(),
        }
    }

    /// The maximum segment size.
    pub fn mss(&self) -> u32 {
        self.mss
    }

    /// The smoothed round trip time.
    pub fn srtt(&self) -> Duration {
        self.timing.srtt
    }

    /// The oldest unacknowledged sequence number.
    pub fn tx_current(&self) -> SeqNumber {
        self.tx_current
    }

    /// The segment that is queued or in flight, if any.
    pub fn segment(&self) -> Option<&Segment> {
        if self.segment.data_len == 0 {
            None
        } else {
            Some(&self.segment)
        }
    }

    fn has_space(&self, peer_window: u32) -> bool {
        peer_window >= self.segment.data_len
    }
}

impl Engine for SingleWindow {
    fn rx_check<C>(&mut self, _: &mut Pool<C>, seq: SeqNumber, len: u32, space: u32) -> RxCheck
        where C: BorrowMut<[Segment]>
    {
        let outcome = if seq == self.rx_current {
            self.rx_current += len.min(space);
            RxOutcome::Accept { extra: 0 }
        } else {
            net_trace!("single: rx {} len {} rejected, expecting {}",
                seq.distance(self.rx_first), len, self.rx_current.distance(self.rx_first));
            RxOutcome::Reject
        };

        RxCheck { outcome, skip: 0 }
    }

    fn rx_current(&self) -> SeqNumber {
        self.rx_current
    }

    fn rx_empty(&self) -> bool {
        true
    }

    fn sack(&self) -> Option<SackRange> {
        None
    }

    fn tx_add<C>(&mut self, _: &mut Pool<C>, len: u32, position: usize, _: usize) -> u32
        where C: BorrowMut<[Segment]>
    {
        if len == 0 {
            return 0;
        }

        if self.segment.data_len != 0 {
            // Only a segment that was never sent may grow.
            let segment = &mut self.segment;
            if segment.outstanding || segment.data_len >= segment.max_len {
                return 0;
            }
            let n = len.min(segment.max_len - segment.data_len);
            segment.data_len += n;
            return n;
        }

        let n = len.min(self.mss);
        self.segment = Segment::default();
        self.segment.sequence = self.tx_current;
        self.segment.data_len = n;
        self.segment.max_len = self.mss;
        self.segment.stream_position = position;
        n
    }

    fn has_data_to_send<C>(&self, _: &Pool<C>, peer_window: u32, now: Instant) -> Option<Duration>
        where C: Borrow<[Segment]>
    {
        let segment = &self.segment;
        if segment.data_len == 0 {
            None
        } else if segment.outstanding {
            Some(self.timing.remaining(segment.transmit_count, segment.retransmit_timer, now))
        } else if self.has_space(peer_window) {
            Some(Duration::from_millis(0))
        } else {
            None
        }
    }

    fn get<C>(&mut self, _: &mut Pool<C>, peer_window: u32, now: Instant) -> Option<TxSegment>
        where C: BorrowMut<[Segment]>
    {
        if self.segment.data_len == 0 {
            return None;
        }

        if self.segment.outstanding {
            let segment = &self.segment;
            if !self.timing.expired(segment.transmit_count, segment.retransmit_timer, now) {
                return None;
            }
        } else if !self.has_space(peer_window) {
            return None;
        }

        let segment = &mut self.segment;
        segment.outstanding = true;
        segment.transmit_count = segment.transmit_count.saturating_add(1);
        segment.retransmit_timer = now;

        net_trace!("single: tx sending {} len {} attempt {}",
            segment.sequence.distance(self.tx_first), segment.data_len, segment.transmit_count);

        Some(TxSegment {
            sequence: segment.sequence,
            len: segment.data_len,
            stream_position: segment.stream_position,
        })
    }

    fn ack<C>(&mut self, _: &mut Pool<C>, ack_number: SeqNumber, now: Instant) -> u32
        where C: BorrowMut<[Segment]>
    {
        let segment = self.segment;
        if segment.data_len == 0 || !segment.outstanding || ack_number.less_than(segment.end()) {
            return 0;
        }

        if segment.transmit_count == 1 {
            self.timing.sample(now.saturating_duration_since(segment.retransmit_timer));
        }
        self.tx_current += segment.data_len;
        self.segment = Segment::default();
        segment.data_len
    }

    fn ack_range<C>(&mut self, pool: &mut Pool<C>, first: SeqNumber, last: SeqNumber, now: Instant) -> u32
        where C: BorrowMut<[Segment]>
    {
        if first.less_or_equal(self.tx_current) {
            self.ack(pool, last, now)
        } else {
            0
        }
    }

    fn ack_sack<C>(&mut self, _: &mut Pool<C>, _: SeqNumber, _: SeqNumber, _: Instant) -> u32
        where C: BorrowMut<[Segment]>
    {
        0
    }

    fn tx_done(&self) -> bool {
        self.segment.data_len == 0
    }

    fn tx_outstanding(&self) -> u32 {
        if self.segment.outstanding {
            self.segment.data_len
        } else {
            0
        }
    }

    fn tx_has_space<C>(&self, _: &Pool<C>, peer_window: u32) -> bool
        where C: Borrow<[Segment]>
    {
        self.segment.data_len != 0 && !self.segment.outstanding && self.has_space(peer_window)
    }

    fn destroy<C>(&mut self, _: &mut Pool<C>)
        where C: BorrowMut<[Segment]>
    {
        self.segment = Segment::default();
    }
}
