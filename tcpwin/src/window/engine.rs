use core::borrow::{Borrow, BorrowMut};

use crate::time::{Duration, Instant};
use crate::wire::{TcpSackRange as SackRange, TcpSeqNumber as SeqNumber};

use super::{Config, Engine, RxCheck, Timing, TxSegment};
use super::pool::{Links, List, Pool, Queue, Segment, SegmentId, State};

/// Sequence numbers of the receive side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct RxEdges {
    /// The initial sequence number, for logging relative numbers.
    pub(super) first: SeqNumber,
    /// The next expected sequence number.
    pub(super) current: SeqNumber,
    /// The furthest sequence number seen.
    pub(super) highest: SeqNumber,
}

/// Sequence numbers of the transmit side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct TxEdges {
    pub(super) first: SeqNumber,
    /// The oldest unacknowledged sequence number.
    pub(super) current: SeqNumber,
    /// The end of the data sent so far.
    pub(super) highest: SeqNumber,
    /// The sequence number of the next byte queued by `tx_add`.
    pub(super) next_to_queue: SeqNumber,
}

/// The three transmit queues.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(super) struct Queues {
    pub(super) priority: List,
    pub(super) wait: List,
    pub(super) pending: List,
}

impl Queues {
    fn list_mut(&mut self, queue: Queue) -> Option<&mut List> {
        match queue {
            Queue::None => None,
            Queue::Priority => Some(&mut self.priority),
            Queue::Wait => Some(&mut self.wait),
            Queue::Pending => Some(&mut self.pending),
        }
    }

    /// Append a segment to a queue, taking it out of its previous one.
    pub(super) fn push(&mut self, segments: &mut [Segment], queue: Queue, id: SegmentId) {
        self.remove(segments, id);
        if let Some(list) = self.list_mut(queue) {
            list.push_back(segments, Links::Queue, id);
            segments[id.index()].queue = queue;
        }
    }

    /// Take a segment out of whatever queue it is in.
    pub(super) fn remove(&mut self, segments: &mut [Segment], id: SegmentId) {
        let queue = segments[id.index()].queue;
        if let Some(list) = self.list_mut(queue) {
            list.remove(segments, Links::Queue, id);
            segments[id.index()].queue = Queue::None;
        }
    }

    pub(super) fn pop_front(&mut self, segments: &mut [Segment], queue: Queue) -> Option<SegmentId> {
        let id = self.list_mut(queue)?.front()?;
        self.remove(segments, id);
        Some(id)
    }
}

/// The sliding window of one connection.
///
/// Keeps any number of segments in flight and stores the position of out-of-order data it has
/// received, answering it with a selective acknowledgment. Segment descriptors are allocated from
/// a [`Pool`] that is shared with other windows and passed to every operation that needs it.
///
/// [`Pool`]: struct.Pool.html
#[derive(Debug, PartialEq, Eq)]
pub struct Window {
    pub(super) rx: RxEdges,
    pub(super) tx: TxEdges,
    /// The sequence number of the segment sent most recently.
    pub(super) our_sequence: SeqNumber,
    pub(super) rx_window_len: u32,
    pub(super) tx_window_len: u32,
    pub(super) mss: u32,
    pub(super) send_full_segments: bool,
    pub(super) timing: Timing,
    pub(super) sack: Option<SackRange>,
    pub(super) queues: Queues,
    pub(super) rx_segments: List,
    pub(super) tx_segments: List,
    /// A queued segment that `tx_add` may still top up.
    pub(super) head_segment: Option<SegmentId>,
}

impl Window {
    /// Create the window of a connection that starts transfer.
    ///
    /// `rx_initial` is the first sequence number expected from the peer, `tx_initial` the first
    /// sequence number of our own data.
    pub fn new(config: &Config, rx_initial: SeqNumber, tx_initial: SeqNumber) -> Self {
        let mss = config.mss.max(1);
        Window {
            rx: RxEdges {
                first: rx_initial,
                current: rx_initial,
                highest: rx_initial,
            },
            tx: TxEdges {
                first: tx_initial,
                current: tx_initial,
                highest: tx_initial,
                next_to_queue: tx_initial,
            },
            our_sequence: tx_initial,
            rx_window_len: (config.rx_window_len / mss) * mss,
            tx_window_len: config.tx_window_len,
            mss,
            send_full_segments: config.send_full_segments,
            timing: Timing::new(config),
            sack: None,
            queues: Queues::default(),
            rx_segments: List::default(),
            tx_segments: List::default(),
            head_segment: None,
        }
    }

    /// The maximum segment size.
    pub fn mss(&self) -> u32 {
        self.mss
    }

    /// The receive window, a multiple of the segment size.
    pub fn rx_window_len(&self) -> u32 {
        self.rx_window_len
    }

    /// The local limit on bytes in flight.
    ///
    /// Shrinks to twice the segment size once a segment had to be sent four times.
    pub fn tx_window_len(&self) -> u32 {
        self.tx_window_len
    }

    /// The smoothed round trip time.
    pub fn srtt(&self) -> Duration {
        self.timing.srtt
    }

    /// The furthest sequence number received.
    pub fn rx_highest(&self) -> SeqNumber {
        self.rx.highest
    }

    /// The oldest unacknowledged sequence number.
    pub fn tx_current(&self) -> SeqNumber {
        self.tx.current
    }

    /// The end of the data sent so far.
    pub fn tx_highest(&self) -> SeqNumber {
        self.tx.highest
    }

    /// The sequence number the next queued byte will get.
    pub fn tx_next_to_queue(&self) -> SeqNumber {
        self.tx.next_to_queue
    }

    /// The sequence number of the segment sent most recently.
    pub fn our_sequence(&self) -> SeqNumber {
        self.our_sequence
    }

    /// The number of out-of-order segments stored for the receive side.
    pub fn rx_stored(&self) -> usize {
        self.rx_segments.len()
    }

    /// The number of segments owned by the transmit side.
    pub fn tx_segments(&self) -> usize {
        self.tx_segments.len()
    }

    /// The number of segments in a transmit queue.
    pub fn queue_len(&self, queue: Queue) -> usize {
        match queue {
            Queue::None => 0,
            Queue::Priority => self.queues.priority.len(),
            Queue::Wait => self.queues.wait.len(),
            Queue::Pending => self.queues.pending.len(),
        }
    }

    /// Detach a segment from all lists of this window and return it to the pool.
    pub(super) fn free<C>(&mut self, pool: &mut Pool<C>, id: SegmentId)
        where C: BorrowMut<[Segment]>
    {
        {
            let segments = pool.segments_mut();
            self.queues.remove(segments, id);
            match segments[id.index()].state {
                State::Rx => self.rx_segments.remove(segments, Links::Owner, id),
                State::Tx => self.tx_segments.remove(segments, Links::Owner, id),
                State::Free => return,
            }
        }

        if self.head_segment == Some(id) {
            self.head_segment = None;
        }

        pool.release(id);
    }

    /// Return all descriptors to the pool.
    pub fn destroy<C>(&mut self, pool: &mut Pool<C>)
        where C: BorrowMut<[Segment]>
    {
        while let Some(id) = self.rx_segments.front() {
            self.free(pool, id);
        }
        while let Some(id) = self.tx_segments.front() {
            self.free(pool, id);
        }
        self.sack = None;
        self.head_segment = None;
        net_trace!("window: destroyed, {} segments free", pool.available());
    }
}

impl Engine for Window {
    fn rx_check<C>(&mut self, pool: &mut Pool<C>, seq: SeqNumber, len: u32, space: u32) -> RxCheck
        where C: BorrowMut<[Segment]>
    {
        Window::rx_check(self, pool, seq, len, space)
    }

    fn rx_current(&self) -> SeqNumber {
        Window::rx_current(self)
    }

    fn rx_empty(&self) -> bool {
        Window::rx_empty(self)
    }

    fn sack(&self) -> Option<SackRange> {
        Window::sack(self)
    }

    fn tx_add<C>(&mut self, pool: &mut Pool<C>, len: u32, position: usize, buffer_len: usize) -> u32
        where C: BorrowMut<[Segment]>
    {
        Window::tx_add(self, pool, len, position, buffer_len)
    }

    fn has_data_to_send<C>(&self, pool: &Pool<C>, peer_window: u32, now: Instant) -> Option<Duration>
        where C: Borrow<[Segment]>
    {
        Window::has_data_to_send(self, pool, peer_window, now)
    }

    fn get<C>(&mut self, pool: &mut Pool<C>, peer_window: u32, now: Instant) -> Option<TxSegment>
        where C: BorrowMut<[Segment]>
    {
        Window::get(self, pool, peer_window, now)
    }

    fn ack<C>(&mut self, pool: &mut Pool<C>, ack_number: SeqNumber, now: Instant) -> u32
        where C: BorrowMut<[Segment]>
    {
        Window::ack(self, pool, ack_number, now)
    }

    fn ack_range<C>(&mut self, pool: &mut Pool<C>, first: SeqNumber, last: SeqNumber, now: Instant) -> u32
        where C: BorrowMut<[Segment]>
    {
        Window::ack_range(self, pool, first, last, now)
    }

    fn ack_sack<C>(&mut self, pool: &mut Pool<C>, first: SeqNumber, last: SeqNumber, now: Instant) -> u32
        where C: BorrowMut<[Segment]>
    {
        Window::ack_sack(self, pool, first, last, now)
    }

    fn tx_done(&self) -> bool {
        Window::tx_done(self)
    }

    fn tx_outstanding(&self) -> u32 {
        Window::tx_outstanding(self)
    }

    fn tx_has_space<C>(&self, pool: &Pool<C>, peer_window: u32) -> bool
        where C: Borrow<[Segment]>
    {
        Window::tx_has_space(self, pool, peer_window)
    }

    fn destroy<C>(&mut self, pool: &mut Pool<C>)
        where C: BorrowMut<[Segment]>
    {
        Window::destroy(self, pool)
    }
}
