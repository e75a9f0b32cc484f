use core::borrow::{Borrow, BorrowMut};

use crate::time::Instant;
use crate::wire::TcpSeqNumber as SeqNumber;

/// Index of a segment in its pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId(usize);

impl SegmentId {
    /// The position of the descriptor in the storage of the pool.
    pub fn index(self) -> usize {
        self.0
    }
}

/// The direction a segment was allocated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Out-of-order data that was received and is waiting for the gap ahead of it to close.
    Rx,
    /// Data queued for transmission, or sent and not yet acknowledged.
    Tx,
}

/// The owner of a pool slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    /// On the free list of the pool.
    Free,
    /// Owned by the receive side of a window.
    Rx,
    /// Owned by the transmit side of a window.
    Tx,
}

/// The transmit queue a segment is waiting in.
///
/// Membership in a queue is independent of the owner of a segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Queue {
    /// In no queue at all.
    None,
    /// To be sent again as soon as possible, after a fast retransmit.
    Priority,
    /// Sent and waiting for an acknowledgment or its retransmission timer.
    Wait,
    /// Queued and never sent.
    Pending,
}

impl Default for Queue {
    fn default() -> Self {
        Queue::None
    }
}

impl Default for State {
    fn default() -> Self {
        State::Free
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Link {
    prev: Option<SegmentId>,
    next: Option<SegmentId>,
}

/// Selects one of the two links of every segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Links {
    /// The free list or the segment list of the owning window.
    Owner,
    /// One of the transmit queues.
    Queue,
}

/// A descriptor for a contiguous run of payload at a known sequence number.
///
/// The payload itself is not stored here, only its position within the ring buffer of the
/// connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Segment {
    pub(crate) sequence: SeqNumber,
    pub(crate) data_len: u32,
    pub(crate) max_len: u32,
    pub(crate) stream_position: usize,
    pub(crate) state: State,
    pub(crate) outstanding: bool,
    pub(crate) acked: bool,
    pub(crate) transmit_count: u8,
    pub(crate) dup_ack_count: u8,
    pub(crate) retransmit_timer: Instant,
    pub(crate) queue: Queue,
    owner_link: Link,
    queue_link: Link,
}

impl Segment {
    /// The first sequence number covered.
    pub fn sequence(&self) -> SeqNumber {
        self.sequence
    }

    /// The number of payload bytes.
    pub fn data_len(&self) -> u32 {
        self.data_len
    }

    /// The maximum number of payload bytes, for segments that are still being filled.
    pub fn max_len(&self) -> u32 {
        self.max_len
    }

    /// The sequence number following the last byte.
    pub fn end(&self) -> SeqNumber {
        self.sequence + self.data_len
    }

    /// Where the payload starts in the ring buffer of the connection.
    pub fn stream_position(&self) -> usize {
        self.stream_position
    }

    /// The current owner.
    pub fn state(&self) -> State {
        self.state
    }

    /// The queue this segment is waiting in.
    pub fn queue(&self) -> Queue {
        self.queue
    }

    /// Whether the segment was sent and is awaiting acknowledgment.
    pub fn is_outstanding(&self) -> bool {
        self.outstanding
    }

    /// Whether the peer confirmed all of its bytes.
    pub fn is_acked(&self) -> bool {
        self.acked
    }

    /// How often the segment was sent since the last reset.
    pub fn transmit_count(&self) -> u8 {
        self.transmit_count
    }

    /// Selective acknowledgments of later data seen while this segment was outstanding.
    pub fn dup_ack_count(&self) -> u8 {
        self.dup_ack_count
    }

    fn link(&self, links: Links) -> &Link {
        match links {
            Links::Owner => &self.owner_link,
            Links::Queue => &self.queue_link,
        }
    }

    fn link_mut(&mut self, links: Links) -> &mut Link {
        match links {
            Links::Owner => &mut self.owner_link,
            Links::Queue => &mut self.queue_link,
        }
    }

    pub(crate) fn next(&self, links: Links) -> Option<SegmentId> {
        self.link(links).next
    }
}

/// A doubly linked list threaded through the segments of a pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct List {
    head: Option<SegmentId>,
    tail: Option<SegmentId>,
    len: usize,
}

impl List {
    pub(crate) fn front(&self) -> Option<SegmentId> {
        self.head
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub(crate) fn push_back(&mut self, segments: &mut [Segment], links: Links, id: SegmentId) {
        *segments[id.0].link_mut(links) = Link { prev: self.tail, next: None };
        match self.tail {
            Some(tail) => segments[tail.0].link_mut(links).next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
    }

    pub(crate) fn remove(&mut self, segments: &mut [Segment], links: Links, id: SegmentId) {
        let Link { prev, next } = *segments[id.0].link(links);
        match prev {
            Some(prev) => segments[prev.0].link_mut(links).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => segments[next.0].link_mut(links).prev = prev,
            None => self.tail = prev,
        }
        *segments[id.0].link_mut(links) = Link::default();
        self.len -= 1;
    }

    pub(crate) fn pop_front(&mut self, segments: &mut [Segment], links: Links) -> Option<SegmentId> {
        let head = self.head?;
        self.remove(segments, links, head);
        Some(head)
    }
}

/// A fixed number of segment descriptors shared by all windows.
///
/// The pool is constructed over memory provided by the caller and never grows. Windows allocate
/// descriptors from it when they first use a sequence number and release them when the bytes are
/// acknowledged or delivered. All windows that share the pool must be used with that same pool for
/// their whole lifetime, the descriptors they own are identified by index only.
///
/// Access is serialized by requiring `&mut Pool` for every operation that changes ownership. When
/// windows live on different threads, put the pool behind a lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pool<C> {
    segments: C,
    free: List,
}

impl<C: BorrowMut<[Segment]>> Pool<C> {
    /// Create a pool where every descriptor is free.
    pub fn new(mut segments: C) -> Self {
        let mut free = List::default();
        {
            let slice = segments.borrow_mut();
            for index in 0..slice.len() {
                slice[index] = Segment::default();
                free.push_back(slice, Links::Owner, SegmentId(index));
            }
        }
        Pool { segments, free }
    }

    /// Take a descriptor from the free list.
    ///
    /// Returns `None` if the pool is exhausted. This is not an error, callers should accept
    /// fewer bytes and try again later.
    pub fn allocate(&mut self, role: Role) -> Option<SegmentId> {
        let segments = self.segments.borrow_mut();
        let id = self.free.pop_front(segments, Links::Owner)?;
        let segment = &mut segments[id.0];
        *segment = Segment::default();
        segment.state = match role {
            Role::Rx => State::Rx,
            Role::Tx => State::Tx,
        };
        Some(id)
    }

    /// Clear a descriptor and put it back on the free list.
    ///
    /// The owning window detaches the segment from its own lists before releasing it. Releasing
    /// a segment twice has no effect.
    pub fn release(&mut self, id: SegmentId) {
        let segments = self.segments.borrow_mut();
        if segments[id.0].state == State::Free {
            return;
        }
        segments[id.0] = Segment::default();
        self.free.push_back(segments, Links::Owner, id);
    }

    pub(crate) fn segments_mut(&mut self) -> &mut [Segment] {
        self.segments.borrow_mut()
    }
}

impl<C: Borrow<[Segment]>> Pool<C> {
    /// The number of free descriptors.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// The total number of descriptors.
    pub fn capacity(&self) -> usize {
        self.segments.borrow().len()
    }

    /// Inspect a descriptor.
    pub fn get(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.borrow().get(id.0)
    }

    pub(crate) fn segments(&self) -> &[Segment] {
        self.segments.borrow()
    }

    /// Return the underlying storage.
    pub fn into_inner(self) -> C {
        self.segments
    }
}
