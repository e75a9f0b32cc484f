//! The sliding window of a connection.
//!
//! A window tracks sequence numbers, it never touches payload. The receive side decides for every
//! incoming segment whether its bytes are the next ones in the stream, belong somewhere ahead of
//! them, or are to be dropped. The transmit side chops queued bytes into segments, decides which
//! of them to send next and retires them as acknowledgments arrive. Both sides report positions
//! that the caller applies to the [`RingBuffer`] of the respective direction.
//!
//! There are two implementations of the [`Engine`] trait:
//!
//! * [`Window`] keeps any number of segments in flight and holds on to out-of-order data. Its
//!   segment descriptors are allocated from a [`Pool`] shared between connections.
//! * [`SingleWindow`] sends one segment at a time and only accepts in-order data. It does not
//!   need a pool at all, though it takes one in its interface so that both are interchangeable.
//!
//! Which one a connection uses is decided by its type, at construction.
//!
//! ## Retransmission timing
//!
//! A sent segment is retransmitted after `2^n × srtt` where `n` is the number of times it was
//! sent so far, but never later than [`Config::max_retransmit_delay`]. The smoothed round trip time
//! adapts quickly when samples grow and slowly when they shrink. Only segments that were sent
//! exactly once provide a sample.
//!
//! [`RingBuffer`]: ../storage/struct.RingBuffer.html
//! [`Engine`]: trait.Engine.html
//! [`Window`]: struct.Window.html
//! [`SingleWindow`]: struct.SingleWindow.html
//! [`Pool`]: struct.Pool.html
//! [`Config::max_retransmit_delay`]: struct.Config.html#structfield.max_retransmit_delay
use core::borrow::{Borrow, BorrowMut};

use crate::time::{Duration, Instant};
use crate::wire::{TcpSackRange as SackRange, TcpSeqNumber as SeqNumber};

mod engine;
mod pool;
mod rx;
mod single;
mod tx;


pub use self::engine::Window;
pub use self::pool::{Pool, Queue, Role, Segment, SegmentId, State};
pub use self::single::SingleWindow;

/// Parameters of a window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Config {
    /// The maximum segment size.
    pub mss: u32,
    /// The size of the receive window, rounded down to a multiple of `mss`.
    pub rx_window_len: u32,
    /// A limit on the bytes in flight, in addition to the window advertised by the peer.
    pub tx_window_len: u32,
    /// The round trip time assumed before the first measurement.
    pub initial_srtt: Duration,
    /// The smallest smoothed round trip time.
    pub min_srtt: Duration,
    /// The longest time between two transmissions of the same segment.
    pub max_retransmit_delay: Duration,
    /// Hold back segments smaller than `mss` until they are filled.
    pub send_full_segments: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mss: 1460,
            rx_window_len: 8760,
            tx_window_len: 8760,
            initial_srtt: Duration::from_millis(500),
            min_srtt: Duration::from_millis(50),
            max_retransmit_delay: Duration::from_secs(60),
            send_full_segments: false,
        }
    }
}

/// What to do with the payload of an incoming segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RxOutcome {
    /// The bytes are the next in the stream.
    ///
    /// Append them to the receive buffer, as many as fit. Another `extra` bytes that were stored
    /// ahead earlier have become contiguous and can be delivered as well.
    Accept {
        /// Bytes stored earlier that follow the accepted ones.
        extra: u32,
    },
    /// The bytes belong `offset` bytes ahead of the next expected byte.
    ///
    /// Write them ahead of the head of the receive buffer without committing them.
    StoreAt {
        /// The distance from the next expected sequence number.
        offset: u32,
    },
    /// The same out-of-order segment was already stored. Drop it but do answer with the SACK.
    Duplicate,
    /// A keep-alive probe, one sequence number before the next expected byte.
    KeepAlive,
    /// All bytes were already delivered.
    Stale,
    /// Out of window, or no descriptor was available to remember the segment.
    Reject,
}

/// The result of checking an incoming segment against the receive window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RxCheck {
    /// The decision for the payload.
    pub outcome: RxOutcome,
    /// Leading bytes of the payload that were delivered already and must be skipped.
    pub skip: u32,
}

/// A segment that is to be sent now.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TxSegment {
    /// The sequence number of the first byte.
    pub sequence: SeqNumber,
    /// The number of bytes.
    pub len: u32,
    /// Where the bytes are in the transmit buffer.
    pub stream_position: usize,
}

/// The interface shared by both window implementations.
///
/// Operations that involve segment descriptors take the pool as an argument. A window must be used
/// with the same pool for its whole life. None of the operations fail: exhaustion and flow control
/// are reported as zero byte counts, `None` or [`RxOutcome::Reject`].
///
/// [`RxOutcome::Reject`]: enum.RxOutcome.html#variant.Reject
pub trait Engine {
    /// Check an incoming segment of `len` bytes at `seq` while `space` bytes are free in the
    /// receive buffer.
    fn rx_check<C>(&mut self, pool: &mut Pool<C>, seq: SeqNumber, len: u32, space: u32) -> RxCheck
        where C: BorrowMut<[Segment]>;

    /// The next sequence number expected from the peer.
    fn rx_current(&self) -> SeqNumber;

    /// Whether no out-of-order data is stored and everything seen was delivered.
    fn rx_empty(&self) -> bool;

    /// The selective acknowledgment to include in the next outgoing segment.
    fn sack(&self) -> Option<SackRange>;

    /// Queue `len` bytes found at `position` in a transmit buffer of `buffer_len` bytes.
    ///
    /// Returns the number of bytes accepted.
    fn tx_add<C>(&mut self, pool: &mut Pool<C>, len: u32, position: usize, buffer_len: usize) -> u32
        where C: BorrowMut<[Segment]>;

    /// Whether there is something to send.
    ///
    /// `Some(delay)` means `get` will produce a segment once `delay` has passed.
    fn has_data_to_send<C>(&self, pool: &Pool<C>, peer_window: u32, now: Instant) -> Option<Duration>
        where C: Borrow<[Segment]>;

    /// Take the next segment to send, if there is one.
    fn get<C>(&mut self, pool: &mut Pool<C>, peer_window: u32, now: Instant) -> Option<TxSegment>
        where C: BorrowMut<[Segment]>;

    /// Process a cumulative acknowledgment.
    ///
    /// Returns the number of bytes that can be dropped from the transmit buffer.
    fn ack<C>(&mut self, pool: &mut Pool<C>, ack_number: SeqNumber, now: Instant) -> u32
        where C: BorrowMut<[Segment]>;

    /// Confirm the sent range `[first, last)`.
    ///
    /// Returns the number of bytes that can be dropped from the transmit buffer.
    fn ack_range<C>(&mut self, pool: &mut Pool<C>, first: SeqNumber, last: SeqNumber, now: Instant) -> u32
        where C: BorrowMut<[Segment]>;

    /// Process a selective acknowledgment of `[first, last)`.
    fn ack_sack<C>(&mut self, pool: &mut Pool<C>, first: SeqNumber, last: SeqNumber, now: Instant) -> u32
        where C: BorrowMut<[Segment]>;

    /// Whether nothing is queued or in flight.
    fn tx_done(&self) -> bool;

    /// The number of bytes sent and not yet acknowledged.
    fn tx_outstanding(&self) -> u32;

    /// Whether the next queued segment fits into the window of the peer.
    fn tx_has_space<C>(&self, pool: &Pool<C>, peer_window: u32) -> bool
        where C: Borrow<[Segment]>;

    /// Return all descriptors to the pool and forget every queued byte.
    fn destroy<C>(&mut self, pool: &mut Pool<C>)
        where C: BorrowMut<[Segment]>;
}

/// The smoothed round trip time and the backoff derived from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Timing {
    srtt: Duration,
    min_srtt: Duration,
    max_delay: Duration,
}

impl Timing {
    fn new(config: &Config) -> Self {
        Timing {
            srtt: config.initial_srtt.max(config.min_srtt),
            min_srtt: config.min_srtt,
            max_delay: config.max_retransmit_delay,
        }
    }

    /// The time to wait after the `transmit_count`-th transmission.
    fn retransmit_delay(&self, transmit_count: u8) -> Duration {
        1u32.checked_shl(transmit_count.into())
            .and_then(|factor| self.srtt.checked_mul(factor))
            .map(|delay| delay.min(self.max_delay))
            .unwrap_or(self.max_delay)
    }

    /// The time left until a timer started at `start` expires, zero if it already has.
    fn remaining(&self, transmit_count: u8, start: Instant, now: Instant) -> Duration {
        let age = now.saturating_duration_since(start);
        self.retransmit_delay(transmit_count)
            .checked_sub(age)
            .unwrap_or_default()
    }

    fn expired(&self, transmit_count: u8, start: Instant, now: Instant) -> bool {
        self.remaining(transmit_count, start, now) == Duration::from_millis(0)
    }

    fn sample(&mut self, rtt: Duration) {
        let rtt = rtt.as_millis() as u64;
        let srtt = self.srtt.as_millis() as u64;
        let smoothed = if rtt > srtt {
            (2*rtt + 6*srtt) / 8
        } else {
            (rtt + 7*srtt) / 8
        };
        self.srtt = Duration::from_millis(smoothed).max(self.min_srtt);
    }
}
