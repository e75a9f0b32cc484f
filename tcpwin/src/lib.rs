//! A sliding-window segment engine for TCP and the packet admission filter in front of it.
//!
//! ## Table of contents
//!
//! 1. [Design](#design-and-relevant-core-concepts)
//! 2. [The wire module](wire/index.html)
//! 3. [The admission filter](filter/index.html)
//! 4. [The window engines](window/index.html)
//! 5. [The storage module](storage/index.html)
//!
//! ## Design and relevant core concepts
//!
//! Inbound frames pass the [`filter`] first. It checks the structure of the IPv4 or IPv6 header,
//! walks IPv6 extension headers, applies the address policy of the host and verifies checksums.
//! Only a frame that survives all of these is handed to the transport layer, which then consults
//! the [`window`] of its connection to decide where the payload goes.
//!
//! The window keeps track of which sequence numbers were received, which are in flight and which
//! still wait for their first transmission. The bytes themselves are not stored in the window.
//! They live in a [`RingBuffer`] per direction, the window only ever hands out positions within
//! that buffer. Segment descriptors come from a [`Pool`] shared by all connections.
//!
//! Nothing within `tcpwin` dynamically allocates memory. The ring buffers and the segment pool
//! are constructed over memory passed in by the caller. Nothing blocks either: timers are read by
//! comparing an [`Instant`] provided by the caller, a scheduler outside of this crate is
//! responsible for polling the window at the right moment.
//!
//! [`filter`]: filter/index.html
//! [`window`]: window/index.html
//! [`RingBuffer`]: storage/struct.RingBuffer.html
//! [`Pool`]: window/struct.Pool.html
//! [`Instant`]: time/struct.Instant.html
#![warn(missing_docs)]
#![warn(unreachable_pub)]

// tests should be able to use `std`
#![cfg_attr(all(
    not(feature = "std"),
    not(test)),
no_std)]

#[macro_use] mod macros;
pub mod filter;
pub mod storage;
pub mod time;
pub mod window;
pub mod wire;
