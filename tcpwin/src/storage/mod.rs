//! Byte storage backing the windows of a connection.
//!
//! The window engine only deals with sequence numbers and positions. Staged payload bytes are kept
//! in a [`RingBuffer`] for each direction of a connection, constructed over memory provided by the
//! caller.
//!
//! [`RingBuffer`]: struct.RingBuffer.html
mod ring;

pub use self::ring::RingBuffer;
