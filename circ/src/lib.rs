//! Fixed-capacity blocking byte ring.
//!
//! This crate provides [`RingBuffer`], a byte ring shared between exactly one
//! producer and one consumer. It decouples the rate at which bytes are
//! produced (for example by an I/O source) from the rate at which they are
//! consumed (for example by a block codec).
//!
//! # Cursors
//!
//! The producer advances `head`, the consumer advances `tail`. Both count
//! bytes since creation and never go backwards; the physical offset of a
//! cursor is `pos % capacity`. At all times `0 <= head - tail <= capacity`.
//!
//! # Blocking
//!
//! - [`RingBuffer::read`] waits until the whole read is buffered
//! - [`RingBuffer::write`] waits until free space strictly exceeds the write
//! - [`RingBuffer::close`] releases every waiter with [`Error::Closed`]
//!
//! ```
//! use giztoy_circ::{Error, RingBuffer};
//!
//! let buf = RingBuffer::new(16, 4);
//! buf.write(&[1, 2, 3, 4]).unwrap();
//!
//! let mut data = [0u8; 4];
//! buf.read(&mut data).unwrap();
//! assert_eq!(data, [1, 2, 3, 4]);
//!
//! buf.close();
//! assert_eq!(buf.read(&mut data), Err(Error::Closed));
//! ```
//!
//! # Low-level access
//!
//! Callers that place bytes themselves use [`RingBuffer::write_region`] /
//! [`RingBuffer::read_region`] together with [`RingBuffer::commit_head`] /
//! [`RingBuffer::commit_tail`].
//!
//! # Thread Safety
//!
//! `RingBuffer` is `Send + Sync`. `Clone` shares the underlying ring via
//! `Arc`, so one handle goes to each thread.

mod config;
mod error;
mod ring_buffer;

pub use config::{Config, DEFAULT_BLOCK_SIZE, DEFAULT_BUFFER_SIZE};
pub use error::{Error, Result};
pub use ring_buffer::RingBuffer;
