//! Blocking byte ring shared by one producer and one consumer.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};

/// A thread-safe fixed-capacity byte ring.
///
/// `RingBuffer` decouples a producer from a consumer. The producer advances
/// the `head` cursor, the consumer advances the `tail` cursor. Both cursors
/// count bytes since creation, only ever grow, and are mapped onto the
/// backing store modulo the capacity.
///
/// # Semantics
///
/// - **Read**: Blocks until the whole requested length is available
/// - **Write**: Blocks until free space strictly exceeds the written length,
///   so the ring never becomes completely full
/// - **Close**: Wakes every waiter; all later waits fail with [`Error::Closed`]
///
/// Bytes still buffered at close time are not reachable through the blocking
/// calls. A consumer that wants them checks [`filled_count`](Self::filled_count)
/// and uses [`read_region`](Self::read_region) directly.
///
/// # Example
///
/// ```
/// use giztoy_circ::RingBuffer;
/// use std::thread;
///
/// let buf = RingBuffer::new(16, 4);
/// let producer_buf = buf.clone();
///
/// let producer = thread::spawn(move || {
///     for chunk in [b"abcd", b"efgh", b"ijkl", b"mnop"] {
///         producer_buf.write(chunk).unwrap();
///     }
/// });
///
/// let mut out = [0u8; 16];
/// for block in out.chunks_mut(4) {
///     buf.read(block).unwrap();
/// }
///
/// producer.join().unwrap();
/// assert_eq!(&out, b"abcdefghijklmnop");
/// ```
pub struct RingBuffer {
    inner: Arc<RingBufferInner>,
}

struct RingBufferInner {
    buf: Mutex<Box<[u8]>>,
    capacity: usize,
    block: usize,
    // Absolute cursors: bytes consumed and bytes produced since creation.
    tail: AtomicU64,
    head: AtomicU64,
    done: AtomicBool,
    // Signalled by the writer whenever head advances.
    filled: Monitor,
    // Signalled by the reader whenever tail advances.
    space: Monitor,
}

/// A lock/condition pair. Cursor advances happen while holding `lock`, so a
/// waiter can never miss a wakeup between its check and its park.
struct Monitor {
    lock: Mutex<()>,
    cond: Condvar,
}

impl Monitor {
    fn new() -> Self {
        Monitor {
            lock: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    fn wait_until(&self, done: &AtomicBool, mut ready: impl FnMut() -> bool) -> Result<()> {
        let mut guard = self.lock.lock();
        loop {
            if done.load(Ordering::Acquire) {
                return Err(Error::Closed);
            }
            if ready() {
                return Ok(());
            }
            self.cond.wait(&mut guard);
        }
    }

    fn advance(&self, cursor: &AtomicU64, n: u64) {
        let _guard = self.lock.lock();
        cursor.fetch_add(n, Ordering::AcqRel);
        self.cond.notify_all();
    }

    fn broadcast(&self) {
        let _guard = self.lock.lock();
        self.cond.notify_all();
    }
}

impl Clone for RingBuffer {
    fn clone(&self) -> Self {
        RingBuffer {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (tail, head) = self.positions();
        f.debug_struct("RingBuffer")
            .field("capacity", &self.inner.capacity)
            .field("block", &self.inner.block)
            .field("tail", &tail)
            .field("head", &head)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl RingBuffer {
    /// Creates a new RingBuffer holding at least `size` bytes.
    ///
    /// A zero `size` or `block` selects the defaults. The capacity is rounded
    /// up to a multiple of `block`, with a floor of two blocks.
    pub fn new(size: usize, block: usize) -> Self {
        Self::with_config(Config::new(size, block))
    }

    /// Creates a new RingBuffer from a [`Config`].
    pub fn with_config(config: Config) -> Self {
        let (capacity, block) = config.resolve();
        debug!(capacity, block, "circ: ring buffer created");

        RingBuffer {
            inner: Arc::new(RingBufferInner {
                buf: Mutex::new(vec![0u8; capacity].into_boxed_slice()),
                capacity,
                block,
                tail: AtomicU64::new(0),
                head: AtomicU64::new(0),
                done: AtomicBool::new(false),
                filled: Monitor::new(),
                space: Monitor::new(),
            }),
        }
    }

    /// Returns the size of the backing store in bytes.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Returns the block granularity the capacity was rounded to.
    pub fn block(&self) -> usize {
        self.inner.block
    }

    /// Returns `(tail, head)`.
    ///
    /// Each cursor is read atomically, but not both in one transaction.
    /// Meant for diagnostics.
    pub fn positions(&self) -> (u64, u64) {
        let tail = self.inner.tail.load(Ordering::Acquire);
        let head = self.inner.head.load(Ordering::Acquire);
        (tail, head)
    }

    /// Overwrites both cursors without validation or signalling.
    ///
    /// Only for seeding a buffer that no other thread is using yet.
    pub fn set_positions(&self, tail: u64, head: u64) {
        self.inner.tail.store(tail, Ordering::Release);
        self.inner.head.store(head, Ordering::Release);
    }

    /// Returns the number of unread bytes, `head - tail`.
    ///
    /// The result is kept within `0..=capacity`. Only cursors seeded through
    /// [`set_positions`](Self::set_positions) can fall outside that range; for
    /// those, `tail > head` reports 0 and an overfull ring reports `capacity`.
    pub fn filled_count(&self) -> usize {
        let (tail, head) = self.positions();
        (head.saturating_sub(tail) as usize).min(self.inner.capacity)
    }

    /// Returns the number of free bytes, `capacity - (head - tail)`.
    pub fn free_count(&self) -> usize {
        self.inner.capacity - self.filled_count()
    }

    /// Maps an absolute cursor value onto an offset in the backing store.
    pub fn index(&self, pos: u64) -> usize {
        (pos % self.inner.capacity as u64) as usize
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.done.load(Ordering::Acquire)
    }

    /// Returns a copy of the whole backing store, regardless of cursors.
    pub fn snapshot(&self) -> Vec<u8> {
        self.inner.buf.lock().to_vec()
    }

    /// Copies `data` into the circular span `[start, end)`.
    ///
    /// The span wraps across the end of the store as needed. Cursors are
    /// left alone and no backpressure is applied.
    pub fn write_region(&self, data: &[u8], start: u64, end: u64) -> Result<()> {
        let span = self.check_range(data.len(), start, end)?;
        let offset = self.index(start);
        let first = span.min(self.inner.capacity - offset);

        let mut buf = self.inner.buf.lock();
        buf[offset..offset + first].copy_from_slice(&data[..first]);
        buf[..span - first].copy_from_slice(&data[first..]);
        Ok(())
    }

    /// Copies the circular span `[start, end)` into `out`.
    ///
    /// Counterpart of [`write_region`](Self::write_region) with the same
    /// range rules.
    pub fn read_region(&self, out: &mut [u8], start: u64, end: u64) -> Result<()> {
        let span = self.check_range(out.len(), start, end)?;
        let offset = self.index(start);
        let first = span.min(self.inner.capacity - offset);

        let buf = self.inner.buf.lock();
        out[..first].copy_from_slice(&buf[offset..offset + first]);
        out[first..].copy_from_slice(&buf[..span - first]);
        Ok(())
    }

    fn check_range(&self, len: usize, start: u64, end: u64) -> Result<usize> {
        let capacity = self.inner.capacity;
        let invalid = end < start || end - start != len as u64 || len > capacity;
        if invalid {
            return Err(Error::Range {
                start,
                end,
                len,
                capacity,
            });
        }
        Ok(len)
    }

    /// Blocks until at least `n` unread bytes are available.
    ///
    /// Returns [`Error::Closed`] as soon as the buffer is seen closed, even
    /// if the data would have arrived later.
    pub fn await_filled(&self, n: usize) -> Result<()> {
        let inner = &self.inner;
        inner.filled.wait_until(&inner.done, || self.filled_count() >= n)
    }

    /// Blocks until free space strictly exceeds `n`.
    ///
    /// The strict bound keeps at least one byte free at all times.
    pub fn await_capacity(&self, n: usize) -> Result<()> {
        let inner = &self.inner;
        inner
            .space
            .wait_until(&inner.done, || self.free_count() > n)
    }

    /// Consumes `n` bytes: waits for them, then advances `tail`.
    ///
    /// On error `tail` is left unchanged.
    pub fn commit_tail(&self, n: usize) -> Result<()> {
        if n > self.inner.capacity {
            return Err(self.oversized(self.inner.tail.load(Ordering::Acquire), n));
        }
        self.await_filled(n)?;
        self.inner.space.advance(&self.inner.tail, n as u64);
        Ok(())
    }

    /// Publishes `n` bytes: waits for room, then advances `head`.
    ///
    /// On error `head` is left unchanged.
    pub fn commit_head(&self, n: usize) -> Result<()> {
        if n >= self.inner.capacity {
            return Err(self.oversized(self.inner.head.load(Ordering::Acquire), n));
        }
        self.await_capacity(n)?;
        self.inner.filled.advance(&self.inner.head, n as u64);
        Ok(())
    }

    // A transfer the ring can never satisfy would otherwise park until close.
    // Shutdown still takes priority over the range error.
    fn oversized(&self, pos: u64, n: usize) -> Error {
        if self.is_closed() {
            return Error::Closed;
        }
        Error::Range {
            start: pos,
            end: pos.saturating_add(n as u64),
            len: n,
            capacity: self.inner.capacity,
        }
    }

    /// Reads exactly `buf.len()` bytes.
    ///
    /// Blocks until that many bytes are buffered. Returns the number of bytes
    /// read, which is always `buf.len()` on success.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = buf.len();
        let tail = self.inner.tail.load(Ordering::Acquire);
        if n > self.inner.capacity {
            return Err(self.oversized(tail, n));
        }

        self.await_filled(n)?;
        self.read_region(buf, tail, tail + n as u64)?;
        self.inner.space.advance(&self.inner.tail, n as u64);
        Ok(n)
    }

    /// Writes all of `data`.
    ///
    /// Blocks until the ring has room for it. Returns the number of bytes
    /// written, which is always `data.len()` on success.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let n = data.len();
        let head = self.inner.head.load(Ordering::Acquire);
        if n >= self.inner.capacity {
            return Err(self.oversized(head, n));
        }

        self.await_capacity(n)?;
        self.write_region(data, head, head + n as u64)?;
        self.inner.filled.advance(&self.inner.head, n as u64);
        Ok(n)
    }

    /// Closes the buffer and wakes every waiter.
    ///
    /// Idempotent. After this, all blocking calls fail with [`Error::Closed`].
    pub fn close(&self) {
        if self.inner.done.swap(true, Ordering::AcqRel) {
            return;
        }
        let (tail, head) = self.positions();
        debug!(tail, head, "circ: ring buffer closed");

        self.inner.filled.broadcast();
        self.inner.space.broadcast();
    }
}
