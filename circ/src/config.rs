//! Sizing configuration for ring buffers.

use tracing::trace;

/// Buffer size used when none is requested (256 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// Block size used when none is requested (4 KiB).
pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024;

/// Requested size and block granularity for a [`RingBuffer`](crate::RingBuffer).
///
/// A zero field means "use the default". The actual capacity is derived by
/// [`Config::resolve`]: the smallest multiple of `block` that holds `size`,
/// never less than two blocks.
///
/// # Example
///
/// ```
/// use giztoy_circ::Config;
///
/// let (capacity, block) = Config::new(14, 4).resolve();
/// assert_eq!((capacity, block), (16, 4));
///
/// // A single block is bumped to two.
/// let (capacity, _) = Config::default().size(100).block(100).resolve();
/// assert_eq!(capacity, 200);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Requested buffer size in bytes.
    pub size: usize,
    /// Alignment granularity of the capacity in bytes.
    pub block: usize,
}

impl Config {
    /// Create a config with the given size and block.
    pub fn new(size: usize, block: usize) -> Self {
        Self { size, block }
    }

    /// Create a config sized to hold `count` blocks of `block` bytes.
    pub fn blocks(count: usize, block: usize) -> Self {
        Self {
            size: count.saturating_mul(block),
            block,
        }
    }

    /// Set the requested size.
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Set the block granularity.
    pub fn block(mut self, block: usize) -> Self {
        self.block = block;
        self
    }

    /// Resolve into `(capacity, block)`.
    ///
    /// Invalid inputs are corrected, never rejected.
    pub fn resolve(&self) -> (usize, usize) {
        let size = if self.size == 0 {
            trace!(fallback = DEFAULT_BUFFER_SIZE, "circ: no size requested");
            DEFAULT_BUFFER_SIZE
        } else {
            self.size
        };
        let block = if self.block == 0 {
            trace!(fallback = DEFAULT_BLOCK_SIZE, "circ: no block size requested");
            DEFAULT_BLOCK_SIZE
        } else {
            self.block
        };

        let capacity = size
            .div_ceil(block)
            .max(2)
            .checked_mul(block)
            .unwrap_or(usize::MAX / block * block);
        if capacity != size {
            trace!(size, block, capacity, "circ: size rounded to block multiple");
        }
        (capacity, block)
    }
}
