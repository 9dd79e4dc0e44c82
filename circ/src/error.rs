//! Error types for ring buffer operations.

/// Result type alias for circ.
pub type Result<T> = std::result::Result<T, Error>;

/// Ring buffer operation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A region or transfer that the buffer cannot address.
    ///
    /// Always a caller bug: the data length does not match the span, the
    /// span runs backwards, or it is larger than the buffer can ever hold.
    #[error("circ: invalid range {start}..{end} for {len} bytes (capacity {capacity})")]
    Range {
        start: u64,
        end: u64,
        len: usize,
        capacity: usize,
    },

    /// The buffer has been closed. No more data or space will be granted.
    #[error("circ: closed")]
    Closed,
}

impl Error {
    /// Returns true if this is the shutdown error.
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::Closed)
    }
}
