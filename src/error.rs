//! Error types for context data containers and their binary frames.

use std::io;
use thiserror::Error;

/// Result type alias for map operations.
pub type Result<T> = std::result::Result<T, MapError>;

/// Failures raised by [`SortedArrayMap`](crate::SortedArrayMap).
///
/// Every variant is a programming error on the caller's side. The map never
/// retries, logs or swallows them, with the exception of the documented frozen
/// no-ops (removing an absent key, clearing an empty map) which succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    /// Rejected constructor or configuration argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Structural mutation attempted on a frozen map.
    #[error("{0}")]
    Unsupported(&'static str),

    /// Positional access outside `[0, size)`.
    #[error("Index {index} out of bounds for size {size}")]
    IndexOutOfBounds { index: usize, size: usize },

    /// The map changed structurally while a traversal was in progress.
    #[error("Map was structurally modified during traversal")]
    ConcurrentModification,
}

impl MapError {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        MapError::InvalidArgument(msg.into())
    }
}

/// Failures raised while encoding or decoding a context data frame.
#[derive(Error, Debug)]
pub enum CodecError {
    /// I/O error from the underlying reader or writer
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Frame does not start with the expected magic bytes
    #[error("Not a context data frame")]
    BadMagic,

    /// Frame was written by an unknown format version
    #[error("Unsupported frame version {0}")]
    UnsupportedVersion(u8),

    /// Frame ended before the announced content
    #[error("Frame truncated at byte {0}")]
    Truncated(usize),

    /// A key is not valid UTF-8
    #[error("Invalid key at entry {0}")]
    InvalidKey(usize),

    /// A value marker other than null (0) or present (1)
    #[error("Invalid value marker {marker} at entry {entry}")]
    InvalidMarker { entry: usize, marker: u8 },

    /// Keys are not strictly ascending
    #[error("Entry {0} is out of order or duplicated")]
    Unordered(usize),

    /// The LZ4 body could not be decompressed
    #[error("Decompression failed: {0}")]
    Decompress(String),

    /// A frame field does not fit the format limits
    #[error("Frame too large: {0}")]
    TooLarge(String),

    /// A compressed body holds bytes after the announced entries
    #[error("{0} unread bytes after the last entry")]
    TrailingBytes(usize),

    /// Map operation failed while rebuilding
    #[error(transparent)]
    Map(#[from] MapError),
}
