//! Error types shared by every codec in this crate.

use thiserror::Error;

/// The error type returned by any codec's `compress`/`decompress`.
///
/// Every codec in this crate funnels its failures through this single enum rather than
/// defining one error type per format: the failure modes are the same shape everywhere
/// (truncated input, a malformed header, a back-reference that reads out of bounds), and a
/// caller juggling several codecs only needs to match on one type.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CodecError {
    /// Input exceeds the codec's declared maximum (see each module's `MAX_INPUT`).
    #[error("input of {len} bytes exceeds the maximum of {max} bytes")]
    InputTooLarge {
        /// Length of the rejected input, in bytes.
        len: usize,
        /// The codec's maximum accepted input length, in bytes.
        max: usize,
    },

    /// The decoder ran out of source bytes in the middle of a token.
    #[error("truncated stream: ran out of input while decoding a token")]
    TruncatedStream,

    /// A leading header (subset indicator, length prefix, `q` selector, ...) was malformed.
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),

    /// A decoded `(offset, length)` would read before the start of the output, or past the
    /// output cursor at the time of the copy.
    #[error("invalid back-reference: offset {offset} length {length} at output position {cursor}")]
    InvalidBackReference {
        /// The decoded 1-based offset.
        offset: usize,
        /// The decoded match length.
        length: usize,
        /// The output cursor at the time the back-reference was applied.
        cursor: usize,
    },

    /// Pletter's `q` selector was outside `1..=7`.
    #[error("invalid q value: {0} (must be in 1..=7)")]
    InvalidQValue(u8),

    /// Raised only by the validation harness: `compress` succeeded but
    /// `decompress(compress(x)) != x`.
    #[error("round-trip mismatch: decompress(compress(x)) != x")]
    RoundTripMismatch,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CodecError>;
