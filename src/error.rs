//! Error types for bitpiper.

use thiserror::Error;

/// Error variants for compression and decompression.
#[derive(Debug, Error)]
pub enum Error {
    /// The context depth is outside the supported range.
    #[error("invalid context depth {depth}: expected 1..={max}")]
    InvalidDepth {
        /// Requested depth.
        depth: u32,
        /// Largest supported depth.
        max: u8,
    },

    /// The input does not start with the container magic.
    #[error("not a bitpiper stream (bad magic {0:02x?})")]
    BadMagic([u8; 4]),

    /// The container was written by an unknown format version.
    #[error("unsupported container version {0}")]
    UnsupportedVersion(u8),

    /// The container names a codec this build does not know.
    #[error("unknown codec id {0}")]
    UnknownCodec(u8),

    /// The input ended before a required field.
    #[error("truncated stream: needed {needed} bytes, found {available}")]
    Truncated {
        /// Bytes required.
        needed: usize,
        /// Bytes present.
        available: usize,
    },

    /// Declared lengths disagree with the payload.
    #[error("corrupt stream: {0}")]
    Corrupt(String),

    /// The decoder's interval no longer contains the code point.
    #[error("corrupt stream: interval lost the code point at bit {bit}")]
    LostContainment {
        /// Index of the source bit being decoded.
        bit: u64,
    },

    /// An I/O error occurred while reading or writing a file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for bitpiper operations.
pub type Result<T> = std::result::Result<T, Error>;
