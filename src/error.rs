//! Error type for the file-facing API.
//!
//! Decoding itself reports [`DecompressError`]; reading the compressed range
//! out of a container adds I/O and range errors on top.
//!
//! | Category | Errors | Description |
//! |----------|--------|-------------|
//! | Stream | [`Decompress`] | Corrupt or truncated LZX data |
//! | Range | [`InvalidRange`] | Requested bytes lie outside the file |
//! | I/O | [`Io`] | Read errors |
//!
//! [`Decompress`]: XmemError::Decompress
//! [`InvalidRange`]: XmemError::InvalidRange
//! [`Io`]: XmemError::Io

use std::fmt;
use std::io;

use crate::decompress::DecompressError;

#[derive(Debug)]
pub enum XmemError {
    /// The compressed stream is corrupt.
    Decompress(DecompressError),

    /// An interval does not fit inside the file.
    InvalidRange {
        start: u64,
        end: u64,
        /// The actual file length.
        length: u64,
    },

    /// An I/O error occurred.
    Io(io::Error),
}

impl fmt::Display for XmemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decompress(e) => write!(f, "Decompression failed: {}", e),
            Self::InvalidRange { start, end, length } => {
                write!(
                    f,
                    "Invalid range: {}..={} (file length: {})",
                    start, end, length
                )
            }
            Self::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for XmemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decompress(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::InvalidRange { .. } => None,
        }
    }
}

impl From<io::Error> for XmemError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<DecompressError> for XmemError {
    fn from(e: DecompressError) -> Self {
        Self::Decompress(e)
    }
}

pub type Result<T> = std::result::Result<T, XmemError>;
