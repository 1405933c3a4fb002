//! Chunk header parser.
//!
//! Every chunk of a stream starts with a big-endian header in one of two
//! forms:
//!
//! ```text
//! 0xFF  hi(uncompressed)  lo(uncompressed)  hi(compressed)  lo(compressed)
//! hi(compressed)  lo(compressed)                  (uncompressed = 0x8000)
//! ```
//!
//! The five-byte form also ends the current decode call.

use crate::decompress::{DecompressError, Result, DEFAULT_CHUNK_SIZE};

/// Marker byte that selects the explicit header form.
pub const EXPLICIT_MARKER: u8 = 0xFF;

/// A decoded chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Header bytes on the wire (2 or 5).
    pub header_size: usize,
    /// Bytes the chunk expands to.
    pub uncompressed_size: usize,
    /// Bytes of compressed body following the header.
    pub compressed_size: usize,
    /// Explicit-form header; the decode call stops after this chunk.
    pub is_final: bool,
}

impl ChunkHeader {
    /// Header plus body.
    pub fn total_size(&self) -> usize {
        self.header_size + self.compressed_size
    }
}

pub struct ChunkHeaderParser;

impl ChunkHeaderParser {
    pub const HEADER_SIZE: usize = 2;
    pub const EXPLICIT_HEADER_SIZE: usize = 5;

    pub fn parse(buffer: &[u8]) -> Result<ChunkHeader> {
        let first = *buffer.first().ok_or(DecompressError::TruncatedChunk {
            needed: Self::HEADER_SIZE,
            have: 0,
        })?;

        if first == EXPLICIT_MARKER {
            if buffer.len() < Self::EXPLICIT_HEADER_SIZE {
                return Err(DecompressError::TruncatedChunk {
                    needed: Self::EXPLICIT_HEADER_SIZE,
                    have: buffer.len(),
                });
            }
            return Ok(ChunkHeader {
                header_size: Self::EXPLICIT_HEADER_SIZE,
                uncompressed_size: u16::from_be_bytes([buffer[1], buffer[2]]) as usize,
                compressed_size: u16::from_be_bytes([buffer[3], buffer[4]]) as usize,
                is_final: true,
            });
        }

        if buffer.len() < Self::HEADER_SIZE {
            return Err(DecompressError::TruncatedChunk {
                needed: Self::HEADER_SIZE,
                have: buffer.len(),
            });
        }
        Ok(ChunkHeader {
            header_size: Self::HEADER_SIZE,
            uncompressed_size: DEFAULT_CHUNK_SIZE,
            compressed_size: u16::from_be_bytes([buffer[0], buffer[1]]) as usize,
            is_final: false,
        })
    }
}
