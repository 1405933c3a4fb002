//! XMemCompress LZX decompression.
//!
//! The runtime compressor emits a sequence of framed chunks, each holding an
//! LZX bitstream that expands to (usually) 32 KiB of output. All chunks of one
//! stream share a single sliding dictionary, so a decoder instance carries
//! state from one chunk, and one [`XmemDecoder::decompress`] call, to the next.
//!
//! ## Block Types
//!
//! | Value | Name | Contents |
//! |-------|------|----------|
//! | `1` | Verbatim | Main + length trees, raw extra offset bits |
//! | `2` | Aligned | As verbatim, plus an 8-symbol tree for the low 3 offset bits |
//! | `3` | Uncompressed | Three raw repeat offsets followed by literal bytes |
//!
//! ## Architecture
//!
//! ```text
//! Chunk framing (parsing::chunk_header)
//!       ↓
//! ┌─────────────┐
//! │ BitReader   │ ← 16-bit little-endian words, MSB-first bits
//! └─────────────┘
//!       ↓
//! ┌─────────────┐
//! │ DecodeTable │ ← canonical Huffman, direct table + overflow nodes
//! └─────────────┘
//!       ↓
//! ┌─────────────┐
//! │ Window      │ ← literals and matches into the shared dictionary
//! └─────────────┘
//!       ↓
//! ┌─────────────┐
//! │ E8 fixup    │ ← x86 CALL displacement translation on the output
//! └─────────────┘
//!       ↓
//! Decompressed Data
//! ```

mod bit_reader;
mod e8;
mod huffman;
mod lzx;
mod trees;
mod window;

#[cfg(test)]
pub(crate) mod test_support;

pub use bit_reader::BitReader;
pub use e8::IntelTranslator;
pub use huffman::{build_aligned_table, DecodeTable};
pub use lzx::{BlockType, DecoderOptions, Progress, RepeatOffsets, XmemDecoder};
pub use window::Window;

use std::fmt;

/// Smallest match the format can express.
pub const MIN_MATCH: usize = 2;

/// Largest match the format can express (7 + 248 length-tree symbols + 2).
pub const MAX_MATCH: usize = 257;

/// Number of literal symbols at the start of the main tree.
pub const NUM_CHARS: usize = 256;

/// Length slots coded inline in a main-tree symbol; slot 7 escapes to the length tree.
pub const NUM_PRIMARY_LENGTHS: usize = 7;

/// Symbols in the length tree.
pub const NUM_SECONDARY_LENGTHS: usize = 249;

/// Symbols in the aligned-offset tree.
pub const ALIGNED_NUM_ELEMENTS: usize = 8;

/// Symbols in each pretree.
pub const PRETREE_NUM_ELEMENTS: usize = 20;

/// Default uncompressed size of a chunk with a two-byte header.
pub const DEFAULT_CHUNK_SIZE: usize = 0x8000;

/// Largest on-wire chunk (header + compressed body) the format permits.
pub const MAX_CHUNK_SIZE: usize = 0x980A;

/// Decompression errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecompressError {
    /// A refill needed more compressed bytes than the chunk holds.
    BitstreamUnderflow,
    /// A code-length set is over- or under-subscribed, or overflowed node storage.
    InvalidHuffmanTree,
    /// A symbol walk left the allocated overflow nodes.
    InvalidHuffmanCode,
    /// A pretree delta produced a code length above 16.
    InvalidCodeLength(u8),
    /// A block header carried a type other than 1, 2 or 3.
    InvalidBlockType(u8),
    /// A chunk is larger on the wire than the format allows.
    ChunkTooLarge { size: usize, limit: usize },
    /// A chunk header or body extends past the end of the input.
    TruncatedChunk { needed: usize, have: usize },
    /// A chunk declares more output than the dictionary holds.
    ChunkExceedsWindow { size: usize, window: usize },
    /// A match ran past the end of its block or chunk.
    MatchOverrun { overrun: usize },
    /// The caller's output buffer cannot hold the next chunk.
    OutputTooSmall { needed: usize, have: usize },
    /// The stream ended before the expected number of bytes was produced.
    IncompleteData { expected: usize, produced: usize },
    /// The configured window is not a power of two in 32 KiB..=2 MiB.
    InvalidWindowSize(u32),
}

impl fmt::Display for DecompressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BitstreamUnderflow => write!(f, "Unexpected end of compressed data"),
            Self::InvalidHuffmanTree => write!(f, "Invalid Huffman code lengths"),
            Self::InvalidHuffmanCode => write!(f, "Invalid Huffman code"),
            Self::InvalidCodeLength(len) => write!(f, "Invalid code length: {}", len),
            Self::InvalidBlockType(t) => write!(f, "Invalid block type: {}", t),
            Self::ChunkTooLarge { size, limit } => {
                write!(f, "Chunk too large: {} bytes (limit {})", size, limit)
            }
            Self::TruncatedChunk { needed, have } => {
                write!(f, "Truncated chunk: need {} bytes, have {}", needed, have)
            }
            Self::ChunkExceedsWindow { size, window } => {
                write!(
                    f,
                    "Chunk output of {} bytes exceeds window size {}",
                    size, window
                )
            }
            Self::MatchOverrun { overrun } => {
                write!(f, "Match overruns its block by {} bytes", overrun)
            }
            Self::OutputTooSmall { needed, have } => {
                write!(f, "Output buffer too small: need {} bytes, have {}", needed, have)
            }
            Self::IncompleteData { expected, produced } => {
                write!(
                    f,
                    "Incomplete data: expected {} bytes, produced {}",
                    expected, produced
                )
            }
            Self::InvalidWindowSize(size) => write!(f, "Invalid window size: 0x{:x}", size),
        }
    }
}

impl std::error::Error for DecompressError {}

pub type Result<T> = std::result::Result<T, DecompressError>;
