//! Stream framing parsers.

pub mod chunk_header;

pub use chunk_header::{ChunkHeader, ChunkHeaderParser};
