//! XMemCompress (Xbox LZX) decompression.
//!
//! Decodes the chunked LZX streams produced by the Xbox 360 runtime
//! compressor, as found inside game containers and patch files.
//!
//! ## Features
//! - Core library has **no required dependencies** beyond `tracing`
//! - `async` - Async range reads with tokio
//! - `parallel` - Decode independent streams on a rayon pool
//!
//! ## Example
//!
//! ```no_run
//! use xmem_lzx::XmemDecoder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let compressed = std::fs::read("texture.xmem")?;
//! let mut decoder = XmemDecoder::new();
//! let data = decoder.decompress_to_vec(&compressed, 0x40000)?;
//! # let _ = data;
//! # Ok(())
//! # }
//! ```

pub mod decompress;
pub mod error;
mod file_media;
#[cfg(feature = "parallel")]
#[cfg_attr(docsrs, doc(cfg(feature = "parallel")))]
pub mod parallel;
pub mod parsing;

pub use error::XmemError;
pub use file_media::{LocalFileMedia, ReadInterval};

#[cfg(feature = "async")]
pub use file_media::{decompress_media, FileMedia};

pub use decompress::{DecoderOptions, DecompressError, Progress, XmemDecoder};
