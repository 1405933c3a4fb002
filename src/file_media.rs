//! Reading compressed ranges out of container files.
//!
//! Containers declare where the compressed payload lives and how large it
//! expands; [`LocalFileMedia`] reads that range and runs it through an
//! [`XmemDecoder`].

use crate::decompress::XmemDecoder;
use crate::error::{Result, XmemError};
use std::io::{Read, Seek, SeekFrom};

/// Byte range to read. `end` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadInterval {
    pub start: u64,
    pub end: u64,
}

impl ReadInterval {
    /// Bytes covered by the interval, or `None` when `end < start`.
    pub fn size(&self) -> Option<u64> {
        self.end.checked_sub(self.start)?.checked_add(1)
    }

    /// Size of the interval if it lies inside a file of `length` bytes.
    fn checked_size(&self, length: u64) -> Result<usize> {
        match self.size() {
            Some(size) if self.end < length => Ok(size as usize),
            _ => Err(XmemError::InvalidRange {
                start: self.start,
                end: self.end,
                length,
            }),
        }
    }
}

/// Local file implementation.
#[derive(Debug, Clone)]
pub struct LocalFileMedia {
    path: String,
    name: String,
    length: u64,
}

impl LocalFileMedia {
    pub fn new(path: &str) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let name = std::path::Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            path: path.to_string(),
            name,
            length: metadata.len(),
        })
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sync read
    pub fn read_range_sync(&self, interval: ReadInterval) -> Result<Vec<u8>> {
        let size = interval.checked_size(self.length)?;
        let mut file = std::fs::File::open(&self.path)?;
        file.seek(SeekFrom::Start(interval.start))?;
        let mut buffer = vec![0u8; size];
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Read `interval` and decode it to `expected_size` bytes.
    pub fn decompress_range(
        &self,
        interval: ReadInterval,
        expected_size: usize,
        decoder: &mut XmemDecoder,
    ) -> Result<Vec<u8>> {
        let compressed = self.read_range_sync(interval)?;
        tracing::debug!(
            file = %self.name,
            start = interval.start,
            end = interval.end,
            expected_size,
            "decompressing range"
        );
        Ok(decoder.decompress_to_vec(&compressed, expected_size)?)
    }
}

// Async FileMedia trait (requires 'async' feature)
#[cfg(feature = "async")]
use std::future::Future;
#[cfg(feature = "async")]
use std::pin::Pin;

/// Abstract file source that can provide byte ranges asynchronously.
///
/// Implement this trait for custom byte sources (e.g., HTTP range requests).
/// The library provides [`LocalFileMedia`] for local files.
#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub trait FileMedia: Send + Sync {
    fn length(&self) -> u64;
    fn name(&self) -> &str;
    fn read_range(
        &self,
        interval: ReadInterval,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + '_>>;
}

#[cfg(feature = "async")]
impl FileMedia for LocalFileMedia {
    fn length(&self) -> u64 {
        self.length
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn read_range(
        &self,
        interval: ReadInterval,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + '_>> {
        let path = self.path.clone();
        let length = self.length;
        Box::pin(async move {
            use tokio::io::{AsyncReadExt, AsyncSeekExt};
            let size = interval.checked_size(length)?;
            let mut file = tokio::fs::File::open(&path).await?;
            file.seek(std::io::SeekFrom::Start(interval.start)).await?;
            let mut buffer = vec![0u8; size];
            file.read_exact(&mut buffer).await?;
            Ok(buffer)
        })
    }
}

/// Fetch `interval` from any [`FileMedia`] and decode it.
#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub async fn decompress_media(
    media: &dyn FileMedia,
    interval: ReadInterval,
    expected_size: usize,
    decoder: &mut XmemDecoder,
) -> Result<Vec<u8>> {
    let compressed = media.read_range(interval).await?;
    Ok(decoder.decompress_to_vec(&compressed, expected_size)?)
}
