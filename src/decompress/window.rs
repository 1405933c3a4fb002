//! Sliding dictionary shared by every chunk of a stream.
//!
//! The buffer is `size + 0x106` bytes. Writes to the first [`MAX_MATCH`]
//! positions are mirrored past the end, so a match source that straddles
//! the physical end can be read as one contiguous run.

use super::MAX_MATCH;

/// Tail padding after the dictionary proper.
const TAIL_PADDING: usize = 0x106;

/// LZ77 dictionary.
pub struct Window {
    buf: Vec<u8>,
    size: usize,
    mask: usize,
    /// Next write position, always `< size`
    pos: usize,
}

impl Window {
    /// Create a zeroed window. `size` must be a power of two.
    pub fn new(size: usize) -> Self {
        debug_assert!(size.is_power_of_two());
        Self {
            buf: vec![0; size + TAIL_PADDING],
            size,
            mask: size - 1,
            pos: 0,
        }
    }

    /// Dictionary size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Current write position.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Zero the dictionary and rewind.
    pub fn reset(&mut self) {
        self.buf.fill(0);
        self.pos = 0;
    }

    #[inline]
    fn put(&mut self, at: usize, byte: u8) {
        self.buf[at] = byte;
        if at < MAX_MATCH {
            self.buf[self.size + at] = byte;
        }
    }

    /// Append one byte.
    #[inline]
    pub fn write_literal(&mut self, byte: u8) {
        self.put(self.pos, byte);
        self.pos = (self.pos + 1) & self.mask;
    }

    /// Copy `length` bytes from `offset` bytes back.
    ///
    /// When the destination does not wrap, the source is read through the
    /// mirror without masking. Overlapping copies (offset < length) repeat
    /// the pattern byte by byte.
    #[inline]
    pub fn copy_match(&mut self, offset: u32, length: usize) {
        debug_assert!(length <= MAX_MATCH);
        if self.pos + length > self.size {
            self.copy_match_wrapping(offset, length);
            return;
        }
        let src = self.pos.wrapping_sub(offset as usize) & self.mask;
        let dest = self.pos;
        for i in 0..length {
            let byte = self.buf[src + i];
            self.put(dest + i, byte);
        }
        self.pos = (self.pos + length) & self.mask;
    }

    /// Match copy with every index masked into the window.
    pub fn copy_match_wrapping(&mut self, offset: u32, length: usize) {
        let mut src = self.pos.wrapping_sub(offset as usize) & self.mask;
        for _ in 0..length {
            let byte = self.buf[src];
            self.write_literal(byte);
            src = (src + 1) & self.mask;
        }
    }

    /// Copy `dest.len()` bytes starting at window position `start` into
    /// `dest`, wrapping at the end of the dictionary.
    pub fn copy_out(&self, start: usize, dest: &mut [u8]) {
        debug_assert!(dest.len() <= self.size);
        let start = start & self.mask;
        let first = dest.len().min(self.size - start);
        dest[..first].copy_from_slice(&self.buf[start..start + first]);
        let rest = dest.len() - first;
        dest[first..].copy_from_slice(&self.buf[..rest]);
    }
}
