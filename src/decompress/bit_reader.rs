//! Bit reader for the LZX bitstream.
//!
//! The stream is a sequence of 16-bit little-endian words; bits are taken
//! from the most significant end of each word. The reader keeps a 32-bit
//! window of upcoming bits left-aligned in `buffer`.

use super::huffman::DecodeTable;
use super::lzx::BlockType;
use super::{DecompressError, Result};

/// Bytes a refill may run past the end of the chunk body. They read as zero.
const LOOKAHEAD_SLACK: usize = 4;

/// Widest single read the decoder performs (17 extra offset bits).
pub const MAX_READ_BITS: u32 = 17;

/// Bit reader over one chunk's compressed bytes.
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    /// Upcoming bits, MSB first
    buffer: u32,
    /// Valid bits in `buffer` minus 16; refill when this drops below 1
    bit_count: i32,
    /// Sticky underflow flag
    underflow: bool,
}

impl<'a> BitReader<'a> {
    /// Bind a chunk body. The bit buffer stays empty until [`init`](Self::init).
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            buffer: 0,
            bit_count: 0,
            underflow: false,
        }
    }

    /// Seed the bit buffer with the next two words.
    ///
    /// Uncompressed blocks read the byte stream directly, so seeding is
    /// skipped while one is active.
    pub fn init(&mut self, block_type: Option<BlockType>) {
        if block_type == Some(BlockType::Uncompressed) {
            return;
        }
        if self.pos + 4 > self.data.len() {
            self.underflow = true;
            return;
        }
        let hi = u16::from_le_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        let lo = u16::from_le_bytes([self.data[self.pos + 2], self.data[self.pos + 3]]);
        self.buffer = (u32::from(hi) << 16) | u32::from(lo);
        self.bit_count = 16;
        self.pos += 4;
    }

    /// Next refill word, zero-padded inside the lookahead slack.
    #[inline]
    fn next_word(&mut self) -> Option<u32> {
        if self.pos >= self.data.len() + LOOKAHEAD_SLACK {
            return None;
        }
        let b0 = self.data.get(self.pos).copied().unwrap_or(0);
        let b1 = self.data.get(self.pos + 1).copied().unwrap_or(0);
        self.pos += 2;
        Some(u32::from(u16::from_le_bytes([b0, b1])))
    }

    #[inline]
    fn refill(&mut self) {
        match self.next_word() {
            Some(word) => {
                self.buffer |= word << (-self.bit_count) as u32;
                self.bit_count += 16;
            }
            None => self.underflow = true,
        }
    }

    /// Peek at the next `n` bits without consuming them.
    #[inline]
    pub fn peek_bits(&self, n: u32) -> u32 {
        debug_assert!(n <= MAX_READ_BITS);
        if n == 0 {
            return 0;
        }
        self.buffer >> (32 - n)
    }

    /// Drop `n` bits from the front of the buffer.
    ///
    /// A single 17-bit consume can leave the counter at exactly zero after
    /// the first refill, in which case a second word is pulled in.
    #[inline]
    pub fn consume_bits(&mut self, n: u32) {
        debug_assert!(n <= MAX_READ_BITS);
        if n == 0 {
            return;
        }
        self.buffer <<= n;
        self.bit_count -= n as i32;
        if self.bit_count <= 0 {
            if self.underflow {
                return;
            }
            self.refill();
            if self.bit_count <= 0 && !self.underflow {
                self.refill();
            }
        }
    }

    /// Read `n` bits and advance.
    #[inline]
    pub fn read_bits(&mut self, n: u32) -> u32 {
        let value = self.peek_bits(n);
        self.consume_bits(n);
        value
    }

    /// Decode one symbol: direct table lookup, then the overflow tree one
    /// bit at a time for codes longer than the table width.
    #[inline]
    pub fn decode_symbol(&mut self, table: &DecodeTable, lengths: &[u8]) -> Result<usize> {
        let table_bits = table.table_bits();
        let entries = table.entries();
        let mut entry = entries[self.peek_bits(table_bits) as usize];

        if entry < 0 {
            let mut mask = 1u32 << (31 - table_bits);
            loop {
                if mask == 0 {
                    self.underflow = true;
                    return Err(DecompressError::InvalidHuffmanCode);
                }
                let node = (-i32::from(entry)) as usize;
                let child = 2 * node + usize::from(self.buffer & mask != 0);
                entry = match entries.get(child) {
                    Some(&e) => e,
                    None => {
                        self.underflow = true;
                        return Err(DecompressError::InvalidHuffmanCode);
                    }
                };
                if entry >= 0 {
                    break;
                }
                mask >>= 1;
            }
        }

        let symbol = entry as usize;
        let len = *lengths
            .get(symbol)
            .ok_or(DecompressError::InvalidHuffmanCode)?;
        self.consume_bits(u32::from(len));
        Ok(symbol)
    }

    /// Decode an aligned-offset symbol (7-bit table, no overflow region).
    #[inline]
    pub fn decode_aligned(&mut self, table: &[u8; 128], lengths: &[u8; 8]) -> u32 {
        let symbol = table[self.peek_bits(7) as usize];
        self.consume_bits(u32::from(lengths[usize::from(symbol & 7)]));
        u32::from(symbol)
    }

    /// Rewind the byte cursor and discard the bit buffer.
    ///
    /// Used when an uncompressed block begins: the word already pulled into
    /// the buffer belongs to the raw stream.
    pub fn back_up(&mut self, bytes: usize) {
        self.pos = self.pos.saturating_sub(bytes);
        self.buffer = 0;
        self.bit_count = 0;
    }

    /// Read a raw byte from the cursor, bypassing the bit buffer.
    #[inline]
    pub fn read_raw_byte(&mut self) -> Option<u8> {
        let byte = self.data.get(self.pos).copied();
        match byte {
            Some(_) => self.pos += 1,
            None => self.underflow = true,
        }
        byte
    }

    /// Read a raw little-endian `u32` from the cursor.
    pub fn read_raw_u32(&mut self) -> Option<u32> {
        match self.data.get(self.pos..self.pos + 4) {
            Some(bytes) => {
                self.pos += 4;
                Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            None => {
                self.underflow = true;
                None
            }
        }
    }

    /// Skip one raw byte if any remain.
    pub fn skip_pad_byte(&mut self) {
        if self.pos < self.data.len() {
            self.pos += 1;
        }
    }

    /// Bytes consumed from the chunk body so far (including lookahead).
    pub fn byte_position(&self) -> usize {
        self.pos
    }

    /// Valid bits currently held in the buffer.
    pub fn buffered_bits(&self) -> u32 {
        (self.bit_count + 16).max(0) as u32
    }

    /// Whether a refill has run out of input.
    pub fn has_underflowed(&self) -> bool {
        self.underflow
    }

    /// Surface the sticky underflow flag as an error.
    #[inline]
    pub fn status(&self) -> Result<()> {
        if self.underflow {
            Err(DecompressError::BitstreamUnderflow)
        } else {
            Ok(())
        }
    }
}
