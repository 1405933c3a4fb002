//! Chunk and block state machine.
//!
//! A stream is a run of framed chunks. Each chunk is bit-decoded with a fresh
//! [`BitReader`], but blocks, Huffman trees, the repeat-offset cache and the
//! dictionary all carry over from chunk to chunk (and from one
//! [`XmemDecoder::decompress`] call to the next) until [`XmemDecoder::reset`].

use tracing::{debug, trace, warn};

use super::bit_reader::BitReader;
use super::e8::IntelTranslator;
use super::trees::LzxTrees;
use super::window::Window;
use super::{
    DecompressError, Result, MAX_CHUNK_SIZE, MIN_MATCH, NUM_CHARS, NUM_PRIMARY_LENGTHS,
};
use crate::parsing::{ChunkHeader, ChunkHeaderParser};

/// Number of entries in the position slot tables (enough for a 2 MiB window).
const NUM_POSITION_TABLE_ENTRIES: usize = 51;

/// Extra offset bits per position slot.
pub(crate) const EXTRA_BITS: [u8; NUM_POSITION_TABLE_ENTRIES] = build_extra_bits();

/// First formatted offset of each position slot.
pub(crate) const POSITION_BASE: [u32; NUM_POSITION_TABLE_ENTRIES] = build_position_base();

const fn build_extra_bits() -> [u8; NUM_POSITION_TABLE_ENTRIES] {
    let mut bits = [0u8; NUM_POSITION_TABLE_ENTRIES];
    let mut i = 0;
    while i < NUM_POSITION_TABLE_ENTRIES {
        bits[i] = if i < 4 {
            0
        } else if i < 36 {
            (i / 2 - 1) as u8
        } else {
            17
        };
        i += 1;
    }
    bits
}

const fn build_position_base() -> [u32; NUM_POSITION_TABLE_ENTRIES] {
    let bits = build_extra_bits();
    let mut base = [0u32; NUM_POSITION_TABLE_ENTRIES];
    let mut i = 1;
    while i < NUM_POSITION_TABLE_ENTRIES {
        base[i] = base[i - 1] + (1 << bits[i - 1]);
        i += 1;
    }
    base
}

/// Position slots for a window size.
pub(crate) fn position_slots(window_size: u32) -> usize {
    match window_size.trailing_zeros() {
        20 => 42,
        21 => 50,
        bits => 2 * bits as usize,
    }
}

/// Smallest supported window.
pub const MIN_WINDOW_SIZE: u32 = 0x8000;

/// Largest supported window.
pub const MAX_WINDOW_SIZE: u32 = 0x200000;

/// Block type from the 3-bit block header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Verbatim = 1,
    Aligned = 2,
    Uncompressed = 3,
}

impl BlockType {
    pub fn from_bits(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Verbatim),
            2 => Some(Self::Aligned),
            3 => Some(Self::Uncompressed),
            _ => None,
        }
    }
}

/// Decoder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Dictionary size; a power of two from 32 KiB to 2 MiB.
    pub window_size: u32,
    /// Leading chunks that receive the E8 fixup.
    pub intel_chunk_limit: u32,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            window_size: 0x20000,
            intel_chunk_limit: 32768,
        }
    }
}

impl DecoderOptions {
    pub fn with_window_size(mut self, window_size: u32) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_intel_chunk_limit(mut self, limit: u32) -> Self {
        self.intel_chunk_limit = limit;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let size = self.window_size;
        if !size.is_power_of_two() || !(MIN_WINDOW_SIZE..=MAX_WINDOW_SIZE).contains(&size) {
            return Err(DecompressError::InvalidWindowSize(size));
        }
        Ok(())
    }
}

/// Bytes consumed from the input and produced into the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub consumed: usize,
    pub produced: usize,
}

/// Three most recent match offsets, most recent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatOffsets([u32; 3]);

impl Default for RepeatOffsets {
    fn default() -> Self {
        Self([1, 1, 1])
    }
}

impl RepeatOffsets {
    pub fn from_values(values: [u32; 3]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> [u32; 3] {
        self.0
    }

    /// Use the offset in `slot` (0..=2), swapping it to the front.
    #[inline]
    pub fn select(&mut self, slot: usize) -> u32 {
        self.0.swap(0, slot);
        self.0[0]
    }

    /// Record an explicitly coded offset.
    #[inline]
    pub fn push(&mut self, offset: u32) {
        self.0 = [offset, self.0[0], self.0[1]];
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    NeedBlockHeader,
    Decoding,
}

/// XMemCompress stream decoder.
///
/// One instance decodes one logical stream; use a separate instance (or
/// [`reset`](Self::reset)) for each unrelated stream.
pub struct XmemDecoder {
    options: DecoderOptions,
    window: Window,
    trees: LzxTrees,
    repeats: RepeatOffsets,
    state: DecoderState,
    block_type: Option<BlockType>,
    block_remaining: usize,
    /// The next block header is the stream's first and carries the E8 flag
    first_block: bool,
    intel: IntelTranslator,
    chunk_count: u32,
    bytes_written: u64,
    last_progress: Progress,
}

impl XmemDecoder {
    /// Decoder with the default 128 KiB window.
    pub fn new() -> Self {
        Self::build(DecoderOptions::default())
    }

    pub fn with_options(options: DecoderOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::build(options))
    }

    pub(crate) fn build(options: DecoderOptions) -> Self {
        Self {
            options,
            window: Window::new(options.window_size as usize),
            trees: LzxTrees::new(position_slots(options.window_size)),
            repeats: RepeatOffsets::default(),
            state: DecoderState::NeedBlockHeader,
            block_type: None,
            block_remaining: 0,
            first_block: true,
            intel: IntelTranslator::default(),
            chunk_count: 0,
            bytes_written: 0,
            last_progress: Progress::default(),
        }
    }

    /// Return to the freshly constructed state, keeping the options.
    pub fn reset(&mut self) {
        self.window.reset();
        self.trees.reset();
        self.repeats = RepeatOffsets::default();
        self.state = DecoderState::NeedBlockHeader;
        self.block_type = None;
        self.block_remaining = 0;
        self.first_block = true;
        self.intel = IntelTranslator::default();
        self.chunk_count = 0;
        self.bytes_written = 0;
        self.last_progress = Progress::default();
    }

    pub fn window_size(&self) -> usize {
        self.window.size()
    }

    /// Bytes produced since construction or the last reset.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Progress of the most recent [`decompress`](Self::decompress) call,
    /// counting only chunks that completed. Valid after a failure too.
    pub fn last_progress(&self) -> Progress {
        self.last_progress
    }

    pub fn repeat_offsets(&self) -> RepeatOffsets {
        self.repeats
    }

    /// Decode chunks from `input` into `output`.
    ///
    /// Stops at the end of the input or after a chunk with the explicit
    /// (`0xFF`) header, whichever comes first. On error nothing is returned
    /// for the failing chunk; [`last_progress`](Self::last_progress) holds
    /// the counts for the chunks before it.
    pub fn decompress(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress> {
        let mut progress = Progress::default();
        self.last_progress = progress;

        while progress.consumed < input.len() {
            let header = match self.decompress_chunk(
                &input[progress.consumed..],
                &mut output[progress.produced..],
            ) {
                Ok(header) => header,
                Err(err) => {
                    warn!(
                        chunk = self.chunk_count,
                        consumed = progress.consumed,
                        produced = progress.produced,
                        error = %err,
                        "aborting corrupt stream"
                    );
                    return Err(err);
                }
            };
            progress.consumed += header.total_size();
            progress.produced += header.uncompressed_size;
            self.last_progress = progress;
            if header.is_final {
                break;
            }
        }

        Ok(progress)
    }

    /// Decode a whole stream of `expected_size` bytes, calling
    /// [`decompress`](Self::decompress) until the input or the expected
    /// size runs out.
    pub fn decompress_to_vec(&mut self, input: &[u8], expected_size: usize) -> Result<Vec<u8>> {
        let mut output = vec![0u8; expected_size];
        let mut consumed = 0;
        let mut produced = 0;

        while consumed < input.len() && produced < expected_size {
            let progress = self.decompress(&input[consumed..], &mut output[produced..])?;
            if progress.consumed == 0 {
                break;
            }
            consumed += progress.consumed;
            produced += progress.produced;
        }

        if produced < expected_size {
            return Err(DecompressError::IncompleteData {
                expected: expected_size,
                produced,
            });
        }
        Ok(output)
    }

    fn decompress_chunk(&mut self, input: &[u8], output: &mut [u8]) -> Result<ChunkHeader> {
        let header = ChunkHeaderParser::parse(input)?;
        let total = header.total_size();
        if total > MAX_CHUNK_SIZE {
            return Err(DecompressError::ChunkTooLarge {
                size: total,
                limit: MAX_CHUNK_SIZE,
            });
        }
        if total > input.len() {
            return Err(DecompressError::TruncatedChunk {
                needed: total,
                have: input.len(),
            });
        }
        let size = header.uncompressed_size;
        if size > self.window.size() {
            return Err(DecompressError::ChunkExceedsWindow {
                size,
                window: self.window.size(),
            });
        }
        if size > output.len() {
            return Err(DecompressError::OutputTooSmall {
                needed: size,
                have: output.len(),
            });
        }

        debug!(
            chunk = self.chunk_count,
            header = header.header_size,
            compressed = header.compressed_size,
            uncompressed = size,
            "decoding chunk"
        );

        if size > 0 {
            let start = self.window.position();
            self.decode_chunk_body(&input[header.header_size..total], size)?;

            let out = &mut output[..size];
            self.window.copy_out(start, out);
            if self.intel.is_active() && self.chunk_count < self.options.intel_chunk_limit {
                self.intel.translate(out);
            }
            self.bytes_written += size as u64;
        }
        self.chunk_count += 1;

        Ok(header)
    }

    /// Run the block loop until `size` bytes of the chunk are in the window.
    fn decode_chunk_body(&mut self, body: &[u8], size: usize) -> Result<()> {
        let mut reader = BitReader::new(body);
        reader.init(self.block_type);
        reader.status()?;

        let mut remaining = size;
        while remaining > 0 {
            if self.state == DecoderState::NeedBlockHeader {
                self.read_block_header(&mut reader)?;
                continue;
            }

            let amount = self.block_remaining.min(remaining);
            let decoded = match self.block_type {
                Some(BlockType::Verbatim) => self.decode_verbatim(&mut reader, amount)?,
                Some(BlockType::Aligned) => self.decode_aligned(&mut reader, amount)?,
                Some(BlockType::Uncompressed) => self.decode_uncompressed(&mut reader, amount)?,
                None => return Err(DecompressError::InvalidBlockType(0)),
            };
            reader.status()?;
            if decoded > amount {
                return Err(DecompressError::MatchOverrun {
                    overrun: decoded - amount,
                });
            }

            self.block_remaining -= decoded;
            remaining -= decoded;
            if self.block_remaining == 0 {
                self.state = DecoderState::NeedBlockHeader;
            }
        }

        Ok(())
    }

    fn read_block_header(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        if self.block_type == Some(BlockType::Uncompressed) {
            // Realign the raw cursor to a word before returning to bits
            if reader.byte_position() % 2 == 1 {
                reader.skip_pad_byte();
            }
            self.block_type = None;
            reader.init(None);
        }

        if self.first_block {
            self.first_block = false;
            let file_size = if reader.read_bits(1) == 1 {
                let hi = reader.read_bits(16);
                let lo = reader.read_bits(16);
                (hi << 16) | lo
            } else {
                0
            };
            self.intel.set_file_size(file_size);
        }

        let kind = reader.read_bits(3);
        let size = (reader.read_bits(8) << 16) | (reader.read_bits(8) << 8) | reader.read_bits(8);
        reader.status()?;

        let block_type =
            BlockType::from_bits(kind).ok_or(DecompressError::InvalidBlockType(kind as u8))?;
        trace!(
            ?block_type,
            size,
            intel_file_size = self.intel.file_size(),
            "block header"
        );

        match block_type {
            BlockType::Aligned => {
                self.trees.read_aligned(reader)?;
                self.trees.read_main_and_length(reader)?;
            }
            BlockType::Verbatim => {
                self.trees.read_main_and_length(reader)?;
            }
            BlockType::Uncompressed => {
                reader.back_up(2);
                let mut values = [0u32; 3];
                for value in &mut values {
                    *value = reader
                        .read_raw_u32()
                        .ok_or(DecompressError::BitstreamUnderflow)?;
                }
                self.repeats = RepeatOffsets::from_values(values);
            }
        }
        reader.status()?;

        self.block_type = Some(block_type);
        self.block_remaining = size as usize;
        self.state = DecoderState::Decoding;
        Ok(())
    }

    fn decode_verbatim(&mut self, reader: &mut BitReader<'_>, amount: usize) -> Result<usize> {
        self.decode_lz(reader, amount, false)
    }

    fn decode_aligned(&mut self, reader: &mut BitReader<'_>, amount: usize) -> Result<usize> {
        self.decode_lz(reader, amount, true)
    }

    /// Literal/match loop shared by verbatim and aligned blocks. Returns the
    /// bytes produced, which exceeds `amount` if the last match ran over.
    fn decode_lz(
        &mut self,
        reader: &mut BitReader<'_>,
        amount: usize,
        aligned: bool,
    ) -> Result<usize> {
        let mut decoded = 0;
        while decoded < amount {
            let symbol = reader.decode_symbol(&self.trees.main_table, &self.trees.main_lengths)?;
            if symbol < NUM_CHARS {
                self.window.write_literal(symbol as u8);
                decoded += 1;
                continue;
            }

            let symbol = symbol - NUM_CHARS;
            let mut length = symbol & 7;
            if length == NUM_PRIMARY_LENGTHS {
                length += reader
                    .decode_symbol(&self.trees.length_table, &self.trees.length_lengths)?;
            }

            let slot = symbol >> 3;
            let offset = if slot > 2 {
                let extra = u32::from(EXTRA_BITS[slot]);
                let base = POSITION_BASE[slot] - 2;
                let offset = if aligned && extra >= 3 {
                    let high = if extra > 3 {
                        reader.read_bits(extra - 3) << 3
                    } else {
                        0
                    };
                    let low = reader
                        .decode_aligned(&self.trees.aligned_table, &self.trees.aligned_lengths);
                    base + high + low
                } else if extra > 0 {
                    base + reader.read_bits(extra)
                } else {
                    1
                };
                self.repeats.push(offset);
                offset
            } else {
                self.repeats.select(slot)
            };

            let length = length + MIN_MATCH;
            self.window.copy_match(offset, length);
            decoded += length;
        }
        Ok(decoded)
    }

    fn decode_uncompressed(&mut self, reader: &mut BitReader<'_>, amount: usize) -> Result<usize> {
        for _ in 0..amount {
            let byte = reader
                .read_raw_byte()
                .ok_or(DecompressError::BitstreamUnderflow)?;
            self.window.write_literal(byte);
        }
        Ok(amount)
    }
}

impl Default for XmemDecoder {
    fn default() -> Self {
        Self::new()
    }
}
