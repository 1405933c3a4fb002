//! Test-only bitstream encoder.
//!
//! Produces exactly the layout the decoder consumes: MSB-first bits packed
//! into 16-bit little-endian words, canonical Huffman codes, pretree-coded
//! tree updates, block headers and chunk framing. Scenarios are built from
//! these real streams rather than opaque fixtures.

use super::lzx::{position_slots, EXTRA_BITS, POSITION_BASE};
use super::{
    ALIGNED_NUM_ELEMENTS, MIN_MATCH, NUM_CHARS, NUM_PRIMARY_LENGTHS, NUM_SECONDARY_LENGTHS,
    PRETREE_NUM_ELEMENTS,
};

/// Packs bits MSB-first into little-endian 16-bit words.
pub struct BitWriter {
    out: Vec<u8>,
    acc: u32,
    nbits: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self {
            out: Vec::new(),
            acc: 0,
            nbits: 0,
        }
    }

    /// Append the low `n` bits of `value`, most significant first.
    pub fn bits(&mut self, value: u32, n: u32) {
        for i in (0..n).rev() {
            self.acc = (self.acc << 1) | ((value >> i) & 1);
            self.nbits += 1;
            if self.nbits == 16 {
                self.out.extend_from_slice(&(self.acc as u16).to_le_bytes());
                self.acc = 0;
                self.nbits = 0;
            }
        }
    }

    /// Pad with zero bits up to the next word boundary.
    pub fn pad_to_word(&mut self) {
        if self.nbits > 0 {
            self.bits(0, 16 - self.nbits);
        }
    }

    /// Padding in front of an uncompressed block body. Always 1 to 16 bits:
    /// a header that ends on a word boundary is followed by a whole zero word.
    pub fn align_uncompressed(&mut self) {
        self.bits(0, 16 - self.nbits);
    }

    /// Append raw bytes. Only valid on a word boundary.
    pub fn raw_bytes(&mut self, bytes: &[u8]) {
        assert_eq!(self.nbits, 0, "raw bytes must start on a word boundary");
        self.out.extend_from_slice(bytes);
    }

    /// Flush to a whole word; the decoder seeds from at least two words.
    pub fn finish(mut self) -> Vec<u8> {
        self.pad_to_word();
        while self.out.len() < 4 {
            self.out.push(0);
        }
        self.out
    }
}

/// Canonical codes `(code, length)` for a set of code lengths.
pub fn canonical_codes(lengths: &[u8]) -> Vec<(u32, u8)> {
    let mut bl_count = [0u32; 17];
    for &len in lengths {
        if len > 0 {
            bl_count[len as usize] += 1;
        }
    }
    let mut next_code = [0u32; 17];
    let mut code = 0u32;
    for bits in 1..=16 {
        code = (code + bl_count[bits - 1]) << 1;
        next_code[bits] = code;
    }
    lengths
        .iter()
        .map(|&len| {
            if len == 0 {
                (0, 0)
            } else {
                let c = next_code[len as usize];
                next_code[len as usize] += 1;
                (c, len)
            }
        })
        .collect()
}

/// Complete code lengths covering every symbol in `used`.
///
/// With `n` used symbols and `k = ceil(log2 n)`, `2^k - n` symbols get
/// length `k - 1` and the rest length `k`. A lone symbol is paired with a
/// dummy so the code stays complete. No symbols gives all zeros.
pub fn complete_lengths(num_symbols: usize, used: &[usize]) -> Vec<u8> {
    let mut symbols: Vec<usize> = used.to_vec();
    symbols.sort_unstable();
    symbols.dedup();

    let mut lengths = vec![0u8; num_symbols];
    if symbols.is_empty() {
        return lengths;
    }
    if symbols.len() == 1 {
        let dummy = if symbols[0] == 0 { 1 } else { 0 };
        symbols.push(dummy);
        symbols.sort_unstable();
    }

    let n = symbols.len();
    let k = n.next_power_of_two().trailing_zeros() as u8;
    let short = (1usize << k) - n;
    for (i, &s) in symbols.iter().enumerate() {
        lengths[s] = if i < short { k - 1 } else { k };
    }
    lengths
}

/// Offset part of a match.
#[derive(Debug, Clone, Copy)]
pub enum MatchOffset {
    /// Reuse repeat-offset slot 0, 1 or 2.
    Repeat(usize),
    /// Explicit distance (at least 1).
    Explicit(u32),
}

/// One literal or match of a compressed block.
#[derive(Debug, Clone, Copy)]
pub enum Token {
    Literal(u8),
    Match { length: usize, offset: MatchOffset },
}

impl Token {
    pub fn explicit(length: usize, offset: u32) -> Self {
        Token::Match {
            length,
            offset: MatchOffset::Explicit(offset),
        }
    }

    pub fn repeat(length: usize, slot: usize) -> Self {
        Token::Match {
            length,
            offset: MatchOffset::Repeat(slot),
        }
    }

    fn output_len(&self) -> usize {
        match self {
            Token::Literal(_) => 1,
            Token::Match { length, .. } => *length,
        }
    }
}

/// Literal tokens for a byte string.
pub fn literals(bytes: &[u8]) -> Vec<Token> {
    bytes.iter().map(|&b| Token::Literal(b)).collect()
}

/// Position slot holding an explicit distance.
pub fn slot_for_offset(offset: u32, num_slots: usize) -> usize {
    assert!(offset >= 1);
    let formatted = offset + 2;
    (3..num_slots)
        .rev()
        .find(|&slot| POSITION_BASE[slot] <= formatted)
        .expect("offset below slot 3")
}

enum Emit {
    Main(usize),
    Length(usize),
    Raw(u32, u32),
    Aligned(usize),
}

/// Writes LZX blocks for one stream, carrying tree lengths from block to
/// block the way the decoder does.
pub struct StreamWriter {
    writer: BitWriter,
    num_slots: usize,
    main_lengths: Vec<u8>,
    length_lengths: Vec<u8>,
    first_block: bool,
    intel_file_size: u32,
    use_runs: bool,
}

impl StreamWriter {
    pub fn new(window_size: u32) -> Self {
        let num_slots = position_slots(window_size);
        Self {
            writer: BitWriter::new(),
            num_slots,
            main_lengths: vec![0; NUM_CHARS + 8 * num_slots],
            length_lengths: vec![0; NUM_SECONDARY_LENGTHS],
            first_block: true,
            intel_file_size: 0,
            use_runs: true,
        }
    }

    /// Announce an Intel translation file size in the first block header.
    pub fn with_intel_file_size(mut self, file_size: u32) -> Self {
        self.intel_file_size = file_size;
        self
    }

    /// Code every tree element as a single delta symbol.
    pub fn without_runs(mut self) -> Self {
        self.use_runs = false;
        self
    }

    pub fn main_lengths(&self) -> &[u8] {
        &self.main_lengths
    }

    fn block_header(&mut self, kind: u32, size: usize) {
        if self.first_block {
            if self.intel_file_size != 0 {
                self.writer.bits(1, 1);
                self.writer.bits(self.intel_file_size >> 16, 16);
                self.writer.bits(self.intel_file_size & 0xFFFF, 16);
            } else {
                self.writer.bits(0, 1);
            }
            self.first_block = false;
        }
        self.writer.bits(kind, 3);
        self.writer.bits((size >> 16) as u32 & 0xFF, 8);
        self.writer.bits((size >> 8) as u32 & 0xFF, 8);
        self.writer.bits(size as u32 & 0xFF, 8);
    }

    pub fn verbatim_block(&mut self, tokens: &[Token]) {
        let size = tokens.iter().map(Token::output_len).sum();
        self.compressed_block(1, &[tokens], size);
    }

    pub fn aligned_block(&mut self, tokens: &[Token]) {
        let size = tokens.iter().map(Token::output_len).sum();
        self.compressed_block(2, &[tokens], size);
    }

    /// Verbatim block whose header declares `size` regardless of the tokens.
    pub fn verbatim_block_declaring(&mut self, tokens: &[Token], size: usize) {
        self.compressed_block(1, &[tokens], size);
    }

    /// Verbatim block whose codes run past the end of the current chunk.
    /// `first` must fill the rest of the chunk; its body is returned and
    /// `rest` stays open in the next chunk.
    pub fn verbatim_block_across_chunks(&mut self, first: &[Token], rest: &[Token]) -> Vec<u8> {
        self.block_across_chunks(1, first, rest)
    }

    pub fn aligned_block_across_chunks(&mut self, first: &[Token], rest: &[Token]) -> Vec<u8> {
        self.block_across_chunks(2, first, rest)
    }

    fn block_across_chunks(&mut self, kind: u32, first: &[Token], rest: &[Token]) -> Vec<u8> {
        let size = first.iter().chain(rest).map(Token::output_len).sum();
        let mut bodies = self.compressed_block(kind, &[first, rest], size);
        bodies.remove(0)
    }

    /// Write one block whose tokens come in `parts`. Every part but the last
    /// closes its chunk; those chunk bodies are returned.
    fn compressed_block(&mut self, kind: u32, parts: &[&[Token]], size: usize) -> Vec<Vec<u8>> {
        let aligned = kind == 2;
        let planned: Vec<Vec<Emit>> = parts.iter().map(|p| self.plan(p, aligned)).collect();

        let mut used_main = Vec::new();
        let mut used_length = Vec::new();
        let mut used_aligned = Vec::new();
        for e in planned.iter().flatten() {
            match e {
                Emit::Main(s) => used_main.push(*s),
                Emit::Length(s) => used_length.push(*s),
                Emit::Aligned(s) => used_aligned.push(*s),
                Emit::Raw(..) => {}
            }
        }
        let main_lengths = complete_lengths(self.main_lengths.len(), &used_main);
        let length_lengths = complete_lengths(NUM_SECONDARY_LENGTHS, &used_length);
        let aligned_lengths = complete_lengths(ALIGNED_NUM_ELEMENTS, &used_aligned);

        self.block_header(kind, size);
        if aligned {
            for &len in &aligned_lengths {
                self.writer.bits(u32::from(len), 3);
            }
        }

        let prev_main = std::mem::replace(&mut self.main_lengths, main_lengths.clone());
        self.write_tree(&prev_main[..NUM_CHARS], &main_lengths[..NUM_CHARS]);
        self.write_tree(&prev_main[NUM_CHARS..], &main_lengths[NUM_CHARS..]);
        let prev_length = std::mem::replace(&mut self.length_lengths, length_lengths.clone());
        self.write_tree(&prev_length, &length_lengths);

        let main_codes = canonical_codes(&self.main_lengths);
        let length_codes = canonical_codes(&self.length_lengths);
        let aligned_codes = canonical_codes(&aligned_lengths);
        let last = planned.len() - 1;
        let mut bodies = Vec::new();
        for (i, emits) in planned.into_iter().enumerate() {
            for e in emits {
                let (code, len) = match e {
                    Emit::Main(s) => main_codes[s],
                    Emit::Length(s) => length_codes[s],
                    Emit::Aligned(s) => aligned_codes[s],
                    Emit::Raw(value, n) => (value, n as u8),
                };
                self.writer.bits(code, u32::from(len));
            }
            if i != last {
                bodies.push(self.finish_chunk());
            }
        }
        bodies
    }

    fn plan(&self, tokens: &[Token], aligned: bool) -> Vec<Emit> {
        let mut emits = Vec::new();
        for token in tokens {
            match *token {
                Token::Literal(b) => emits.push(Emit::Main(b as usize)),
                Token::Match { length, offset } => {
                    assert!((MIN_MATCH..=257).contains(&length));
                    let length_header = (length - MIN_MATCH).min(NUM_PRIMARY_LENGTHS);
                    let slot = match offset {
                        MatchOffset::Repeat(slot) => slot,
                        MatchOffset::Explicit(o) => slot_for_offset(o, self.num_slots),
                    };
                    emits.push(Emit::Main(NUM_CHARS + slot * 8 + length_header));
                    if length_header == NUM_PRIMARY_LENGTHS {
                        emits.push(Emit::Length(length - MIN_MATCH - NUM_PRIMARY_LENGTHS));
                    }
                    if let MatchOffset::Explicit(o) = offset {
                        let extra = u32::from(EXTRA_BITS[slot]);
                        let value = o + 2 - POSITION_BASE[slot];
                        if aligned && extra >= 3 {
                            if extra > 3 {
                                emits.push(Emit::Raw(value >> 3, extra - 3));
                            }
                            emits.push(Emit::Aligned((value & 7) as usize));
                        } else if extra > 0 {
                            emits.push(Emit::Raw(value, extra));
                        }
                    }
                }
            }
        }
        emits
    }

    /// Pretree-coded update from `prev` to `new`.
    fn write_tree(&mut self, prev: &[u8], new: &[u8]) {
        let delta = |p: u8, n: u8| ((u32::from(p) + 17 - u32::from(n)) % 17) as usize;

        // (pretree symbol, extra bits, inner symbol)
        let mut ops: Vec<(usize, Option<(u32, u32)>, Option<usize>)> = Vec::new();
        let mut i = 0;
        while i < new.len() {
            let run = new[i..].iter().take_while(|&&l| l == new[i]).count();
            if self.use_runs && new[i] == 0 && run >= 20 {
                let take = run.min(51);
                ops.push((18, Some(((take - 20) as u32, 5)), None));
                i += take;
            } else if self.use_runs && new[i] == 0 && run >= 4 {
                let take = run.min(19);
                ops.push((17, Some(((take - 4) as u32, 4)), None));
                i += take;
            } else if self.use_runs && new[i] != 0 && run >= 4 {
                let take = run.min(5);
                ops.push((19, Some(((take - 4) as u32, 1)), Some(delta(prev[i], new[i]))));
                i += take;
            } else {
                ops.push((delta(prev[i], new[i]), None, None));
                i += 1;
            }
        }

        let mut used: Vec<usize> = ops.iter().map(|op| op.0).collect();
        used.extend(ops.iter().filter_map(|op| op.2));
        let pretree_lengths = complete_lengths(PRETREE_NUM_ELEMENTS, &used);
        let codes = canonical_codes(&pretree_lengths);
        for &len in &pretree_lengths {
            self.writer.bits(u32::from(len), 4);
        }
        for (symbol, extra, inner) in ops {
            let (code, len) = codes[symbol];
            self.writer.bits(code, u32::from(len));
            if let Some((value, n)) = extra {
                self.writer.bits(value, n);
            }
            if let Some(inner) = inner {
                let (code, len) = codes[inner];
                self.writer.bits(code, u32::from(len));
            }
        }
    }

    /// Uncompressed block: header, word alignment, three raw repeat offsets,
    /// the bytes, and a pad byte when the length is odd.
    pub fn uncompressed_block(&mut self, repeats: [u32; 3], data: &[u8]) {
        self.uncompressed_header(repeats, data.len());
        self.writer.raw_bytes(data);
        if data.len() % 2 == 1 {
            self.writer.raw_bytes(&[0]);
        }
    }

    /// Header of an uncompressed block whose bytes follow via
    /// [`raw_bytes`](Self::raw_bytes), possibly across chunks.
    pub fn uncompressed_header(&mut self, repeats: [u32; 3], size: usize) {
        self.block_header(3, size);
        self.writer.align_uncompressed();
        for r in repeats {
            self.writer.raw_bytes(&r.to_le_bytes());
        }
    }

    pub fn raw_bytes(&mut self, data: &[u8]) {
        self.writer.raw_bytes(data);
    }

    /// Raw block header, for corrupt-stream tests.
    pub fn raw_header(&mut self, kind: u32, size: usize) {
        self.block_header(kind, size);
    }

    /// Close the current chunk body; tree state carries over to the next.
    pub fn finish_chunk(&mut self) -> Vec<u8> {
        std::mem::replace(&mut self.writer, BitWriter::new()).finish()
    }
}

/// Frame one chunk body. The two-byte header is used when the chunk holds
/// the default 32 KiB and `last` is false.
pub fn frame_chunk(body: &[u8], uncompressed_size: usize, last: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 5);
    if last || uncompressed_size != 0x8000 {
        out.push(0xFF);
        out.extend_from_slice(&(uncompressed_size as u16).to_be_bytes());
    }
    out.extend_from_slice(&(body.len() as u16).to_be_bytes());
    out.extend_from_slice(body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_lengths_satisfy_kraft() {
        for n in 1..40 {
            let used: Vec<usize> = (0..n).map(|i| i * 3).collect();
            let lengths = complete_lengths(130, &used);
            let sum: u32 = lengths
                .iter()
                .filter(|&&l| l > 0)
                .map(|&l| 1u32 << (16 - l))
                .sum();
            assert_eq!(sum, 1 << 16, "n = {}", n);
        }
    }

    #[test]
    fn test_frame_chunk_forms() {
        assert_eq!(frame_chunk(&[1, 2], 0x8000, false), vec![0x00, 0x02, 1, 2]);
        assert_eq!(
            frame_chunk(&[1, 2], 0x10, false),
            vec![0xFF, 0x00, 0x10, 0x00, 0x02, 1, 2]
        );
    }
}
