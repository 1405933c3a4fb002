//! Per-block Huffman trees and their pretree-coded updates.
//!
//! Each verbatim or aligned block transmits its main and length trees as
//! differences from the previous block's code lengths. The differences are
//! themselves Huffman coded with a 20-symbol pretree:
//!
//! | Symbol | Meaning |
//! |--------|---------|
//! | 0-16 | new length = (previous - symbol) mod 17 |
//! | 17 | 4 bits + 4 zero lengths |
//! | 18 | 5 bits + 20 zero lengths |
//! | 19 | 1 bit + 4 copies of one delta-coded length |

use super::bit_reader::BitReader;
use super::huffman::{build_aligned_table, DecodeTable};
use super::{
    DecompressError, Result, ALIGNED_NUM_ELEMENTS, NUM_CHARS, NUM_SECONDARY_LENGTHS,
    PRETREE_NUM_ELEMENTS,
};

/// Direct lookup width for the main tree.
pub const MAIN_TABLE_BITS: u32 = 10;

/// Direct lookup width for the length tree.
pub const LENGTH_TABLE_BITS: u32 = 8;

/// Direct lookup width for the pretree.
pub const PRETREE_TABLE_BITS: u32 = 8;

/// Huffman state carried from block to block.
pub struct LzxTrees {
    pub main_lengths: Vec<u8>,
    prev_main_lengths: Vec<u8>,
    pub main_table: DecodeTable,

    pub length_lengths: [u8; NUM_SECONDARY_LENGTHS],
    prev_length_lengths: [u8; NUM_SECONDARY_LENGTHS],
    pub length_table: DecodeTable,

    pub aligned_lengths: [u8; ALIGNED_NUM_ELEMENTS],
    pub aligned_table: [u8; 128],

    pretree_lengths: [u8; PRETREE_NUM_ELEMENTS],
    pretree: DecodeTable,
}

impl LzxTrees {
    /// Trees for a main alphabet of `256 + 8 * num_position_slots` symbols.
    pub fn new(num_position_slots: usize) -> Self {
        let main_elements = NUM_CHARS + 8 * num_position_slots;
        Self {
            main_lengths: vec![0; main_elements],
            prev_main_lengths: vec![0; main_elements],
            main_table: DecodeTable::new(main_elements, MAIN_TABLE_BITS),
            length_lengths: [0; NUM_SECONDARY_LENGTHS],
            prev_length_lengths: [0; NUM_SECONDARY_LENGTHS],
            length_table: DecodeTable::new(NUM_SECONDARY_LENGTHS, LENGTH_TABLE_BITS),
            aligned_lengths: [0; ALIGNED_NUM_ELEMENTS],
            aligned_table: [0; 128],
            pretree_lengths: [0; PRETREE_NUM_ELEMENTS],
            pretree: DecodeTable::new(PRETREE_NUM_ELEMENTS, PRETREE_TABLE_BITS),
        }
    }

    /// Forget all lengths; the next block codes its trees against zeros.
    pub fn reset(&mut self) {
        self.main_lengths.fill(0);
        self.prev_main_lengths.fill(0);
        self.length_lengths.fill(0);
        self.prev_length_lengths.fill(0);
        self.aligned_lengths.fill(0);
        self.aligned_table.fill(0);
    }

    /// Read the eight 3-bit aligned-offset lengths and build their table.
    pub fn read_aligned(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        for len in &mut self.aligned_lengths {
            *len = reader.read_bits(3) as u8;
        }
        reader.status()?;
        build_aligned_table(&self.aligned_lengths, &mut self.aligned_table)
    }

    /// Read the main tree (literals, then match symbols, each section with
    /// its own pretree) and the length tree, then rebuild both tables.
    pub fn read_main_and_length(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        self.prev_main_lengths.copy_from_slice(&self.main_lengths);
        self.prev_length_lengths = self.length_lengths;

        read_delta_lengths(
            reader,
            &mut self.pretree,
            &mut self.pretree_lengths,
            &self.prev_main_lengths[..NUM_CHARS],
            &mut self.main_lengths[..NUM_CHARS],
        )?;
        read_delta_lengths(
            reader,
            &mut self.pretree,
            &mut self.pretree_lengths,
            &self.prev_main_lengths[NUM_CHARS..],
            &mut self.main_lengths[NUM_CHARS..],
        )?;
        self.main_table.build(&self.main_lengths)?;

        read_delta_lengths(
            reader,
            &mut self.pretree,
            &mut self.pretree_lengths,
            &self.prev_length_lengths,
            &mut self.length_lengths,
        )?;
        self.length_table.build(&self.length_lengths)?;
        Ok(())
    }
}

#[inline]
fn apply_delta(prev: u8, symbol: usize) -> Result<u8> {
    let mut value = i32::from(prev) - symbol as i32;
    if value < 0 {
        value += 17;
    }
    if !(0..=16).contains(&value) {
        return Err(DecompressError::InvalidCodeLength(value as u8));
    }
    Ok(value as u8)
}

/// Decode one pretree-coded section of code lengths into `out`.
fn read_delta_lengths(
    reader: &mut BitReader<'_>,
    pretree: &mut DecodeTable,
    pretree_lengths: &mut [u8; PRETREE_NUM_ELEMENTS],
    prev: &[u8],
    out: &mut [u8],
) -> Result<()> {
    for len in pretree_lengths.iter_mut() {
        *len = reader.read_bits(4) as u8;
    }
    reader.status()?;
    pretree.build(&pretree_lengths[..])?;

    let count = out.len();
    let mut i = 0;
    while i < count {
        let symbol = reader.decode_symbol(pretree, &pretree_lengths[..])?;
        match symbol {
            17 => {
                let run = (reader.read_bits(4) as usize + 4).min(count - i);
                out[i..i + run].fill(0);
                i += run;
            }
            18 => {
                let run = (reader.read_bits(5) as usize + 20).min(count - i);
                out[i..i + run].fill(0);
                i += run;
            }
            19 => {
                let run = (reader.read_bits(1) as usize + 4).min(count - i);
                let delta = reader.decode_symbol(pretree, &pretree_lengths[..])?;
                let value = apply_delta(prev[i], delta)?;
                out[i..i + run].fill(value);
                i += run;
            }
            _ => {
                out[i] = apply_delta(prev[i], symbol)?;
                i += 1;
            }
        }
        reader.status()?;
    }
    Ok(())
}
