//! Canonical Huffman decode tables.
//!
//! A [`DecodeTable`] is one flat array. The first `1 << table_bits` entries
//! are indexed directly by the next bits of the stream. Codes longer than
//! the table width continue in an overflow binary tree stored further along
//! the same array: a negative entry `-n` points at the node pair
//! `entries[2n]` (next bit 0) and `entries[2n + 1]` (next bit 1).
//! Non-negative entries are symbols.

use super::{DecompressError, Result};

/// Longest code length the format allows.
pub const MAX_CODE_LENGTH: usize = 16;

/// Width of the aligned-offset table.
pub const ALIGNED_TABLE_BITS: u32 = 7;

/// Huffman decode table with an overflow region for long codes.
#[derive(Clone)]
pub struct DecodeTable {
    entries: Vec<i16>,
    table_bits: u32,
    /// First overflow node index
    overflow_base: usize,
}

impl DecodeTable {
    /// Allocate a table for up to `num_symbols` symbols.
    ///
    /// Overflow nodes start at `max(num_symbols, (table_size + 1) / 2)` so
    /// node pairs never land inside the direct region.
    pub fn new(num_symbols: usize, table_bits: u32) -> Self {
        debug_assert!(table_bits as usize <= MAX_CODE_LENGTH);
        let table_size = 1usize << table_bits;
        let overflow_base = num_symbols.max((table_size + 1) / 2);
        Self {
            entries: vec![0; 2 * (overflow_base + num_symbols)],
            table_bits,
            overflow_base,
        }
    }

    /// Width of the direct lookup region.
    #[inline]
    pub fn table_bits(&self) -> u32 {
        self.table_bits
    }

    /// Table over hand-written entries, for exercising corrupt layouts.
    #[cfg(test)]
    pub(crate) fn from_entries(entries: Vec<i16>, table_bits: u32) -> Self {
        let overflow_base = (1usize << table_bits) / 2;
        Self {
            entries,
            table_bits,
            overflow_base,
        }
    }

    /// Raw entries (direct region followed by overflow nodes).
    #[inline]
    pub fn entries(&self) -> &[i16] {
        &self.entries
    }

    /// Rebuild the table from per-symbol code lengths.
    ///
    /// The lengths must form a complete prefix code (Σ 2^(16-len) = 2^16).
    /// An all-zero set is accepted and clears the table; it denotes a tree
    /// the block does not use.
    pub fn build(&mut self, lengths: &[u8]) -> Result<()> {
        let table_bits = self.table_bits as usize;
        let table_size = 1usize << table_bits;
        let node_limit = self.entries.len() / 2;
        if self.overflow_base + lengths.len() > node_limit {
            return Err(DecompressError::InvalidHuffmanTree);
        }

        let mut count = [0u32; MAX_CODE_LENGTH + 1];
        for &len in lengths {
            let len = len as usize;
            if len > MAX_CODE_LENGTH {
                return Err(DecompressError::InvalidHuffmanTree);
            }
            count[len] += 1;
        }

        // First code of each length, as a 16-bit fixed-point fraction
        let mut start = [0u32; MAX_CODE_LENGTH + 2];
        for i in 1..=MAX_CODE_LENGTH {
            start[i + 1] = start[i] + (count[i] << (16 - i));
        }

        if start[MAX_CODE_LENGTH + 1] != 1 << 16 {
            if start[MAX_CODE_LENGTH + 1] == 0 {
                self.entries[..table_size].fill(0);
                return Ok(());
            }
            return Err(DecompressError::InvalidHuffmanTree);
        }

        let jut_bits = 16 - table_bits;
        let mut weight = [0u32; MAX_CODE_LENGTH + 1];
        for i in 1..=table_bits {
            start[i] >>= jut_bits;
            weight[i] = 1 << (table_bits - i);
        }
        for i in table_bits + 1..=MAX_CODE_LENGTH {
            weight[i] = 1 << (16 - i);
        }

        // Direct slots past the short codes are roots of overflow trees
        let direct_end = (start[table_bits + 1] >> jut_bits) as usize;
        if direct_end < table_size {
            self.entries[direct_end..table_size].fill(0);
        }

        let mut avail = self.overflow_base;
        for (symbol, &len) in lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let len = len as usize;
            let next_code = start[len] + weight[len];

            if len <= table_bits {
                if next_code > table_size as u32 {
                    return Err(DecompressError::InvalidHuffmanTree);
                }
                self.entries[start[len] as usize..next_code as usize].fill(symbol as i16);
                start[len] = next_code;
                continue;
            }

            let mut code = start[len];
            start[len] = next_code;
            let mut slot = (code >> jut_bits) as usize;
            code <<= table_bits;

            for _ in 0..len - table_bits {
                if self.entries[slot] == 0 {
                    if avail >= node_limit {
                        return Err(DecompressError::InvalidHuffmanTree);
                    }
                    self.entries[2 * avail] = 0;
                    self.entries[2 * avail + 1] = 0;
                    self.entries[slot] = -(avail as i16);
                    avail += 1;
                } else if self.entries[slot] > 0 {
                    // A shorter code already ends here
                    return Err(DecompressError::InvalidHuffmanTree);
                }
                let node = (-self.entries[slot]) as usize;
                slot = 2 * node + ((code >> 15) & 1) as usize;
                code <<= 1;
            }
            self.entries[slot] = symbol as i16;
        }

        Ok(())
    }
}

/// Build the 7-bit table for the 8-symbol aligned-offset tree.
///
/// Aligned lengths are 3-bit values, so every code fits the direct table.
pub fn build_aligned_table(lengths: &[u8; 8], table: &mut [u8; 128]) -> Result<()> {
    let mut count = [0u32; MAX_CODE_LENGTH + 1];
    for &len in lengths {
        if len as u32 > ALIGNED_TABLE_BITS {
            return Err(DecompressError::InvalidHuffmanTree);
        }
        count[len as usize] += 1;
    }

    let mut start = [0u32; MAX_CODE_LENGTH + 2];
    for i in 1..=MAX_CODE_LENGTH {
        start[i + 1] = start[i] + (count[i] << (16 - i));
    }
    match start[MAX_CODE_LENGTH + 1] {
        0 => {
            table.fill(0);
            return Ok(());
        }
        0x10000 => {}
        _ => return Err(DecompressError::InvalidHuffmanTree),
    }

    let bits = ALIGNED_TABLE_BITS as usize;
    let mut weight = [0u32; MAX_CODE_LENGTH + 1];
    for i in 1..=bits {
        start[i] >>= 16 - bits;
        weight[i] = 1 << (bits - i);
    }

    for (symbol, &len) in lengths.iter().enumerate() {
        if len == 0 {
            continue;
        }
        let len = len as usize;
        let next_code = start[len] + weight[len];
        if next_code > 1 << bits {
            return Err(DecompressError::InvalidHuffmanTree);
        }
        table[start[len] as usize..next_code as usize].fill(symbol as u8);
        start[len] = next_code;
    }

    Ok(())
}
