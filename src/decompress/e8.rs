//! Intel E8 call translation.
//!
//! The compressor rewrites the 32-bit operand of every x86 `CALL rel32`
//! (opcode `0xE8`) from relative to absolute so repeated calls to one target
//! compress better. This undoes it on each decompressed chunk.

/// Bytes at the end of a chunk that are never scanned for an opcode.
const SCAN_MARGIN: usize = 10;

/// Running E8 translation state for one stream.
#[derive(Debug, Clone, Default)]
pub struct IntelTranslator {
    file_size: u32,
    /// Stream offset of the next chunk's first byte
    position: u32,
}

impl IntelTranslator {
    pub fn new(file_size: u32) -> Self {
        Self {
            file_size,
            position: 0,
        }
    }

    /// Translation file size announced by the stream; 0 disables fixups.
    pub fn file_size(&self) -> u32 {
        self.file_size
    }

    pub fn set_file_size(&mut self, file_size: u32) {
        self.file_size = file_size;
    }

    pub fn is_active(&self) -> bool {
        self.file_size != 0
    }

    /// Translate one chunk in place and advance the stream position.
    pub fn translate(&mut self, data: &mut [u8]) {
        let len = data.len();
        if len > SCAN_MARGIN {
            let end = len - SCAN_MARGIN;
            let mut i = 0;
            while i < end {
                if data[i] != 0xE8 {
                    i += 1;
                    continue;
                }
                let cur = self.position.wrapping_add(i as u32);
                let operand = &mut data[i + 1..i + 5];
                let abs = u32::from_le_bytes([operand[0], operand[1], operand[2], operand[3]]);
                if abs < self.file_size {
                    operand.copy_from_slice(&abs.wrapping_sub(cur).to_le_bytes());
                } else if abs.wrapping_neg() <= cur {
                    operand.copy_from_slice(&abs.wrapping_add(self.file_size).to_le_bytes());
                }
                i += 5;
            }
        }
        self.position = self.position.wrapping_add(len as u32);
    }
}
