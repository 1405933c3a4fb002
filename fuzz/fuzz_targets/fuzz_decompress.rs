#![no_main]
use libfuzzer_sys::fuzz_target;
use xmem_lzx::{DecoderOptions, XmemDecoder};

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    // First byte picks the window (32 KiB << 0..=6), next two the output size
    let window = 0x8000u32 << (data[0] % 7);
    let expected = u16::from_le_bytes([data[1], data[2]]) as usize * 4;
    let compressed = &data[3..];

    let options = DecoderOptions::default().with_window_size(window);
    let Ok(mut decoder) = XmemDecoder::with_options(options) else {
        return;
    };
    if let Ok(out) = decoder.decompress_to_vec(compressed, expected) {
        assert_eq!(out.len(), expected);
    }
});
