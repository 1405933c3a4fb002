#![no_main]
use libfuzzer_sys::fuzz_target;
use xmem_lzx::parsing::ChunkHeaderParser;

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = ChunkHeaderParser::parse(data) {
        assert!(header.header_size == 2 || header.header_size == 5);
        assert!(header.total_size() >= header.header_size);
    }
});
