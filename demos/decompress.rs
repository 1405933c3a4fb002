//! Decode an XMemCompress stream out of a file.
//!
//! Usage:
//!   cargo run --release --example decompress -- <input> <output> <size> [window] [start end]
//!
//! `size` is the uncompressed size, `window` the dictionary size (default
//! 0x20000), and `start`/`end` an inclusive byte range holding the stream.
//! Numbers accept a `0x` prefix. Set `XMEM_VERBOSE=1` for per-chunk logs.

use std::time::Instant;
use xmem_lzx::{DecoderOptions, LocalFileMedia, ReadInterval, XmemDecoder};

fn parse_number(s: &str) -> Result<u64, std::num::ParseIntError> {
    match s.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let level = if std::env::var_os("XMEM_VERBOSE").is_some() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: decompress <input> <output> <size> [window] [start end]");
        eprintln!("  decompress ./texture.xmem ./texture.bin 0x40000");
        std::process::exit(1);
    }

    let size = parse_number(&args[3])? as usize;
    let window = match args.get(4) {
        Some(w) => parse_number(w)? as u32,
        None => DecoderOptions::default().window_size,
    };

    let media = LocalFileMedia::new(&args[1])?;
    let interval = match (args.get(5), args.get(6)) {
        (Some(start), Some(end)) => ReadInterval {
            start: parse_number(start)?,
            end: parse_number(end)?,
        },
        _ => ReadInterval {
            start: 0,
            end: media.length().saturating_sub(1),
        },
    };

    let options = DecoderOptions::default().with_window_size(window);
    let mut decoder = XmemDecoder::with_options(options)?;

    let start = Instant::now();
    let output = media.decompress_range(interval, size, &mut decoder)?;
    let elapsed = start.elapsed();

    std::fs::write(&args[2], &output)?;
    println!(
        "{}: {} -> {} bytes in {:.2?} ({:.1} MB/s)",
        media.name(),
        interval.size().unwrap_or(0),
        output.len(),
        elapsed,
        output.len() as f64 / 1024.0 / 1024.0 / elapsed.as_secs_f64()
    );

    Ok(())
}
