//! Batch decoding of independent streams.
//!
//! Each stream owns its dictionary, so unrelated streams decode on separate
//! rayon workers with one decoder per worker.

use crate::decompress::{DecoderOptions, Result, XmemDecoder};
use rayon::prelude::*;

/// One compressed stream and the size it expands to.
#[derive(Debug, Clone, Copy)]
pub struct StreamJob<'a> {
    pub input: &'a [u8],
    pub expected_size: usize,
}

impl<'a> StreamJob<'a> {
    pub fn new(input: &'a [u8], expected_size: usize) -> Self {
        Self {
            input,
            expected_size,
        }
    }
}

/// Decode every job in parallel. Results keep the order of `jobs`.
///
/// Fails up front only when `options` is invalid; per-stream failures are
/// reported in the returned vector.
pub fn decompress_streams(
    jobs: &[StreamJob<'_>],
    options: DecoderOptions,
) -> Result<Vec<Result<Vec<u8>>>> {
    options.validate()?;

    let results = jobs
        .par_iter()
        .map_init(
            || XmemDecoder::build(options),
            |decoder, job| {
                decoder.reset();
                decoder.decompress_to_vec(job.input, job.expected_size)
            },
        )
        .collect();
    Ok(results)
}
