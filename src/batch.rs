use crate::api::Decompressor;
use rayon::prelude::*;
use std::io;

/// Decodes many independent raw Deflate64 streams in parallel. Each rayon
/// worker owns one decoder; a single stream is never shared across threads.
pub struct BatchDecompressor;

impl Default for BatchDecompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchDecompressor {
    pub fn new() -> Self {
        Self
    }

    /// Decodes `inputs[i]` into a buffer of at most `max_out_sizes[i]`
    /// bytes. A stream that fails, or does not fit, yields `None`.
    pub fn decompress_batch(
        &self,
        inputs: &[&[u8]],
        max_out_sizes: &[usize],
    ) -> Vec<Option<Vec<u8>>> {
        self.try_decompress_batch(inputs, max_out_sizes)
            .into_iter()
            .map(Result::ok)
            .collect()
    }

    /// Like [`BatchDecompressor::decompress_batch`], keeping the error of
    /// each failed stream.
    pub fn try_decompress_batch(
        &self,
        inputs: &[&[u8]],
        max_out_sizes: &[usize],
    ) -> Vec<io::Result<Vec<u8>>> {
        inputs
            .par_iter()
            .zip(max_out_sizes.par_iter())
            .map_init(Decompressor::new, |decompressor, (&input, &max_size)| {
                match decompressor {
                    Ok(decompressor) => decompressor.decompress_deflate64(input, max_size),
                    Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
                }
            })
            .collect()
    }
}
