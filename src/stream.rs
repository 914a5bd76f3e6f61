use crate::common::DEFLATE64_WINDOW_BITS;
use crate::decompress::{Flush, Inflater, Status};
use crate::error::Error;
use std::io::{self, Read};

const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Reads decompressed bytes out of a raw Deflate64 stream pulled from
/// `inner`.
///
/// Input is read in chunks; bytes past the end of the stream stay in the
/// decoder's buffer and are available through [`Deflate64Decoder::remaining_input`].
pub struct Deflate64Decoder<R: Read> {
    inner: R,
    inflater: Inflater,
    input_buffer: Vec<u8>,
    input_pos: usize,
    input_cap: usize,
    done: bool,
}

impl<R: Read> Deflate64Decoder<R> {
    pub fn new(inner: R) -> io::Result<Self> {
        let inflater = Inflater::new(-(DEFLATE64_WINDOW_BITS as i32)).map_err(|status| {
            Error::from_status(status, None).unwrap_or(Error::Stream("invalid window bits"))
        })?;
        Ok(Self {
            inner,
            inflater,
            input_buffer: vec![0; DEFAULT_BUFFER_SIZE],
            input_pos: 0,
            input_cap: 0,
            done: false,
        })
    }

    /// Sets the size of the compressed-input read chunk.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        let size = size.max(1);
        let pending = self.input_cap - self.input_pos;
        self.input_buffer.copy_within(self.input_pos..self.input_cap, 0);
        self.input_buffer.resize(size.max(pending), 0);
        self.input_pos = 0;
        self.input_cap = pending;
        self
    }

    pub fn total_in(&self) -> u64 {
        self.inflater.total_in()
    }

    pub fn total_out(&self) -> u64 {
        self.inflater.total_out()
    }

    /// Buffered compressed bytes not consumed by the decoder.
    pub fn remaining_input(&self) -> &[u8] {
        &self.input_buffer[self.input_pos..self.input_cap]
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill_input(&mut self) -> io::Result<usize> {
        if self.input_pos > 0 {
            self.input_buffer.copy_within(self.input_pos..self.input_cap, 0);
            self.input_cap -= self.input_pos;
            self.input_pos = 0;
        }
        loop {
            match self.inner.read(&mut self.input_buffer[self.input_cap..]) {
                Ok(n) => {
                    self.input_cap += n;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: Read> Read for Deflate64Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.done || buf.is_empty() {
            return Ok(0);
        }

        loop {
            let input = &self.input_buffer[self.input_pos..self.input_cap];
            let (status, consumed, produced) = self.inflater.inflate(input, buf, Flush::None);
            self.input_pos += consumed;

            match status {
                Status::StreamEnd => {
                    self.done = true;
                    return Ok(produced);
                }
                Status::Ok | Status::BufError => {
                    if produced > 0 {
                        return Ok(produced);
                    }
                }
                _ => {
                    let err = Error::from_status(status, self.inflater.msg())
                        .unwrap_or(Error::Stream("unexpected status"));
                    return Err(err.into());
                }
            }

            // Nothing produced: all buffered input went into the bit
            // accumulator, so more is needed.
            if self.fill_input()? == 0 {
                return Err(Error::Truncated.into());
            }
        }
    }
}
