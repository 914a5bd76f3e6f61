use crate::common::{DEFLATE64_WINDOW_BITS, DEFLATE64_WINDOW_SIZE};
use crate::decompress::{Flush, HeaderMode, Inflater, Status};
use crate::error::Error;
use std::io;

enum SessionState {
    Uninitialized,
    Active(Box<Inflater>),
    Ended,
}

/// Resumable decoding session over caller-owned buffers.
///
/// Lifecycle: [`Session::new`], then [`Session::init`], any number of
/// [`Session::process`] calls, and finally [`Session::end`]. Calls made out
/// of order return [`Status::StreamError`] and leave the session untouched.
pub struct Session {
    state: SessionState,
    last_consumed: usize,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Uninitialized,
            last_consumed: 0,
        }
    }

    /// `window_bits` is `-16` for a raw stream or `16` for a wrapped one;
    /// Deflate64 accepts no other window size. The window itself is only
    /// allocated once output is produced.
    pub fn init(&mut self, window_bits: i32) -> Status {
        if matches!(self.state, SessionState::Active(_)) {
            return Status::StreamError;
        }
        if window_bits.unsigned_abs() != DEFLATE64_WINDOW_BITS {
            return Status::StreamError;
        }
        match Inflater::new(window_bits) {
            Ok(inflater) => {
                self.state = SessionState::Active(Box::new(inflater));
                self.last_consumed = 0;
                Status::Ok
            }
            Err(status) => status,
        }
    }

    /// Decodes as much as the buffers allow. Returns the number of bytes
    /// written to `output`; [`Session::bytes_consumed`] tells how much of
    /// `input` was used.
    pub fn process(&mut self, input: &[u8], output: &mut [u8], flush: Flush) -> (usize, Status) {
        self.last_consumed = 0;
        let SessionState::Active(inflater) = &mut self.state else {
            return (0, Status::StreamError);
        };
        let (status, consumed, produced) = inflater.inflate(input, output, flush);
        self.last_consumed = consumed;
        (produced, status)
    }

    /// Like [`Session::process`], taking the flush mode as its numeric code.
    pub fn process_with_code(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush_code: i32,
    ) -> (usize, Status) {
        match Flush::try_from(flush_code) {
            Ok(flush) => self.process(input, output, flush),
            Err(_) => {
                self.last_consumed = 0;
                (0, Status::StreamError)
            }
        }
    }

    /// Input bytes consumed by the most recent `process` call.
    pub fn bytes_consumed(&self) -> usize {
        self.last_consumed
    }

    /// Restarts the stream, possibly with a different window size.
    pub fn reset(&mut self, window_bits: i32) -> Status {
        let SessionState::Active(inflater) = &mut self.state else {
            return Status::StreamError;
        };
        if window_bits.unsigned_abs() != DEFLATE64_WINDOW_BITS {
            return Status::StreamError;
        }
        self.last_consumed = 0;
        inflater.reset2(window_bits)
    }

    /// Releases the window and table memory. The session can be initialized
    /// again afterwards.
    pub fn end(&mut self) -> Status {
        match std::mem::replace(&mut self.state, SessionState::Ended) {
            SessionState::Active(inflater) => {
                log::debug!(
                    "inflate64: session ended after {} in, {} out",
                    inflater.total_in(),
                    inflater.total_out()
                );
                Status::Ok
            }
            other => {
                self.state = other;
                Status::StreamError
            }
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active(_))
    }

    fn inflater(&self) -> Option<&Inflater> {
        match &self.state {
            SessionState::Active(inflater) => Some(inflater),
            _ => None,
        }
    }

    pub fn msg(&self) -> Option<&'static str> {
        self.inflater().and_then(Inflater::msg)
    }

    pub fn total_in(&self) -> u64 {
        self.inflater().map_or(0, Inflater::total_in)
    }

    pub fn total_out(&self) -> u64 {
        self.inflater().map_or(0, Inflater::total_out)
    }

    pub fn data_type(&self) -> Option<u32> {
        self.inflater().map(Inflater::data_type)
    }

    pub fn header_mode(&self) -> Option<HeaderMode> {
        self.inflater().map(Inflater::header_mode)
    }
}

fn init_error(status: Status) -> Error {
    match status {
        Status::MemError => Error::Memory,
        _ => Error::Stream("invalid window bits"),
    }
}

fn finish_error(inflater: &Inflater, status: Status, output_full: bool) -> Error {
    match status {
        Status::BufError if output_full => Error::OutputTooSmall,
        Status::BufError => Error::Truncated,
        _ => Error::from_status(status, inflater.msg()).unwrap_or(Error::Stream("unexpected status")),
    }
}

/// One-shot decoder for whole raw Deflate64 streams.
pub struct Decompressor {
    inner: Inflater,
}

impl Decompressor {
    pub fn new() -> io::Result<Self> {
        let inner = Inflater::new(-(DEFLATE64_WINDOW_BITS as i32)).map_err(init_error)?;
        Ok(Self { inner })
    }

    pub fn decompress_deflate64(
        &mut self,
        data: &[u8],
        expected_size: usize,
    ) -> io::Result<Vec<u8>> {
        let mut output = vec![0u8; expected_size];
        let size = self.decompress_deflate64_into(data, &mut output)?;
        output.truncate(size);
        Ok(output)
    }

    /// Decodes a complete stream into `output`, returning the decoded size.
    /// Bytes after the final block are ignored.
    pub fn decompress_deflate64_into(&mut self, data: &[u8], output: &mut [u8]) -> io::Result<usize> {
        self.inner.reset();
        let (status, _, produced) = self.inner.inflate(data, output, Flush::Finish);
        if status == Status::StreamEnd {
            Ok(produced)
        } else {
            Err(finish_error(&self.inner, status, produced == output.len()).into())
        }
    }

    /// Input bytes the last call consumed up to the end of the stream.
    pub fn total_in(&self) -> u64 {
        self.inner.total_in()
    }
}

/// Decodes a complete raw Deflate64 stream of unknown decoded size.
pub fn decompress_deflate64(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut inflater = Inflater::new(-(DEFLATE64_WINDOW_BITS as i32)).map_err(init_error)?;
    let mut out = Vec::with_capacity(data.len().saturating_mul(2));
    let mut chunk = vec![0u8; DEFLATE64_WINDOW_SIZE];
    let mut pos = 0;
    loop {
        let (status, consumed, produced) = inflater.inflate(&data[pos..], &mut chunk, Flush::None);
        pos += consumed;
        out.extend_from_slice(&chunk[..produced]);
        match status {
            Status::StreamEnd => return Ok(out),
            Status::Ok => {}
            _ => return Err(finish_error(&inflater, status, false).into()),
        }
    }
}
