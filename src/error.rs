//! Error type for Deflate64 decoding.

use std::io;

use crate::decompress::Status;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Malformed compressed data. The decoder stays failed until reset.
    #[error("invalid deflate64 data: {0}")]
    Data(&'static str),

    /// The session was used in a way it does not support.
    #[error("stream error: {0}")]
    Stream(&'static str),

    #[error("out of memory")]
    Memory,

    /// No progress was possible with the buffers given.
    #[error("no progress possible")]
    Buffer,

    #[error("preset dictionary required")]
    NeedDict,

    /// Input ended before the final block did.
    #[error("compressed stream truncated")]
    Truncated,

    /// The output buffer filled before the stream ended.
    #[error("output buffer too small")]
    OutputTooSmall,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Maps a failing status to an error. `Ok` and `StreamEnd` give `None`.
    pub fn from_status(status: Status, msg: Option<&'static str>) -> Option<Self> {
        match status {
            Status::Ok | Status::StreamEnd => None,
            Status::NeedDict => Some(Error::NeedDict),
            Status::DataError => Some(Error::Data(msg.unwrap_or("invalid data"))),
            Status::StreamError => Some(Error::Stream(msg.unwrap_or("inconsistent stream state"))),
            Status::MemError => Some(Error::Memory),
            Status::BufError => Some(Error::Buffer),
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match err {
            Error::Data(_) | Error::NeedDict => io::ErrorKind::InvalidData,
            Error::Stream(_) => io::ErrorKind::InvalidInput,
            Error::Memory => io::ErrorKind::OutOfMemory,
            Error::Truncated => io::ErrorKind::UnexpectedEof,
            Error::Buffer | Error::OutputTooSmall => io::ErrorKind::WriteZero,
        };
        io::Error::new(kind, err)
    }
}
