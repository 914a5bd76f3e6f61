#![forbid(unsafe_code)]
pub mod api;
pub mod batch;
pub mod common;
pub mod decompress;
pub mod error;
pub mod stream;

pub use api::{decompress_deflate64, Decompressor, Session};
pub use batch::BatchDecompressor;
pub use decompress::{Flush, HeaderMode, Inflater, Mode, Status};
pub use error::{Error, Result};
pub use stream::Deflate64Decoder;
