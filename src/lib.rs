//! Streaming decoder for HPF recordings.
//!
//! An HPF file is a sequence of self describing chunks. The header and
//! channel info chunks describe the recording, data chunks carry the
//! samples of every channel. [`Converter`] turns a file into a delimited
//! table while holding at most one chunk in memory, [`Decoder`] gives
//! access to the decoded chunks themselves.

pub mod chunk;
pub mod config;
mod decoder;
pub mod emit;
pub mod error;
pub mod interpret;
pub mod reassemble;
pub mod record;
mod session;
pub mod timestamp;

pub use chunk::{ChunkKind, ChunkReader, RawChunk};
pub use config::Options;
pub use decoder::{Converter, Decoder, Summary};
pub use error::Error;
pub use interpret::Chunk;
pub use session::Session;
