use std::io;

use crate::chunk::{ChunkKind, ReadError};
use crate::interpret;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Read(#[from] ReadError),
    #[error("Invalid {kind} chunk at byte {offset}: {error}")]
    Chunk {
        kind: ChunkKind,
        offset: u64,
        error: interpret::Error,
    },
    #[error("Could not write table: {0}")]
    Output(#[from] io::Error),
    #[error("Decoding stopped at the fatal error at byte {offset}")]
    AfterFatal { offset: u64 },
}
