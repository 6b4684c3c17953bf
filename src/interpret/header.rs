use tracing::instrument;

use crate::chunk::fields::{self, Fields};
use crate::record;
use crate::timestamp::{self, RecordingTime};

const CREATOR_ID: usize = 16;
const FILE_VERSION: usize = 20;
const INDEX_CHUNK_OFFSET: usize = 28;
const RECORD: usize = 36;
pub(crate) const ROOT: &str = "RecordingDate";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingMetadata {
    /// FourCC of the program that wrote the file, usually `datx`
    pub creator_id: [u8; 4],
    pub file_version: i64,
    /// absolute offset of the first index chunk
    pub index_chunk_offset: i64,
    pub recording_start: RecordingTime,
}

impl RecordingMetadata {
    pub fn creator(&self) -> String {
        String::from_utf8_lossy(&self.creator_id).into_owned()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Field(#[from] fields::Error),
    #[error("{0}")]
    Record(#[from] record::Error),
    #[error("Invalid recording date: {0}")]
    RecordingDate(#[from] timestamp::Error),
}

#[instrument(level = "debug", skip(fields), ret)]
pub(crate) fn decode(fields: Fields<'_>) -> Result<RecordingMetadata, Error> {
    let creator_id = fields.array(CREATOR_ID)?;
    let file_version = fields.i64_at(FILE_VERSION)?;
    let index_chunk_offset = fields.i64_at(INDEX_CHUNK_OFFSET)?;

    let root = record::parse(fields.text_from(RECORD)?, ROOT)?;
    let recording_start = RecordingTime::parse(&record::text(&root))?;

    Ok(RecordingMetadata {
        creator_id,
        file_version,
        index_chunk_offset,
        recording_start,
    })
}
