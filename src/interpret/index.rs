use tracing::{debug, instrument};

use crate::chunk::fields::{self, Fields};
use crate::chunk::ChunkKind;

const ENTRY_COUNT: usize = 16;
const ENTRIES: usize = 24;
const ENTRY_SIZE: usize = 5 * 8;

/// Where a data chunk lives in the file. Not used to seek yet, a
/// conversion always walks every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub data_start_index: i64,
    pub samples_per_channel: i64,
    /// kind tag of the chunk pointed to, normally that of a data chunk
    pub chunk_tag: i64,
    pub group_id: i64,
    pub file_offset: i64,
}

impl IndexEntry {
    pub fn chunk_kind(&self) -> Option<ChunkKind> {
        u64::try_from(self.chunk_tag)
            .ok()
            .and_then(ChunkKind::from_tag)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Field(#[from] fields::Error),
}

#[instrument(level = "debug", skip(fields))]
pub(crate) fn decode(fields: Fields<'_>) -> Result<Vec<IndexEntry>, Error> {
    let count = fields.size_from_i64(ENTRY_COUNT, "index entry count")?;
    let entries = fields
        .records(ENTRIES, count, ENTRY_SIZE)?
        .map(|entry| -> Result<_, fields::Error> {
            Ok(IndexEntry {
                data_start_index: entry.i64_at(0)?,
                samples_per_channel: entry.i64_at(8)?,
                chunk_tag: entry.i64_at(16)?,
                group_id: entry.i64_at(24)?,
                file_offset: entry.i64_at(32)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    debug!("read {} index entries", entries.len());
    Ok(entries)
}
