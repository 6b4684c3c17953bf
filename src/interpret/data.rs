use tracing::{debug, instrument};

use crate::chunk::fields::{self, Fields};
use crate::reassemble::{self, ChannelSlice, Samples};
use crate::session::Session;

const GROUP_ID: usize = 16;
const DATA_START_INDEX: usize = 20;
const DESCRIPTOR_COUNT: usize = 28;
const DESCRIPTORS: usize = 32;
/// offset i32 followed by length i32
const DESCRIPTOR_SIZE: usize = 8;

/// The samples one data chunk carries, already split per channel. The
/// chunk buffer itself is not kept.
#[derive(Debug, Clone, PartialEq)]
pub struct DataChunk {
    pub group_id: i32,
    /// index of the first sample in this chunk, as the instrument counts
    pub data_start_index: i64,
    pub layout: Vec<ChannelSlice>,
    pub samples: Vec<Samples>,
}

impl DataChunk {
    /// Samples per channel, the number of rows this chunk contributes
    /// before downsampling.
    pub fn sample_count(&self) -> usize {
        self.samples.first().map(Samples::len).unwrap_or(0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Data chunk before any channel info chunk")]
    ChannelInfoMissing,
    #[error("Data chunk belongs to channel group {found}, channel info declared group {expected}")]
    GroupMismatch { expected: i32, found: i32 },
    #[error("Data chunk describes {found} channels, channel info declared {expected}")]
    ChannelCountMismatch { expected: usize, found: usize },
    #[error("{0}")]
    Field(#[from] fields::Error),
    #[error("{0}")]
    Reassemble(#[from] reassemble::Error),
}

#[instrument(level = "debug", skip_all)]
pub(crate) fn decode(fields: Fields<'_>, session: &Session) -> Result<DataChunk, Error> {
    let channels = session.channels().ok_or(Error::ChannelInfoMissing)?;

    let group_id = fields.i32_at(GROUP_ID)?;
    if group_id != channels.group_id {
        return Err(Error::GroupMismatch {
            expected: channels.group_id,
            found: group_id,
        });
    }

    let count = fields.size_from_i32(DESCRIPTOR_COUNT, "channel descriptor count")?;
    if count != channels.len() {
        return Err(Error::ChannelCountMismatch {
            expected: channels.len(),
            found: count,
        });
    }

    let data_start_index = fields.i64_at(DATA_START_INDEX)?;
    let layout = fields
        .records(DESCRIPTORS, count, DESCRIPTOR_SIZE)?
        .map(|descriptor| -> Result<_, fields::Error> {
            Ok(ChannelSlice {
                offset: descriptor.size_from_i32(0, "channel data offset")?,
                length: descriptor.size_from_i32(4, "channel data length")?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let samples = reassemble::reassemble(fields, &layout, channels)?;
    let chunk = DataChunk {
        group_id,
        data_start_index,
        layout,
        samples,
    };
    debug!(
        "data chunk starting at sample {data_start_index} holds {} samples per channel",
        chunk.sample_count()
    );
    Ok(chunk)
}
