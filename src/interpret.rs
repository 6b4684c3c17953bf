//! One interpreter per chunk kind. Interpreters only read the session,
//! the [`Decoder`](crate::Decoder) applies their result once the whole
//! chunk decoded without error.

pub mod channel_info;
pub mod data;
pub mod event_data;
pub mod event_definition;
pub mod header;
pub mod index;

use tracing::instrument;

use crate::chunk::{ChunkKind, RawChunk};
use crate::session::Session;

pub use channel_info::{ChannelDescriptor, ChannelTable, ChannelType, DataType};
pub use data::DataChunk;
pub use event_data::Event;
pub use event_definition::EventDefinition;
pub use header::RecordingMetadata;
pub use index::IndexEntry;

/// A decoded chunk, one variant per [`ChunkKind`]
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    Header(RecordingMetadata),
    ChannelInfo(ChannelTable),
    Data(DataChunk),
    EventDefinitions(Vec<EventDefinition>),
    Events(Vec<Event>),
    Index(Vec<IndexEntry>),
}

impl Chunk {
    pub fn kind(&self) -> ChunkKind {
        match self {
            Chunk::Header(_) => ChunkKind::Header,
            Chunk::ChannelInfo(_) => ChunkKind::ChannelInfo,
            Chunk::Data(_) => ChunkKind::Data,
            Chunk::EventDefinitions(_) => ChunkKind::EventDefinition,
            Chunk::Events(_) => ChunkKind::EventData,
            Chunk::Index(_) => ChunkKind::Index,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Header(#[from] header::Error),
    #[error("{0}")]
    ChannelInfo(#[from] channel_info::Error),
    #[error("{0}")]
    Data(#[from] data::Error),
    #[error("{0}")]
    EventDefinition(#[from] event_definition::Error),
    #[error("{0}")]
    EventData(#[from] event_data::Error),
    #[error("{0}")]
    Index(#[from] index::Error),
    #[error("A file may contain only one {0} chunk, found a second")]
    UnexpectedDuplicateChunk(ChunkKind),
}

#[instrument(level = "debug", skip_all, fields(kind = %raw.kind, offset = raw.offset))]
pub fn interpret(raw: &RawChunk<'_>, session: &Session) -> Result<Chunk, Error> {
    let fields = raw.fields();
    let duplicate = Error::UnexpectedDuplicateChunk(raw.kind);
    Ok(match raw.kind {
        ChunkKind::Header if session.metadata().is_some() => return Err(duplicate),
        ChunkKind::ChannelInfo if session.channels().is_some() => return Err(duplicate),
        ChunkKind::EventDefinition if session.event_definitions().is_some() => {
            return Err(duplicate)
        }
        ChunkKind::Header => Chunk::Header(header::decode(fields)?),
        ChunkKind::ChannelInfo => Chunk::ChannelInfo(channel_info::decode(fields)?),
        ChunkKind::Data => Chunk::Data(data::decode(fields, session)?),
        ChunkKind::EventDefinition => {
            Chunk::EventDefinitions(event_definition::decode(fields)?)
        }
        ChunkKind::EventData => Chunk::Events(event_data::decode(fields)?),
        ChunkKind::Index => Chunk::Index(index::decode(fields)?),
    })
}
