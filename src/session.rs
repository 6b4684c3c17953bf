use crate::interpret::{
    Chunk, ChannelTable, Event, EventDefinition, IndexEntry, RecordingMetadata,
};

/// Everything learned from the chunks read so far that later chunks, or
/// the caller, need. Sample data is never kept here.
#[derive(Debug, Clone, Default)]
pub struct Session {
    metadata: Option<RecordingMetadata>,
    channels: Option<ChannelTable>,
    event_definitions: Option<Vec<EventDefinition>>,
    events: Vec<Event>,
    index: Vec<IndexEntry>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metadata(&self) -> Option<&RecordingMetadata> {
        self.metadata.as_ref()
    }

    pub fn channels(&self) -> Option<&ChannelTable> {
        self.channels.as_ref()
    }

    pub fn event_definitions(&self) -> Option<&[EventDefinition]> {
        self.event_definitions.as_deref()
    }

    /// All events of all event data chunks, in file order
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn index(&self) -> &[IndexEntry] {
        &self.index
    }

    /// Commit a chunk that decoded without error.
    pub(crate) fn apply(&mut self, chunk: &Chunk) {
        match chunk {
            Chunk::Header(metadata) => self.metadata = Some(metadata.clone()),
            Chunk::ChannelInfo(channels) => self.channels = Some(channels.clone()),
            Chunk::EventDefinitions(definitions) => {
                self.event_definitions = Some(definitions.clone())
            }
            Chunk::Events(events) => self.events.extend_from_slice(events),
            Chunk::Index(entries) => self.index.extend_from_slice(entries),
            Chunk::Data(_) => (),
        }
    }
}
