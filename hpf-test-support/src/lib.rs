//! Writes synthetic HPF recordings for tests.

use std::io;
use std::path::Path;

use hpf::chunk::ChunkKind;
use hpf::interpret::{Event, IndexEntry};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro128StarStar;

/// One descriptive record, written as `<tag><Field>value</Field>...</tag>`
#[derive(Debug, Clone)]
pub struct XmlRecord {
    tag: &'static str,
    fields: Vec<(String, String)>,
}

impl XmlRecord {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            fields: Vec::new(),
        }
    }

    /// Replaces the field if it is already present
    pub fn field(mut self, name: &str, value: impl ToString) -> Self {
        let value = value.to_string();
        match self.fields.iter_mut().find(|(field, _)| field == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name.to_owned(), value)),
        }
        self
    }

    pub fn without(mut self, name: &str) -> Self {
        self.fields.retain(|(field, _)| field != name);
        self
    }

    pub fn to_xml(&self) -> String {
        let mut xml = format!("<{}>", self.tag);
        for (name, value) in &self.fields {
            xml.push_str(&format!("<{name}>{value}</{name}>"));
        }
        xml.push_str(&format!("</{}>", self.tag));
        xml
    }
}

/// An Int16 channel as the instrument describes it
pub fn int16_channel(name: &str, index: u32, scale: f64, offset: f64) -> XmlRecord {
    XmlRecord::new("ChannelInformation")
        .field("Name", name)
        .field("Unit", "V")
        .field("ChannelType", "RandomDataChannel")
        .field("AssignedTimeChannelIndex", 0)
        .field("DataType", "Int16")
        .field("DataIndex", index)
        .field("StartTime", "2021-03-04T05:06:07.000000")
        .field("TimeIncrement", 0.001)
        .field("RangeMin", -10)
        .field("RangeMax", 10)
        .field("DataScale", scale)
        .field("DataOffset", offset)
        .field("SensorScale", 1)
        .field("SensorOffset", 0)
        .field("PerChannelSampleRate", 1000)
        .field("PhysicalChannelNumber", index + 1)
        .field("UsesSensorValues", "False")
        .field("ThermocoupleType", "")
        .field("TemperatureUnit", "")
        .field("UseThermocoupleValues", "False")
}

/// A point event definition of the instrument class
pub fn point_event(name: &str, id: i32) -> XmlRecord {
    XmlRecord::new("EventDefinition")
        .field("Name", name)
        .field("Description", format!("{name} event"))
        .field("Class", 1)
        .field("ID", id)
        .field("Type", "Point")
        .field("UsesIData1", "True")
        .field("DescriptionIData1", "channel")
        .field("UsesIData2", "False")
        .field("UsesDData1", "True")
        .field("DescriptionDData1", "level")
        .field("UsesParameter1", "True")
        .field("Parameter1", "5.0")
        .field("DescriptionParameter1", "threshold")
}

fn document(root: &str, records: &[XmlRecord]) -> String {
    let body: String = records.iter().map(XmlRecord::to_xml).collect();
    format!("<{root}>{body}</{root}>")
}

#[derive(Debug, Default, Clone)]
pub struct HpfBuilder {
    bytes: Vec<u8>,
}

impl HpfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A chunk with a correct prefix, `payload` follows the prefix
    pub fn raw_chunk(mut self, tag: u64, payload: &[u8]) -> Self {
        let len = 16 + payload.len() as u64;
        self.bytes.extend_from_slice(&tag.to_le_bytes());
        self.bytes.extend_from_slice(&len.to_le_bytes());
        self.bytes.extend_from_slice(payload);
        self
    }

    /// Raw bytes with no structure at all
    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Header without an index chunk
    pub fn header(self, creator: &[u8; 4], version: i64, recording_date: &str) -> Self {
        self.header_with_index(creator, version, 0, recording_date)
    }

    /// Header pointing at an index chunk at byte `index_chunk_offset`
    pub fn header_with_index(
        self,
        creator: &[u8; 4],
        version: i64,
        index_chunk_offset: i64,
        recording_date: &str,
    ) -> Self {
        let mut payload = Vec::new();
        payload.extend_from_slice(creator);
        payload.extend_from_slice(&version.to_le_bytes());
        payload.extend_from_slice(&index_chunk_offset.to_le_bytes());
        payload.extend_from_slice(
            format!("<RecordingDate>{recording_date}</RecordingDate>\0").as_bytes(),
        );
        self.raw_chunk(ChunkKind::Header.tag(), &payload)
    }

    pub fn channel_info(self, group: i32, channels: &[XmlRecord]) -> Self {
        let xml = document("ChannelInformationData", channels);
        self.channel_info_xml(group, channels.len() as i32, &xml)
    }

    pub fn channel_info_xml(self, group: i32, count: i32, xml: &str) -> Self {
        let mut payload = Vec::new();
        payload.extend_from_slice(&group.to_le_bytes());
        payload.extend_from_slice(&count.to_le_bytes());
        payload.extend_from_slice(xml.as_bytes());
        payload.push(0);
        self.raw_chunk(ChunkKind::ChannelInfo.tag(), &payload)
    }

    /// Int16 samples per channel. Like the instrument the channels are not
    /// stored in index order and there is a gap after the descriptors.
    pub fn data(self, group: i32, start: i64, channels: &[&[i16]]) -> Self {
        let samples_start = 32 + 8 * channels.len() + 4;
        let mut descriptors = vec![(0i32, 0i32); channels.len()];
        let mut samples = Vec::new();
        for (index, channel) in channels.iter().enumerate().rev() {
            let offset = samples_start + samples.len();
            descriptors[index] = (offset as i32, (channel.len() * 2) as i32);
            for sample in channel.iter() {
                samples.extend_from_slice(&sample.to_le_bytes());
            }
        }

        let mut tail = vec![0xAA; 4];
        tail.extend_from_slice(&samples);
        self.data_with_layout(group, start, channels.len() as i32, &descriptors, &tail)
    }

    /// A data chunk with explicit descriptors, `tail` follows the
    /// descriptor table.
    pub fn data_with_layout(
        self,
        group: i32,
        start: i64,
        descriptor_count: i32,
        descriptors: &[(i32, i32)],
        tail: &[u8],
    ) -> Self {
        let mut payload = Vec::new();
        payload.extend_from_slice(&group.to_le_bytes());
        payload.extend_from_slice(&start.to_le_bytes());
        payload.extend_from_slice(&descriptor_count.to_le_bytes());
        for (offset, length) in descriptors {
            payload.extend_from_slice(&offset.to_le_bytes());
            payload.extend_from_slice(&length.to_le_bytes());
        }
        payload.extend_from_slice(tail);
        self.raw_chunk(ChunkKind::Data.tag(), &payload)
    }

    pub fn event_definitions(self, definitions: &[XmlRecord]) -> Self {
        let xml = document("EventDefinitionData", definitions);
        self.event_definitions_xml(definitions.len() as i32, &xml)
    }

    pub fn event_definitions_xml(self, count: i32, xml: &str) -> Self {
        let mut payload = Vec::new();
        payload.extend_from_slice(&count.to_le_bytes());
        payload.extend_from_slice(xml.as_bytes());
        payload.push(0);
        self.raw_chunk(ChunkKind::EventDefinition.tag(), &payload)
    }

    pub fn events(self, events: &[Event]) -> Self {
        let mut payload = Vec::new();
        payload.extend_from_slice(&(events.len() as i64).to_le_bytes());
        for event in events {
            payload.extend_from_slice(&event.class.to_le_bytes());
            payload.extend_from_slice(&event.id.to_le_bytes());
            payload.extend_from_slice(&event.channel_index.to_le_bytes());
            payload.extend_from_slice(&event.start_index.to_le_bytes());
            payload.extend_from_slice(&event.end_index.to_le_bytes());
            for value in event.integer_data {
                payload.extend_from_slice(&value.to_le_bytes());
            }
            for value in event.float_data {
                payload.extend_from_slice(&value.to_le_bytes());
            }
        }
        self.raw_chunk(ChunkKind::EventData.tag(), &payload)
    }

    pub fn index(self, entries: &[IndexEntry]) -> Self {
        let mut payload = Vec::new();
        payload.extend_from_slice(&(entries.len() as i64).to_le_bytes());
        for entry in entries {
            for value in [
                entry.data_start_index,
                entry.samples_per_channel,
                entry.chunk_tag,
                entry.group_id,
                entry.file_offset,
            ] {
                payload.extend_from_slice(&value.to_le_bytes());
            }
        }
        self.raw_chunk(ChunkKind::Index.tag(), &payload)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Cut the file short, as an interrupted copy would
    pub fn truncate(mut self, len: usize) -> Self {
        self.bytes.truncate(len);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }

    pub fn write_to(self, path: impl AsRef<Path>) -> io::Result<()> {
        std::fs::write(path, self.bytes)
    }
}

/// The two channel recording used throughout the tests: channel 0 has
/// scale 2 and offset 1, channel 1 scale 0.5 and offset 0.
pub fn two_channel_recording(data_chunks: &[[&[i16]; 2]]) -> HpfBuilder {
    let mut builder = HpfBuilder::new()
        .header(b"datx", 1, "2021-03-04T05:06:07.123456")
        .channel_info(
            7,
            &[
                int16_channel("Voltage", 0, 2.0, 1.0),
                int16_channel("Current", 1, 0.5, 0.0),
            ],
        );
    let mut start = 0;
    for [first, second] in data_chunks {
        builder = builder.data(7, start, &[*first, *second]);
        start += first.len() as i64;
    }
    builder
}

/// Reproducible raw samples
pub fn random_samples(seed: u64, n: usize) -> Vec<i16> {
    let mut rng = Xoshiro128StarStar::seed_from_u64(seed);
    (0..n).map(|_| rng.random()).collect()
}
