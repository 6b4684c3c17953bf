use core::fmt;

use num_traits::AsPrimitive;
use tracing::{debug, instrument};

use crate::chunk::fields::{self, Fields};
use crate::record::{self, Record};
use crate::timestamp::{self, RecordingTime};

const GROUP_ID: usize = 16;
const CHANNEL_COUNT: usize = 20;
const RECORD: usize = 24;
pub(crate) const ROOT: &str = "ChannelInformationData";

const KNOWN_FIELDS: [&str; 20] = [
    "Name",
    "Unit",
    "ChannelType",
    "AssignedTimeChannelIndex",
    "DataType",
    "DataIndex",
    "StartTime",
    "TimeIncrement",
    "RangeMin",
    "RangeMax",
    "DataScale",
    "DataOffset",
    "SensorScale",
    "SensorOffset",
    "PerChannelSampleRate",
    "PhysicalChannelNumber",
    "UsesSensorValues",
    "ThermocoupleType",
    "TemperatureUnit",
    "UseThermocoupleValues",
];

/// How a single sample is stored in a data chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int16,
    UInt16,
    Int32,
    Float32,
    Float64,
}

impl DataType {
    /// Case insensitive, using the names the instrument writes.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "int16" => Self::Int16,
            "uint16" => Self::UInt16,
            "int32" => Self::Int32,
            "float" => Self::Float32,
            "double" => Self::Float64,
            _ => return None,
        })
    }

    /// width of one sample in bytes
    pub fn width(self) -> usize {
        match self {
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::Float32 => "Float",
            Self::Float64 => "Double",
        })
    }
}

/// Instruments also know calculated time and monotonic data channels, we
/// have never seen those in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    RandomData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDescriptor {
    pub index: u32,
    pub name: String,
    pub unit: String,
    pub channel_type: ChannelType,
    pub assigned_time_channel_index: i32,
    pub sample_data_type: DataType,
    pub start_time: RecordingTime,
    pub time_increment: f64,
    pub range_min: f64,
    pub range_max: f64,
    pub scale: f64,
    pub offset: f64,
    pub sensor_scale: f64,
    pub sensor_offset: f64,
    pub sample_rate_hz: f64,
    pub physical_channel_number: i32,
    pub uses_sensor_values: bool,
    pub thermocouple_type: String,
    pub temperature_unit: String,
    pub use_thermocouple_values: bool,
}

impl ChannelDescriptor {
    pub fn to_physical<T: AsPrimitive<f64>>(&self, raw: T) -> f64 {
        raw.as_() * self.scale + self.offset
    }
}

/// All channels of the one channel group in a file, ordered by index.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTable {
    pub group_id: i32,
    channels: Vec<ChannelDescriptor>,
}

impl ChannelTable {
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ChannelDescriptor> {
        self.channels.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelDescriptor> {
        self.channels.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|c| c.name.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Field(#[from] fields::Error),
    #[error("{0}")]
    Record(#[from] record::Error),
    #[error("Chunk declares {declared} channels but describes {found}")]
    RecordCountMismatch { declared: usize, found: usize },
    #[error("Channel record {position}: {error}")]
    Channel {
        position: usize,
        error: record::Error,
    },
    #[error("Channel record {position} has an invalid start time: {error}")]
    StartTime {
        position: usize,
        error: timestamp::Error,
    },
    #[error("Channel record {position} has data index {index}, should lie in 0..{count}")]
    BadChannelIndex {
        position: usize,
        index: i64,
        count: usize,
    },
    #[error("Data index {0} is used by more than one channel")]
    DuplicateChannelIndex(u32),
}

#[instrument(level = "debug", skip(fields))]
pub(crate) fn decode(fields: Fields<'_>) -> Result<ChannelTable, Error> {
    let group_id = fields.i32_at(GROUP_ID)?;
    let count = fields.size_from_i32(CHANNEL_COUNT, "channel count")?;

    let root = record::parse(fields.text_from(RECORD)?, ROOT)?;
    let records: Vec<_> = record::repeated(&root).map(Record::from_element).collect();
    if records.len() != count {
        return Err(Error::RecordCountMismatch {
            declared: count,
            found: records.len(),
        });
    }

    // records are not stored in index order
    let mut slots: Vec<Option<ChannelDescriptor>> = vec![None; count];
    for (position, record) in records.iter().enumerate() {
        let channel = descriptor(record, position, count)?;
        let slot = &mut slots[channel.index as usize];
        if slot.is_some() {
            return Err(Error::DuplicateChannelIndex(channel.index));
        }
        *slot = Some(channel);
    }
    let channels: Vec<_> = slots.into_iter().flatten().collect();

    debug!(
        "group {group_id} has channels: {:?}",
        channels.iter().map(|c| &c.name).collect::<Vec<_>>()
    );
    Ok(ChannelTable { group_id, channels })
}

fn descriptor(record: &Record, position: usize, count: usize) -> Result<ChannelDescriptor, Error> {
    let in_record = move |error: record::Error| Error::Channel { position, error };
    for name in record.names().filter(|name| !KNOWN_FIELDS.contains(name)) {
        debug!("ignoring unknown field {name} in channel record {position}");
    }

    let raw_index: i64 = record.required_number("DataIndex").map_err(in_record)?;
    let index = u32::try_from(raw_index)
        .ok()
        .filter(|index| (*index as usize) < count)
        .ok_or(Error::BadChannelIndex {
            position,
            index: raw_index,
            count,
        })?;

    let channel_type = record.required("ChannelType").map_err(in_record)?;
    let channel_type = match channel_type.to_ascii_lowercase().as_str() {
        "randomdatachannel" => ChannelType::RandomData,
        _ => {
            return Err(in_record(record::Error::UnsupportedFieldValue {
                field: "ChannelType",
                value: channel_type.to_owned(),
            }))
        }
    };

    // only int16 recordings have been seen in the wild, the other types
    // are refused rather than converted without ever being checked
    let data_type = record.required("DataType").map_err(in_record)?;
    let sample_data_type = match DataType::from_name(data_type) {
        Some(DataType::Int16) => DataType::Int16,
        Some(_) | None => {
            return Err(in_record(record::Error::UnsupportedFieldValue {
                field: "DataType",
                value: data_type.to_owned(),
            }))
        }
    };

    let start_time = match record.get("StartTime") {
        Some(text) => RecordingTime::parse(text)
            .map_err(|error| Error::StartTime { position, error })?,
        None => RecordingTime::unset(),
    };

    Ok(ChannelDescriptor {
        index,
        name: record.required("Name").map_err(in_record)?.to_owned(),
        unit: record.text_or_default("Unit"),
        channel_type,
        assigned_time_channel_index: record
            .number::<i32>("AssignedTimeChannelIndex")
            .map_err(in_record)?
            .unwrap_or_default(),
        sample_data_type,
        start_time,
        time_increment: optional_f64(record, "TimeIncrement").map_err(in_record)?,
        range_min: optional_f64(record, "RangeMin").map_err(in_record)?,
        range_max: optional_f64(record, "RangeMax").map_err(in_record)?,
        scale: record.required_number("DataScale").map_err(in_record)?,
        offset: record.required_number("DataOffset").map_err(in_record)?,
        sensor_scale: optional_f64(record, "SensorScale").map_err(in_record)?,
        sensor_offset: optional_f64(record, "SensorOffset").map_err(in_record)?,
        sample_rate_hz: optional_f64(record, "PerChannelSampleRate").map_err(in_record)?,
        physical_channel_number: record
            .number::<i32>("PhysicalChannelNumber")
            .map_err(in_record)?
            .unwrap_or_default(),
        uses_sensor_values: record
            .boolean("UsesSensorValues")
            .map_err(in_record)?
            .unwrap_or_default(),
        thermocouple_type: record.text_or_default("ThermocoupleType"),
        temperature_unit: record.text_or_default("TemperatureUnit"),
        use_thermocouple_values: record
            .boolean("UseThermocoupleValues")
            .map_err(in_record)?
            .unwrap_or_default(),
    })
}

fn optional_f64(record: &Record, name: &'static str) -> Result<f64, record::Error> {
    record.number(name).map(Option::unwrap_or_default)
}
