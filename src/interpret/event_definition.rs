use tracing::{debug, instrument};

use crate::chunk::fields::{self, Fields};
use crate::record::{self, Record};

const DEFINITION_COUNT: usize = 16;
const RECORD: usize = 20;
pub(crate) const ROOT: &str = "EventDefinitionData";

/// The only class instruments write: events raised by the instrument itself
const INSTRUMENT_EVENT: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    Instrument,
}

/// Ranged events exist in the format, we only accept point events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Point,
}

/// One of the optional payload values an event carries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadUse {
    pub used: bool,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameter {
    pub used: bool,
    pub value: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDefinition {
    pub name: String,
    pub description: String,
    pub class: EventClass,
    pub id: i32,
    pub event_type: EventType,
    /// `IData1` and `IData2`
    pub integer_data: [PayloadUse; 2],
    /// `DData1` up to `DData4`
    pub float_data: [PayloadUse; 4],
    pub parameters: [Parameter; 2],
    pub tolerance: Parameter,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Field(#[from] fields::Error),
    #[error("{0}")]
    Record(#[from] record::Error),
    #[error("Chunk declares {declared} event definitions but describes {found}")]
    RecordCountMismatch { declared: usize, found: usize },
    #[error("Event definition {position}: {error}")]
    Definition {
        position: usize,
        error: record::Error,
    },
}

#[instrument(level = "debug", skip(fields))]
pub(crate) fn decode(fields: Fields<'_>) -> Result<Vec<EventDefinition>, Error> {
    let count = fields.size_from_i32(DEFINITION_COUNT, "definition count")?;
    let root = record::parse(fields.text_from(RECORD)?, ROOT)?;

    let records: Vec<_> = record::repeated(&root).map(Record::from_element).collect();
    if records.len() != count {
        return Err(Error::RecordCountMismatch {
            declared: count,
            found: records.len(),
        });
    }

    let definitions = records
        .iter()
        .enumerate()
        .map(|(position, record)| {
            definition(record).map_err(|error| Error::Definition { position, error })
        })
        .collect::<Result<Vec<_>, _>>()?;
    debug!(
        "event definitions: {:?}",
        definitions.iter().map(|d| (&d.name, d.id)).collect::<Vec<_>>()
    );
    Ok(definitions)
}

fn definition(record: &Record) -> Result<EventDefinition, record::Error> {
    let class = record.required("Class")?;
    let class = match record::parse_number::<i32>("Class", class)? {
        INSTRUMENT_EVENT => EventClass::Instrument,
        _ => {
            return Err(record::Error::UnsupportedFieldValue {
                field: "Class",
                value: class.to_owned(),
            })
        }
    };

    let id = record.required("ID")?;
    let id = match record::parse_number::<i32>("ID", id)? {
        0 => {
            return Err(record::Error::UnsupportedFieldValue {
                field: "ID",
                value: id.to_owned(),
            })
        }
        id => id,
    };

    let event_type = record.required("Type")?;
    let event_type = match event_type.to_ascii_lowercase().as_str() {
        "point" => EventType::Point,
        _ => {
            return Err(record::Error::UnsupportedFieldValue {
                field: "Type",
                value: event_type.to_owned(),
            })
        }
    };

    Ok(EventDefinition {
        name: record.required("Name")?.to_owned(),
        description: record.text_or_default("Description"),
        class,
        id,
        event_type,
        integer_data: [
            payload_use(record, "UsesIData1", "DescriptionIData1")?,
            payload_use(record, "UsesIData2", "DescriptionIData2")?,
        ],
        float_data: [
            payload_use(record, "UsesDData1", "DescriptionDData1")?,
            payload_use(record, "UsesDData2", "DescriptionDData2")?,
            payload_use(record, "UsesDData3", "DescriptionDData3")?,
            payload_use(record, "UsesDData4", "DescriptionDData4")?,
        ],
        parameters: [
            parameter(record, "Parameter1", "UsesParameter1", "DescriptionParameter1")?,
            parameter(record, "Parameter2", "UsesParameter2", "DescriptionParameter2")?,
        ],
        tolerance: parameter(record, "Tolerance", "UsesTolerance", "DescriptionTolerance")?,
    })
}

fn payload_use(
    record: &Record,
    uses: &'static str,
    description: &'static str,
) -> Result<PayloadUse, record::Error> {
    Ok(PayloadUse {
        used: record.boolean(uses)?.unwrap_or_default(),
        description: record.text_or_default(description),
    })
}

fn parameter(
    record: &Record,
    value: &'static str,
    uses: &'static str,
    description: &'static str,
) -> Result<Parameter, record::Error> {
    Ok(Parameter {
        used: record.boolean(uses)?.unwrap_or_default(),
        value: record.text_or_default(value),
        description: record.text_or_default(description),
    })
}
