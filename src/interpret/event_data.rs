use tracing::{debug, instrument};

use crate::chunk::fields::{self, Fields};

const EVENT_COUNT: usize = 16;
const EVENTS: usize = 24;
/// Records are packed, the f64 payload is not aligned
const EVENT_SIZE: usize = 68;

/// An event as the instrument logged it. The meaning of the payload
/// follows from the [`EventDefinition`](super::event_definition::EventDefinition)
/// with the same class and id.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub class: i32,
    pub id: i32,
    pub channel_index: i32,
    pub start_index: i64,
    pub end_index: i64,
    pub integer_data: [i32; 2],
    pub float_data: [f64; 4],
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Field(#[from] fields::Error),
}

#[instrument(level = "debug", skip(fields))]
pub(crate) fn decode(fields: Fields<'_>) -> Result<Vec<Event>, Error> {
    let count = fields.size_from_i64(EVENT_COUNT, "event count")?;
    let events = fields
        .records(EVENTS, count, EVENT_SIZE)?
        .map(event)
        .collect::<Result<Vec<_>, _>>()?;
    debug!("read {} events", events.len());
    Ok(events)
}

fn event(record: Fields<'_>) -> Result<Event, fields::Error> {
    Ok(Event {
        class: record.i32_at(0)?,
        id: record.i32_at(4)?,
        channel_index: record.i32_at(8)?,
        start_index: record.i64_at(12)?,
        end_index: record.i64_at(20)?,
        integer_data: [record.i32_at(28)?, record.i32_at(32)?],
        float_data: [
            record.f64_at(36)?,
            record.f64_at(44)?,
            record.f64_at(52)?,
            record.f64_at(60)?,
        ],
    })
}
