//! Cuts the packed payload of a data chunk into one sample vector per
//! channel.

use num_traits::AsPrimitive;
use tracing::{instrument, warn};

use crate::chunk::fields::{self, Fields};
use crate::interpret::channel_info::{ChannelDescriptor, ChannelTable, DataType};

/// Where the samples of one channel are stored, relative to the chunk start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSlice {
    pub offset: usize,
    pub length: usize,
}

/// Raw samples of one channel in file order.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl Samples {
    fn decode(data_type: DataType, bytes: &[u8]) -> Self {
        match data_type {
            DataType::Int16 => Self::Int16(decode_le(bytes, i16::from_le_bytes)),
            DataType::UInt16 => Self::UInt16(decode_le(bytes, u16::from_le_bytes)),
            DataType::Int32 => Self::Int32(decode_le(bytes, i32::from_le_bytes)),
            DataType::Float32 => Self::Float32(decode_le(bytes, f32::from_le_bytes)),
            DataType::Float64 => Self::Float64(decode_le(bytes, f64::from_le_bytes)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Int16(v) => v.len(),
            Self::UInt16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample `index` converted with the scale and offset of `channel`
    pub fn physical(&self, index: usize, channel: &ChannelDescriptor) -> Option<f64> {
        fn convert<T: AsPrimitive<f64>>(
            samples: &[T],
            index: usize,
            channel: &ChannelDescriptor,
        ) -> Option<f64> {
            samples.get(index).map(|raw| channel.to_physical(*raw))
        }

        match self {
            Self::Int16(v) => convert(v, index, channel),
            Self::UInt16(v) => convert(v, index, channel),
            Self::Int32(v) => convert(v, index, channel),
            Self::Float32(v) => convert(v, index, channel),
            Self::Float64(v) => convert(v, index, channel),
        }
    }
}

fn decode_le<T, const W: usize>(bytes: &[u8], from_le: fn([u8; W]) -> T) -> Vec<T> {
    bytes
        .chunks_exact(W)
        .map(|sample| {
            let mut array = [0u8; W];
            array.copy_from_slice(sample);
            from_le(array)
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Samples of channel {channel} lie outside the chunk: {error}")]
    Field {
        channel: usize,
        error: fields::Error,
    },
    #[error("Channel {channel} holds {found} samples, channel 0 holds {expected}")]
    SampleCountMismatch {
        channel: usize,
        expected: usize,
        found: usize,
    },
}

/// One [`Samples`] per channel in channel index order. Every channel
/// must hold as many samples as the first.
#[instrument(level = "trace", skip_all)]
pub(crate) fn reassemble(
    fields: Fields<'_>,
    layout: &[ChannelSlice],
    channels: &ChannelTable,
) -> Result<Vec<Samples>, Error> {
    let mut per_channel: Vec<Samples> = Vec::with_capacity(layout.len());
    for (channel, (slice, descriptor)) in layout.iter().zip(channels.iter()).enumerate() {
        let data_type = descriptor.sample_data_type;
        let bytes = fields
            .slice(slice.offset, slice.length)
            .map_err(|error| Error::Field { channel, error })?;
        let leftover = slice.length % data_type.width();
        if leftover != 0 {
            warn!(
                "channel {channel} holds {} bytes, not a multiple of the {} sample width, \
                ignoring the last {leftover}",
                slice.length,
                data_type
            );
        }

        let samples = Samples::decode(data_type, bytes);
        if let Some(first) = per_channel.first().map(Samples::len) {
            if samples.len() != first {
                return Err(Error::SampleCountMismatch {
                    channel,
                    expected: first,
                    found: samples.len(),
                });
            }
        }
        per_channel.push(samples);
    }
    Ok(per_channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_little_endian_int16() {
        let bytes = [0x0a, 0x00, 0xff, 0xff, 0x00, 0x80, 0x01];
        let samples = Samples::decode(DataType::Int16, &bytes);
        assert_eq!(samples, Samples::Int16(vec![10, -1, i16::MIN]));
    }

    #[test]
    fn wider_types() {
        let bytes = 1.5f64.to_le_bytes();
        assert_eq!(
            Samples::decode(DataType::Float64, &bytes),
            Samples::Float64(vec![1.5])
        );
        assert_eq!(Samples::decode(DataType::Int32, &bytes[..7]).len(), 1);
    }
}
