pub mod format;

use std::io::{self, Write};
use std::num::NonZeroU64;

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::config::Options;
use crate::interpret::{ChannelTable, DataChunk, RecordingMetadata};

/// Values are written with this many significant digits
pub const PRECISION: usize = 15;
pub const ROW_INDEX_COLUMN: &str = "data_line";

/// Keeps every `factor`-th sample line of the whole file. The count runs
/// on across data chunks so chunk boundaries do not affect which lines
/// are kept.
#[derive(Debug, Clone)]
pub struct Downsampler {
    factor: NonZeroU64,
    /// sample lines seen so far
    data_lines: u64,
}

impl Downsampler {
    pub fn new(factor: NonZeroU64) -> Self {
        Self {
            factor,
            data_lines: 0,
        }
    }

    pub fn factor(&self) -> NonZeroU64 {
        self.factor
    }

    /// Count one sample line. Returns its global index (zero based) if
    /// it should be emitted.
    pub fn advance(&mut self) -> Option<u64> {
        let index = self.data_lines;
        self.data_lines += 1;
        (index % self.factor.get() == 0).then_some(index)
    }

    pub fn lines_seen(&self) -> u64 {
        self.data_lines
    }
}

/// Physical values of all channels at one global sample index.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub index: u64,
    pub values: Vec<f64>,
}

/// The rows a data chunk yields after downsampling. Only sample lines
/// that are pulled from the iterator are counted.
pub struct Rows<'a> {
    chunk: &'a DataChunk,
    channels: &'a ChannelTable,
    downsampler: &'a mut Downsampler,
    next: usize,
}

impl<'a> Rows<'a> {
    pub fn new(
        chunk: &'a DataChunk,
        channels: &'a ChannelTable,
        downsampler: &'a mut Downsampler,
    ) -> Self {
        Self {
            chunk,
            channels,
            downsampler,
            next: 0,
        }
    }
}

impl Iterator for Rows<'_> {
    type Item = SampleRow;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.chunk.sample_count() {
            let sample = self.next;
            self.next += 1;
            let Some(index) = self.downsampler.advance() else {
                continue;
            };

            // every channel holds sample_count samples
            let values = self
                .chunk
                .samples
                .iter()
                .zip(self.channels.iter())
                .map(|(samples, channel)| samples.physical(sample, channel))
                .collect::<Option<Vec<f64>>>()?;
            return Some(SampleRow { index, values });
        }
        None
    }
}

/// Writes the table: optional preamble, the header row and then one
/// line per [`SampleRow`].
#[derive(Debug)]
pub struct TableWriter<W> {
    sink: W,
    delimiter: String,
    preamble: bool,
    row_index: bool,
    downsample: NonZeroU64,
    header_written: bool,
    rows_written: u64,
}

impl<W: Write> TableWriter<W> {
    pub fn new(sink: W, options: &Options) -> Self {
        Self {
            sink,
            delimiter: options.delimiter.clone(),
            preamble: options.preamble,
            row_index: options.row_index,
            downsample: options.downsample,
            header_written: false,
            rows_written: 0,
        }
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Writes the preamble (if enabled) and the column names. Does nothing
    /// if the header was already written.
    #[instrument(level = "debug", skip_all)]
    pub fn write_header(
        &mut self,
        metadata: Option<&RecordingMetadata>,
        channels: &ChannelTable,
    ) -> io::Result<()> {
        if self.header_written {
            return Ok(());
        }
        if self.preamble {
            self.write_preamble(metadata, channels)?;
        }

        let index_column = self.row_index.then_some(ROW_INDEX_COLUMN);
        let names = index_column.into_iter().chain(channels.names());
        writeln!(self.sink, "{}", names.format(&self.delimiter))?;
        self.header_written = true;
        debug!("wrote table header for {} channels", channels.len());
        Ok(())
    }

    fn write_preamble(
        &mut self,
        metadata: Option<&RecordingMetadata>,
        channels: &ChannelTable,
    ) -> io::Result<()> {
        let sep = &self.delimiter;
        let sink = &mut self.sink;
        let float = |value: f64| format::significant(value, PRECISION);

        let recording_date = metadata
            .map(|m| m.recording_start.as_str())
            .unwrap_or_default();
        writeln!(sink, "RecordingDate :{sep}{recording_date}")?;
        writeln!(sink, "{sep}")?;
        writeln!(sink, "Channels Recorded {sep}{}", channels.len())?;
        let rate = channels.get(0).map(|c| c.sample_rate_hz).unwrap_or_default();
        writeln!(sink, "PerChannelSamplingFreq :{sep}{}", float(rate))?;
        if self.downsample.get() > 1 {
            writeln!(sink, "DownsampleCount :{sep}{}", self.downsample)?;
        }
        writeln!(sink, "{sep}")?;

        let columns = [
            "ChannelName",
            "ChannelNumber",
            "Units",
            "DataType",
            "RangeMin",
            "RangeMax",
            "DataScale",
            "DataOffset",
            "SensorScale",
            "SensorOffset",
        ];
        writeln!(sink, "{}", columns.iter().format(sep))?;
        for c in channels.iter() {
            let cells = [
                c.name.clone(),
                c.index.to_string(),
                c.unit.clone(),
                c.sample_data_type.to_string(),
                float(c.range_min),
                float(c.range_max),
                float(c.scale),
                float(c.offset),
                float(c.sensor_scale),
                float(c.sensor_offset),
            ];
            writeln!(sink, "{}", cells.iter().format(sep))?;
        }
        writeln!(sink, "{sep}")
    }

    pub fn write_row(&mut self, row: &SampleRow) -> io::Result<()> {
        let values = row
            .values
            .iter()
            .map(|value| format::significant(*value, PRECISION));
        if self.row_index {
            // line numbers in the table start at one
            let line = row.index + 1;
            writeln!(
                self.sink,
                "{line}{}{}",
                self.delimiter,
                values.format(&self.delimiter)
            )?;
        } else {
            writeln!(self.sink, "{}", values.format(&self.delimiter))?;
        }
        self.rows_written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downsampler_keeps_multiples_of_factor() {
        let mut downsampler = Downsampler::new(NonZeroU64::new(3).unwrap());
        let kept: Vec<_> = (0..10).filter_map(|_| downsampler.advance()).collect();
        assert_eq!(kept, vec![0, 3, 6, 9]);
        assert_eq!(downsampler.lines_seen(), 10);
    }

    #[test]
    fn factor_one_keeps_all() {
        let mut downsampler = Downsampler::new(NonZeroU64::MIN);
        assert!((0..5).all(|_| downsampler.advance().is_some()));
    }

    #[test]
    fn row_with_index_column() {
        let options = Options {
            delimiter: ",".to_owned(),
            row_index: true,
            ..Options::default()
        };
        let mut writer = TableWriter::new(Vec::new(), &options);
        writer
            .write_row(&SampleRow {
                index: 4,
                values: vec![21.0, 0.5],
            })
            .unwrap();
        assert_eq!(writer.rows_written(), 1);
        assert_eq!(String::from_utf8(writer.into_inner()).unwrap(), "5,21,0.5\n");
    }
}
