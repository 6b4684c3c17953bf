use std::collections::BTreeMap;
use std::io::{Read, Seek, Write};

use tracing::{debug, info, instrument};

use crate::chunk::{ChunkKind, ChunkReader};
use crate::config::Options;
use crate::emit::{Downsampler, Rows, TableWriter};
use crate::error::Error;
use crate::interpret::{self, Chunk};
use crate::session::Session;

/// Pulls chunks from a source one at a time, keeping the [`Session`]
/// up to date. Nothing is written, see [`Converter`] for that.
#[derive(Debug)]
pub struct Decoder<R> {
    reader: ChunkReader<R>,
    session: Session,
    chunks: BTreeMap<ChunkKind, u64>,
    /// offset of the chunk that failed, nothing is read after it
    failed_at: Option<u64>,
}

impl<R: Read + Seek> Decoder<R> {
    pub fn new(source: R) -> Self {
        Self::from_reader(ChunkReader::new(source))
    }

    pub fn with_options(source: R, options: &Options) -> Self {
        Self::from_reader(ChunkReader::with_max_chunk_size(
            source,
            options.max_chunk_size,
        ))
    }

    fn from_reader(reader: ChunkReader<R>) -> Self {
        Self {
            reader,
            session: Session::new(),
            chunks: BTreeMap::new(),
            failed_at: None,
        }
    }

    /// `None` at the end of the source. Every error is fatal, later
    /// calls return [`Error::AfterFatal`] without reading.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, Error> {
        if let Some(offset) = self.failed_at {
            return Err(Error::AfterFatal { offset });
        }
        let offset = self.reader.position();
        let result = self.decode_next();
        if result.is_err() {
            self.failed_at = Some(offset);
        }
        result
    }

    fn decode_next(&mut self) -> Result<Option<Chunk>, Error> {
        let Some(raw) = self.reader.next_chunk()? else {
            return Ok(None);
        };
        let chunk = interpret::interpret(&raw, &self.session).map_err(|error| Error::Chunk {
            kind: raw.kind,
            offset: raw.offset,
            error,
        })?;

        self.session.apply(&chunk);
        *self.chunks.entry(chunk.kind()).or_default() += 1;
        Ok(Some(chunk))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// How many chunks of each kind were decoded
    pub fn chunk_counts(&self) -> &BTreeMap<ChunkKind, u64> {
        &self.chunks
    }

    /// Byte offset right after the last chunk read
    pub fn position(&self) -> u64 {
        self.reader.position()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub chunks: BTreeMap<ChunkKind, u64>,
    /// sample lines in the recording, before downsampling
    pub sample_lines: u64,
    pub rows_written: u64,
}

impl Summary {
    pub fn chunks_of(&self, kind: ChunkKind) -> u64 {
        self.chunks.get(&kind).copied().unwrap_or(0)
    }
}

/// Turns a recording into a table, one chunk per [`step`](Self::step).
pub struct Converter<R, W: Write> {
    decoder: Decoder<R>,
    table: TableWriter<W>,
    downsampler: Downsampler,
    finished: bool,
    failed_at: Option<u64>,
}

impl<R: Read + Seek, W: Write> Converter<R, W> {
    pub fn new(source: R, sink: W, options: &Options) -> Self {
        Self {
            decoder: Decoder::with_options(source, options),
            table: TableWriter::new(sink, options),
            downsampler: Downsampler::new(options.downsample),
            finished: false,
            failed_at: None,
        }
    }

    /// Handle the next chunk. Returns false once the source is exhausted,
    /// the table is then complete and flushed. After an error nothing
    /// more is read or written.
    #[instrument(level = "trace", skip(self))]
    pub fn step(&mut self) -> Result<bool, Error> {
        if let Some(offset) = self.failed_at {
            return Err(Error::AfterFatal { offset });
        }
        let offset = self.decoder.position();
        let result = self.convert_next();
        if result.is_err() {
            self.failed_at = Some(offset);
        }
        result
    }

    fn convert_next(&mut self) -> Result<bool, Error> {
        if self.finished {
            return Ok(false);
        }
        let Some(chunk) = self.decoder.next_chunk()? else {
            self.finish_table()?;
            return Ok(false);
        };

        if let Chunk::Data(data) = &chunk {
            let session = self.decoder.session();
            let channels = session
                .channels()
                .expect("data chunks only decode after channel info");
            self.table.write_header(session.metadata(), channels)?;
            for row in Rows::new(data, channels, &mut self.downsampler) {
                self.table.write_row(&row)?;
            }
            debug!(
                "data chunk done, {} sample lines seen",
                self.downsampler.lines_seen()
            );
        }
        Ok(true)
    }

    /// Convert everything that is left.
    pub fn run(&mut self) -> Result<Summary, Error> {
        while self.step()? {}
        Ok(self.summary())
    }

    fn finish_table(&mut self) -> Result<(), Error> {
        // a recording without data still gets its header
        let session = self.decoder.session();
        if let Some(channels) = session.channels() {
            self.table.write_header(session.metadata(), channels)?;
        }
        self.table.flush()?;
        self.finished = true;
        info!(
            "conversion done: {} of {} sample lines written",
            self.table.rows_written(),
            self.downsampler.lines_seen()
        );
        Ok(())
    }

    pub fn summary(&self) -> Summary {
        Summary {
            chunks: self.decoder.chunk_counts().clone(),
            sample_lines: self.downsampler.lines_seen(),
            rows_written: self.table.rows_written(),
        }
    }

    pub fn session(&self) -> &Session {
        self.decoder.session()
    }

    pub fn position(&self) -> u64 {
        self.decoder.position()
    }

    pub fn into_sink(self) -> W {
        self.table.into_inner()
    }
}
