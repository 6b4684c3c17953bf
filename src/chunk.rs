pub mod fields;

use core::fmt;
use std::io::{self, Read, Seek, SeekFrom};

use tracing::{instrument, warn};

pub use fields::Fields;

/// kind tag (8 bytes) followed by the declared total length (8 bytes)
pub const PREFIX_SIZE: usize = 16;
/// HPF files are written in chunks of this size
pub const TYPICAL_CHUNK_SIZE: usize = 64 * 1024;
/// Largest chunk we are willing to buffer unless configured otherwise
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChunkKind {
    Header,
    ChannelInfo,
    Data,
    EventDefinition,
    EventData,
    Index,
}

impl ChunkKind {
    pub const ALL: [ChunkKind; 6] = [
        ChunkKind::Header,
        ChunkKind::ChannelInfo,
        ChunkKind::Data,
        ChunkKind::EventDefinition,
        ChunkKind::EventData,
        ChunkKind::Index,
    ];

    pub fn tag(self) -> u64 {
        match self {
            ChunkKind::Header => 0x1000,
            ChunkKind::ChannelInfo => 0x2000,
            ChunkKind::Data => 0x3000,
            ChunkKind::EventDefinition => 0x4000,
            ChunkKind::EventData => 0x5000,
            ChunkKind::Index => 0x6000,
        }
    }

    pub fn from_tag(tag: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChunkKind::Header => "header",
            ChunkKind::ChannelInfo => "channel info",
            ChunkKind::Data => "data",
            ChunkKind::EventDefinition => "event definition",
            ChunkKind::EventData => "event data",
            ChunkKind::Index => "index",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Io error while reading chunk at byte {offset}: {error}")]
    Io { offset: u64, error: io::Error },
    #[error(
        "Chunk at byte {offset} is truncated, it declares {declared} bytes \
        but only {available} remain"
    )]
    TruncatedChunk {
        offset: u64,
        declared: u64,
        available: u64,
    },
    #[error(
        "Chunk at byte {offset} declares {declared} bytes, more than the \
        maximum chunk size of {max} bytes"
    )]
    ChunkTooLarge { offset: u64, declared: u64, max: usize },
    #[error(
        "Chunk at byte {offset} declares {declared} bytes, that is less than \
        its own {PREFIX_SIZE} byte prefix"
    )]
    ChunkTooSmall { offset: u64, declared: u64 },
    #[error("Unknown chunk kind {tag:#x} at byte {offset}")]
    UnknownChunkKind { offset: u64, tag: u64 },
}

/// One chunk exactly as it was read, prefix included.
#[derive(Debug, Clone, Copy)]
pub struct RawChunk<'a> {
    pub kind: ChunkKind,
    /// absolute position of the chunk in the source
    pub offset: u64,
    bytes: &'a [u8],
}

impl<'a> RawChunk<'a> {
    pub fn declared_len(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// The whole chunk, the layouts of all kinds are addressed from here.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Everything after the kind and length prefix.
    pub fn body(&self) -> &'a [u8] {
        &self.bytes[PREFIX_SIZE..]
    }

    pub fn fields(&self) -> Fields<'a> {
        Fields::new(self.bytes)
    }
}

/// Walks a seekable byte source one chunk at a time. The chunk buffer is
/// reused so at most one chunk is held in memory.
#[derive(Debug)]
pub struct ChunkReader<R> {
    source: R,
    buffer: Vec<u8>,
    max_chunk_size: usize,
    /// absolute offset of the next chunk
    position: u64,
}

impl<R: Read + Seek> ChunkReader<R> {
    pub fn new(source: R) -> Self {
        Self::with_max_chunk_size(source, DEFAULT_MAX_CHUNK_SIZE)
    }

    /// # Note
    /// The source is read from its current position onwards.
    pub fn with_max_chunk_size(source: R, max_chunk_size: usize) -> Self {
        Self {
            source,
            buffer: Vec::with_capacity(TYPICAL_CHUNK_SIZE.min(max_chunk_size)),
            max_chunk_size,
            position: 0,
        }
    }

    /// Position in bytes right after the last chunk returned.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    /// Returns `None` once fewer bytes than a chunk prefix remain.
    #[instrument(level = "trace", skip(self), fields(offset = tracing::field::Empty))]
    pub fn next_chunk(&mut self) -> Result<Option<RawChunk<'_>>, ReadError> {
        let offset = self
            .source
            .stream_position()
            .map_err(|error| ReadError::Io {
                offset: self.position,
                error,
            })?;
        tracing::Span::current().record("offset", offset);
        let io_err = |error| ReadError::Io { offset, error };

        let mut prefix = [0u8; PREFIX_SIZE];
        let n_read = read_up_to(&mut self.source, &mut prefix).map_err(io_err)?;
        if n_read < PREFIX_SIZE {
            if n_read > 0 {
                warn!("ignoring {n_read} trailing bytes at {offset}, too short for a chunk");
            }
            self.position = offset + n_read as u64;
            return Ok(None);
        }

        let (tag, declared) = prefix.split_at(8);
        let tag = u64::from_le_bytes(tag.try_into().expect("prefix is 16 bytes"));
        let declared = u64::from_le_bytes(declared.try_into().expect("prefix is 16 bytes"));
        let kind = ChunkKind::from_tag(tag).ok_or(ReadError::UnknownChunkKind { offset, tag })?;
        if declared > self.max_chunk_size as u64 {
            return Err(ReadError::ChunkTooLarge {
                offset,
                declared,
                max: self.max_chunk_size,
            });
        }
        if declared < PREFIX_SIZE as u64 {
            return Err(ReadError::ChunkTooSmall { offset, declared });
        }

        // read the chunk again from its start, prefix included, so every
        // layout can be addressed from the chunk start
        self.source
            .seek(SeekFrom::Start(offset))
            .map_err(io_err)?;
        self.buffer.resize(declared as usize, 0);
        let n_read = read_up_to(&mut self.source, &mut self.buffer).map_err(io_err)?;
        if n_read < self.buffer.len() {
            return Err(ReadError::TruncatedChunk {
                offset,
                declared,
                available: n_read as u64,
            });
        }

        self.position = offset + declared;
        tracing::trace!("read {kind} chunk of {declared} bytes");
        Ok(Some(RawChunk {
            kind,
            offset,
            bytes: &self.buffer,
        }))
    }
}

/// Like `read_exact` but reports how much was read if the source runs out.
fn read_up_to(source: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
