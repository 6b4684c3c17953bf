use std::io;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};

use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};

use crate::chunk::DEFAULT_MAX_CHUNK_SIZE;

/// How a recording is turned into a table. Missing fields in a config
/// file take their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// placed between the columns, a tab by default
    pub delimiter: String,
    /// emit only every n-th sample line
    pub downsample: NonZeroU64,
    /// write the recording date and channel table before the header row
    pub preamble: bool,
    /// start each row with its line number in the recording
    pub row_index: bool,
    /// chunks declaring a larger size are refused
    pub max_chunk_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            delimiter: "\t".to_owned(),
            downsample: NonZeroU64::MIN,
            preamble: false,
            row_index: false,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not read config file {path}: {error}")]
    Io { path: PathBuf, error: io::Error },
    #[error("Config is not valid: {0}")]
    Deserialize(#[from] ron::error::SpannedError),
    #[error("Could not serialize config: {0}")]
    Serialize(#[source] ron::Error),
}

impl Options {
    pub fn from_ron_str(text: &str) -> Result<Self, Error> {
        Ok(ron::de::from_str(text)?)
    }

    pub fn from_ron_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|error| Error::Io {
            path: path.to_owned(),
            error,
        })?;
        Self::from_ron_str(&text)
    }

    pub fn to_ron_string(&self) -> Result<String, Error> {
        ron::ser::to_string_pretty(self, PrettyConfig::new()).map_err(Error::Serialize)
    }
}
