use core::fmt;

use chrono::NaiveDateTime;

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("Could not parse {text:?} as a time of the form YYYY-MM-DDThh:mm:ss.ffffff: {error}")]
pub struct Error {
    text: String,
    error: chrono::ParseError,
}

/// A recording time as the instrument writes it. An empty value, or one
/// whose leading number is zero, means the time was never set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingTime {
    text: String,
    time: Option<NaiveDateTime>,
}

impl RecordingTime {
    pub fn unset() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Result<Self, Error> {
        let text = text.trim();
        if leading_integer(text) == 0 {
            return Ok(Self {
                text: text.to_owned(),
                time: None,
            });
        }

        let time = NaiveDateTime::parse_from_str(text, FORMAT).map_err(|error| Error {
            text: text.to_owned(),
            error,
        })?;
        Ok(Self {
            text: text.to_owned(),
            time: Some(time),
        })
    }

    pub fn time(&self) -> Option<NaiveDateTime> {
        self.time
    }

    pub fn is_set(&self) -> bool {
        self.time.is_some()
    }

    /// The text as it appeared in the file
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for RecordingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// The integer a text starts with, zero if it does not start with one.
fn leading_integer(text: &str) -> i64 {
    let unsigned = text.trim_start_matches(['+', '-']);
    let digits = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .map_or(unsigned, |end| &unsigned[..end]);
    digits.parse().unwrap_or(0)
}
