//! Descriptive records: the small XML documents embedded in header,
//! channel info and event definition chunks.
//!
//! We only need a flat view of them. A document has one root element,
//! that root either carries text itself or a list of records. A record
//! is a list of `<Field>value</Field>` children.

use std::str::FromStr;

use xmltree::{Element, XMLNode};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Descriptive record is empty, expected root element <{expected}>")]
    MissingRootElement { expected: &'static str },
    #[error("Expected root element <{expected}> but found <{found}>")]
    WrongRootElement {
        expected: &'static str,
        found: String,
    },
    #[error("Could not parse descriptive record: {0}")]
    Xml(xmltree::ParseError),
    #[error("Descriptive record is missing field {0}")]
    MissingField(&'static str),
    #[error("Field {field} holds {value:?} which is not a valid number")]
    InvalidNumber { field: &'static str, value: String },
    #[error("Field {field} holds {value:?}, only True or False are allowed")]
    InvalidBool { field: &'static str, value: String },
    #[error("Field {field} holds unsupported value {value:?}")]
    UnsupportedFieldValue { field: &'static str, value: String },
}

/// Parse a document and check it has the root the chunk kind demands.
pub fn parse(text: &[u8], expected_root: &'static str) -> Result<Element, Error> {
    if text.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::MissingRootElement {
            expected: expected_root,
        });
    }

    let root = Element::parse(text).map_err(Error::Xml)?;
    if root.name != expected_root {
        return Err(Error::WrongRootElement {
            expected: expected_root,
            found: root.name,
        });
    }
    Ok(root)
}

/// Text content of an element, empty if it has none.
pub fn text(element: &Element) -> String {
    element
        .get_text()
        .map(|text| text.trim().to_owned())
        .unwrap_or_default()
}

/// The child elements of `parent`, one per repeated sub record.
pub fn repeated(parent: &Element) -> impl Iterator<Item = &Element> {
    parent.children.iter().filter_map(XMLNode::as_element)
}

/// Field name to value mapping for one record, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn from_element(element: &Element) -> Self {
        Self {
            fields: repeated(element)
                .map(|field| (field.name.clone(), text(field)))
                .collect(),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Names are matched case sensitive. If a field is repeated the last
    /// occurrence wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn required(&self, name: &'static str) -> Result<&str, Error> {
        self.get(name).ok_or(Error::MissingField(name))
    }

    pub fn text_or_default(&self, name: &str) -> String {
        self.get(name).map(str::to_owned).unwrap_or_default()
    }

    pub fn number<T: FromStr>(&self, name: &'static str) -> Result<Option<T>, Error> {
        self.get(name).map(|value| parse_number(name, value)).transpose()
    }

    pub fn required_number<T: FromStr>(&self, name: &'static str) -> Result<T, Error> {
        parse_number(name, self.required(name)?)
    }

    pub fn boolean(&self, name: &'static str) -> Result<Option<bool>, Error> {
        self.get(name).map(|value| parse_bool(name, value)).transpose()
    }
}

pub fn parse_number<T: FromStr>(field: &'static str, value: &str) -> Result<T, Error> {
    value.trim().parse().map_err(|_| Error::InvalidNumber {
        field,
        value: value.to_owned(),
    })
}

/// Only the exact strings `True` and `False` are accepted.
pub fn parse_bool(field: &'static str, value: &str) -> Result<bool, Error> {
    match value {
        "True" => Ok(true),
        "False" => Ok(false),
        other => Err(Error::InvalidBool {
            field,
            value: other.to_owned(),
        }),
    }
}
