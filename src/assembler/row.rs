use std::fmt;

use serde::Serialize;
use thiserror::Error;

const FIELD_SEPARATOR: char = '\t';
const KEY_SEPARATOR: &str = "-";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{publication_number}: expected 7 tab-separated fields, found {field_count} in row {row:?}")]
pub struct StructuralError {
    pub publication_number: PublicationNumber,
    pub field_count: usize,
    pub row: Vec<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{publication_number}: line is not valid UTF-8 (first bad byte at offset {valid_up_to})")]
pub struct EncodingError {
    pub publication_number: PublicationNumber,
    pub valid_up_to: usize,
}

impl EncodingError {
    pub fn from_bytes(bytes: &[u8], valid_up_to: usize) -> Self {
        Self {
            publication_number: publication_number_of(&String::from_utf8_lossy(bytes)),
            valid_up_to,
        }
    }
}

/// Grouping key derived from `authority-serial-kind`, e.g. `EP-0700059-A1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PublicationNumber(String);

impl PublicationNumber {
    pub fn from_parts(authority: &str, serial: &str, kind: &str) -> Self {
        Self([authority, serial, kind].join(KEY_SEPARATOR))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicationNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the bulk corpus: one attribute value of one publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub authority: String,
    pub serial: String,
    pub kind: String,
    pub publication_date: String,
    pub language: String,
    pub attribute_code: String,
    pub text: String,
}

impl RawLine {
    /// Splits one input line and checks its arity before anything downstream
    /// trusts it.
    pub fn parse(line: &str) -> Result<Self, StructuralError> {
        let fields: Vec<&str> = strip_line_terminator(line)
            .split(FIELD_SEPARATOR)
            .collect();

        match fields.as_slice() {
            [
                authority,
                serial,
                kind,
                publication_date,
                language,
                attribute_code,
                text,
            ] => Ok(Self {
                authority: (*authority).to_string(),
                serial: (*serial).to_string(),
                kind: (*kind).to_string(),
                publication_date: (*publication_date).to_string(),
                language: (*language).to_string(),
                attribute_code: (*attribute_code).to_string(),
                text: (*text).to_string(),
            }),
            _ => Err(StructuralError {
                publication_number: publication_number_of(line),
                field_count: fields.len(),
                row: fields.iter().map(|field| (*field).to_string()).collect(),
            }),
        }
    }

    pub fn publication_number(&self) -> PublicationNumber {
        PublicationNumber::from_parts(&self.authority, &self.serial, &self.kind)
    }

    pub fn to_line(&self) -> String {
        [
            self.authority.as_str(),
            self.serial.as_str(),
            self.kind.as_str(),
            self.publication_date.as_str(),
            self.language.as_str(),
            self.attribute_code.as_str(),
            self.text.as_str(),
        ]
        .join("\t")
    }
}

/// Key of a raw, unparsed line. Never fails: a short line still yields a
/// hyphen-joined key from whatever leading fields it has.
pub fn publication_number_of(line: &str) -> PublicationNumber {
    let key = strip_line_terminator(line)
        .split(FIELD_SEPARATOR)
        .take(3)
        .collect::<Vec<&str>>()
        .join(KEY_SEPARATOR);
    PublicationNumber(key)
}

fn strip_line_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
