use std::io::{self, BufRead};

use thiserror::Error;

use super::row::{EncodingError, PublicationNumber, RawLine, StructuralError};

#[derive(Debug, Error)]
pub enum GroupError {
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("failed to read input line")]
    Io(#[from] io::Error),
}

impl GroupError {
    /// Errors confined to a single line; the stream stays readable after them.
    pub fn is_line_error(&self) -> bool {
        matches!(self, Self::Structural(_) | Self::Encoding(_))
    }
}

/// Byte-level line reader. A line that is not valid UTF-8 comes out as its
/// own `Encoding` error and reading continues with the next line.
pub struct InputLines<R> {
    reader: R,
}

impl<R: BufRead> InputLines<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> Iterator for InputLines<R> {
    type Item = Result<String, GroupError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut bytes = Vec::new();
        match self.reader.read_until(b'\n', &mut bytes) {
            Ok(0) => None,
            Ok(_) => Some(String::from_utf8(bytes).map_err(|err| {
                let valid_up_to = err.utf8_error().valid_up_to();
                GroupError::from(EncodingError::from_bytes(err.as_bytes(), valid_up_to))
            })),
            Err(err) => Some(Err(GroupError::Io(err))),
        }
    }
}

/// Contiguous rows of one publication. Never empty: the grouper only opens a
/// batch when it has a row to put in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatentBatch {
    publication_number: PublicationNumber,
    publication_date: String,
    rows: Vec<RawLine>,
}

impl PatentBatch {
    fn open(publication_number: PublicationNumber, first: RawLine) -> Self {
        Self {
            publication_number,
            publication_date: first.publication_date.clone(),
            rows: vec![first],
        }
    }

    pub fn publication_number(&self) -> &PublicationNumber {
        &self.publication_number
    }

    pub fn publication_date(&self) -> &str {
        &self.publication_date
    }

    pub fn rows(&self) -> &[RawLine] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<RawLine> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Turns an ordered line stream into patent batches by watching for key
/// changes. Input must arrive in contiguous runs per publication number; a
/// key that reappears later opens a second, separate batch.
///
/// Malformed lines come out as `Err` items and never join a batch, so the
/// caller can skip them and keep iterating or stop.
pub struct StreamGrouper<I> {
    lines: I,
    current: Option<PatentBatch>,
    exhausted: bool,
}

impl<I, E> StreamGrouper<I>
where
    I: Iterator<Item = Result<String, E>>,
    E: Into<GroupError>,
{
    pub fn new(lines: I) -> Self {
        Self {
            lines,
            current: None,
            exhausted: false,
        }
    }
}

impl<I, E> Iterator for StreamGrouper<I>
where
    I: Iterator<Item = Result<String, E>>,
    E: Into<GroupError>,
{
    type Item = Result<PatentBatch, GroupError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(err)) => return Some(Err(err.into())),
                None => {
                    self.exhausted = true;
                    // end-of-stream flush
                    return self.current.take().map(Ok);
                }
            };

            let row = match RawLine::parse(&line) {
                Ok(row) => row,
                Err(err) => return Some(Err(GroupError::Structural(err))),
            };

            let next_key = row.publication_number();
            if let Some(batch) = self.current.as_mut() {
                if batch.publication_number == next_key {
                    batch.rows.push(row);
                    continue;
                }
            }

            let completed = self.current.replace(PatentBatch::open(next_key, row));
            if completed.is_some() {
                return completed.map(Ok);
            }
        }
    }
}
