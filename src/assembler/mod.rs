mod attribute;
mod diagnostics;
mod flatten;
mod group;
mod markup;
mod pivot;
mod record;
mod row;

pub use attribute::{AttributeCode, Cardinality};
pub use diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
pub use group::{GroupError, InputLines, StreamGrouper};
pub use record::{AssemblerOptions, RecordAssembler};
pub use row::PublicationNumber;

#[cfg(test)]
use attribute::normalize_name;
#[cfg(test)]
use flatten::{AttributeValue, flatten};
#[cfg(test)]
use group::PatentBatch;
#[cfg(test)]
use markup::{MarkupConverter, MarkupError};
#[cfg(test)]
use pivot::pivot;
#[cfg(test)]
use record::PatentRecord;
#[cfg(test)]
use row::{RawLine, publication_number_of};
