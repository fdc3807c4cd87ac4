use std::fmt;

use tracing::warn;

use super::attribute::AttributeCode;
use super::row::PublicationNumber;

/// Non-fatal conditions raised while assembling records. None of these stop a
/// batch; they exist so that lossy decisions stay observable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    Cardinality {
        publication_number: PublicationNumber,
        attribute: AttributeCode,
        value_count: usize,
    },
    MarkupConversion {
        publication_number: PublicationNumber,
        attribute: AttributeCode,
        reason: String,
    },
    OutOfOrderKey {
        previous: PublicationNumber,
        next: PublicationNumber,
    },
    FieldCollision {
        publication_number: PublicationNumber,
        attribute: AttributeCode,
        field: String,
    },
}

impl Diagnostic {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cardinality { .. } => "cardinality",
            Self::MarkupConversion { .. } => "markup_conversion",
            Self::OutOfOrderKey { .. } => "out_of_order_key",
            Self::FieldCollision { .. } => "field_collision",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cardinality {
                publication_number,
                attribute,
                value_count,
            } => write!(
                f,
                "{publication_number}: {attribute} has {value_count} values; only the first value was kept"
            ),
            Self::MarkupConversion {
                publication_number,
                attribute,
                reason,
            } => write!(
                f,
                "{publication_number}: {attribute} markup could not be converted ({reason}); raw text kept"
            ),
            Self::OutOfOrderKey { previous, next } => write!(
                f,
                "{next} follows {previous}; input is not sorted by publication number"
            ),
            Self::FieldCollision {
                publication_number,
                attribute,
                field,
            } => write!(
                f,
                "{publication_number}: {attribute} maps to field {field:?} already used by another code; its values were dropped"
            ),
        }
    }
}

pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Forwards every diagnostic to the log and keeps per-kind counts plus the
/// first few messages for run manifests.
#[derive(Debug, Default)]
pub struct TracingSink {
    source: String,
    message_limit: usize,
    pub cardinality_count: usize,
    pub markup_count: usize,
    pub out_of_order_count: usize,
    pub collision_count: usize,
    pub messages: Vec<String>,
}

impl TracingSink {
    pub fn new(source: impl Into<String>, message_limit: usize) -> Self {
        Self {
            source: source.into(),
            message_limit,
            ..Self::default()
        }
    }
}

impl DiagnosticSink for TracingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        warn!(
            source = %self.source,
            kind = diagnostic.kind(),
            "{diagnostic}"
        );

        match diagnostic {
            Diagnostic::Cardinality { .. } => self.cardinality_count += 1,
            Diagnostic::MarkupConversion { .. } => self.markup_count += 1,
            Diagnostic::OutOfOrderKey { .. } => self.out_of_order_count += 1,
            Diagnostic::FieldCollision { .. } => self.collision_count += 1,
        }

        if self.messages.len() < self.message_limit {
            self.messages.push(format!("{}: {diagnostic}", self.source));
        }
    }
}
