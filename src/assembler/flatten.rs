use serde::Serialize;

use super::attribute::{AttributeCode, Cardinality};
use super::diagnostics::{Diagnostic, DiagnosticSink};
use super::pivot::{AggregatedAttribute, PivotedBatch};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Scalar { language: String, text: String },
    Multi { language: Vec<String>, text: Vec<String> },
}

impl AttributeValue {
    pub fn texts_mut(&mut self) -> Vec<&mut String> {
        match self {
            Self::Scalar { text, .. } => vec![text],
            Self::Multi { text, .. } => text.iter_mut().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatAttribute {
    pub code: AttributeCode,
    pub value: AttributeValue,
}

/// Decides each attribute's shape from its classification. Scalar-expected
/// attributes with several values keep the first one and report the loss.
pub fn flatten(pivoted: PivotedBatch, sink: &mut dyn DiagnosticSink) -> Vec<FlatAttribute> {
    let PivotedBatch {
        publication_number,
        attributes,
        ..
    } = pivoted;

    attributes
        .into_iter()
        .filter_map(|attribute| {
            let value_count = attribute.len();
            if value_count > 1 && attribute.code.cardinality() == Cardinality::ScalarExpected {
                sink.report(Diagnostic::Cardinality {
                    publication_number: publication_number.clone(),
                    attribute: attribute.code.clone(),
                    value_count,
                });
            }
            flatten_attribute(attribute)
        })
        .collect()
}

fn flatten_attribute(attribute: AggregatedAttribute) -> Option<FlatAttribute> {
    let AggregatedAttribute {
        code,
        languages,
        texts,
    } = attribute;

    let value = match code.cardinality() {
        Cardinality::MultiValued => {
            if texts.is_empty() {
                return None;
            }
            AttributeValue::Multi {
                language: languages,
                text: texts,
            }
        }
        Cardinality::ScalarExpected => {
            let language = languages.into_iter().next()?;
            let text = texts.into_iter().next()?;
            AttributeValue::Scalar { language, text }
        }
    };

    Some(FlatAttribute { code, value })
}
