use anyhow::Result;
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::attribute::AttributeCode;
use super::diagnostics::{Diagnostic, DiagnosticSink};
use super::flatten::{AttributeValue, FlatAttribute, flatten};
use super::group::PatentBatch;
use super::markup::MarkupConverter;
use super::pivot::pivot;
use super::row::PublicationNumber;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct AssemblerOptions {
    pub normalize_names: bool,
    pub handle_markup: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordField {
    pub name: String,
    pub value: AttributeValue,
}

/// One self-contained publication, serialized as a single JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatentRecord {
    pub publication_number: PublicationNumber,
    pub publication_date: String,
    pub fields: Vec<RecordField>,
}

impl PatentRecord {
    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }
}

impl Serialize for PatentRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 2))?;
        map.serialize_entry("publication_number", &self.publication_number)?;
        map.serialize_entry("publication_date", &self.publication_date)?;
        for field in &self.fields {
            map.serialize_entry(&field.name, &field.value)?;
        }
        map.end()
    }
}

pub struct RecordAssembler {
    options: AssemblerOptions,
    markup: Option<MarkupConverter>,
}

impl RecordAssembler {
    pub fn new(options: AssemblerOptions) -> Result<Self> {
        let markup = if options.handle_markup {
            Some(MarkupConverter::new()?)
        } else {
            None
        };
        Ok(Self { options, markup })
    }

    /// Pivots, flattens and normalizes one batch. Always returns a complete
    /// record; anything lossy along the way is reported to `sink`.
    pub fn assemble(&self, batch: PatentBatch, sink: &mut dyn DiagnosticSink) -> PatentRecord {
        let pivoted = pivot(batch);
        let publication_number = pivoted.publication_number.clone();
        let publication_date = pivoted.publication_date.clone();

        let mut fields: Vec<RecordField> = Vec::new();
        let mut codes: Vec<AttributeCode> = Vec::new();
        for FlatAttribute { code, mut value } in flatten(pivoted, sink) {
            if let Some(converter) = &self.markup {
                convert_texts(converter, &publication_number, &code, &mut value, sink);
            }

            let name = code.field_name(self.options.normalize_names);
            let Some(position) = fields.iter().position(|field| field.name == name) else {
                codes.push(code);
                fields.push(RecordField { name, value });
                continue;
            };

            // A classified code owns its field name over a raw code that
            // happens to normalize to the same key.
            let dropped = if code.is_classified() && !codes[position].is_classified() {
                fields[position].value = value;
                std::mem::replace(&mut codes[position], code)
            } else {
                code
            };
            sink.report(Diagnostic::FieldCollision {
                publication_number: publication_number.clone(),
                attribute: dropped,
                field: name,
            });
        }

        PatentRecord {
            publication_number,
            publication_date,
            fields,
        }
    }
}

fn convert_texts(
    converter: &MarkupConverter,
    publication_number: &PublicationNumber,
    code: &AttributeCode,
    value: &mut AttributeValue,
    sink: &mut dyn DiagnosticSink,
) {
    for text in value.texts_mut() {
        match converter.convert(text) {
            Ok(plain) => *text = plain,
            Err(err) => sink.report(Diagnostic::MarkupConversion {
                publication_number: publication_number.clone(),
                attribute: code.clone(),
                reason: err.to_string(),
            }),
        }
    }
}
