use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::assembler::{AttributeCode, Cardinality};
use crate::cli::SchemaArgs;
use crate::util::write_json_pretty;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: &'static str,
    pub mode: &'static str,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<SchemaField>,
}

impl SchemaField {
    fn leaf(name: &str, field_type: &'static str, mode: &'static str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            mode,
            description: description.to_string(),
            fields: Vec::new(),
        }
    }
}

pub fn run(args: SchemaArgs) -> Result<()> {
    let schema = build_schema(args.naming.normalize_names);
    write_json_pretty(&args.dest, &schema)?;

    info!(
        path = %args.dest.display(),
        fields = schema.len(),
        normalize_names = args.naming.normalize_names,
        "wrote BigQuery schema"
    );

    Ok(())
}

/// BigQuery description of serialized documents. Names and repeated/nullable
/// modes come from the same classification the assembler uses.
pub fn build_schema(normalize_names: bool) -> Vec<SchemaField> {
    let mut schema = vec![
        SchemaField::leaf(
            "publication_number",
            "STRING",
            "NULLABLE",
            "DOCDB publication number",
        ),
        SchemaField::leaf(
            "publication_date",
            "DATE",
            "NULLABLE",
            "Publication date of the EP patent",
        ),
    ];

    schema.extend(
        AttributeCode::KNOWN
            .iter()
            .map(|code| attribute_field(code, normalize_names)),
    );

    schema
}

fn attribute_field(code: &AttributeCode, normalize_names: bool) -> SchemaField {
    let mode = match code.cardinality() {
        Cardinality::MultiValued => "REPEATED",
        Cardinality::ScalarExpected => "NULLABLE",
    };
    let description = code.description();

    SchemaField {
        name: code.field_name(normalize_names),
        field_type: "RECORD",
        mode: "NULLABLE",
        description: description.to_string(),
        fields: vec![
            SchemaField::leaf("language", "STRING", mode, &format!("{description}: language")),
            SchemaField::leaf("text", "STRING", mode, &format!("{description}: localized text")),
        ],
    }
}
