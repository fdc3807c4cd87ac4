use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::assembler::{AttributeCode, Cardinality};
use crate::cli::ValidateArgs;
use crate::model::{ValidatedFile, ValidationReport};
use crate::util::{expand_inputs, now_utc_string, write_json_pretty};

const VIOLATION_SAMPLE_LIMIT: usize = 20;

pub fn run(args: ValidateArgs) -> Result<()> {
    let normalize_names = args.naming.normalize_names;
    let inputs = expand_inputs(&args.paths, "jsonl")?;
    if inputs.is_empty() {
        bail!("no serialized files found in {:?}", args.paths);
    }

    let mut files = Vec::with_capacity(inputs.len());
    for input in &inputs {
        let file = validate_file(input, normalize_names)?;
        info!(
            path = %file.path,
            documents = file.documents,
            invalid = file.invalid,
            "validated file"
        );
        files.push(file);
    }

    let report = ValidationReport {
        manifest_version: 1,
        generated_at: now_utc_string(),
        normalize_names,
        documents: files.iter().map(|file| file.documents).sum(),
        invalid: files.iter().map(|file| file.invalid).sum(),
        files,
    };

    if let Some(report_path) = args.report_path.as_ref() {
        write_json_pretty(report_path, &report)?;
        info!(path = %report_path.display(), "wrote validation report");
    }

    info!(
        documents = report.documents,
        invalid = report.invalid,
        "validation completed"
    );

    if args.strict && report.invalid > 0 {
        bail!(
            "{} of {} documents violate the output contract",
            report.invalid,
            report.documents
        );
    }

    Ok(())
}

fn validate_file(path: &Path, normalize_names: bool) -> Result<ValidatedFile> {
    let reader = File::open(path)
        .map(BufReader::new)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut file = ValidatedFile {
        path: path.display().to_string(),
        ..ValidatedFile::default()
    };

    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }

        let line_number = index + 1;
        file.documents += 1;

        let violations = match serde_json::from_str::<Value>(&line) {
            Ok(document) => check_document(&document, normalize_names),
            Err(err) => vec![format!("invalid json: {err}")],
        };

        if violations.is_empty() {
            file.valid += 1;
            continue;
        }

        file.invalid += 1;
        for violation in violations {
            warn!(path = %file.path, line = line_number, "{violation}");
            if file.violations.len() < VIOLATION_SAMPLE_LIMIT {
                file.violations.push(format!("line {line_number}: {violation}"));
            }
        }
    }

    Ok(file)
}

/// Checks one serialized document against the output contract and returns
/// every violation found.
pub fn check_document(document: &Value, normalize_names: bool) -> Vec<String> {
    let Some(object) = document.as_object() else {
        return vec!["document is not a JSON object".to_string()];
    };

    let mut violations = Vec::new();

    match object.get("publication_number") {
        Some(Value::String(_)) => {}
        Some(_) => violations.push("publication_number is not a string".to_string()),
        None => violations.push("publication_number is missing".to_string()),
    }

    match object.get("publication_date") {
        Some(Value::String(date)) => {
            if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
                violations.push(format!("publication_date {date:?} is not YYYY-MM-DD"));
            }
        }
        Some(_) => violations.push("publication_date is not a string".to_string()),
        None => violations.push("publication_date is missing".to_string()),
    }

    for (name, value) in object {
        if name == "publication_number" || name == "publication_date" {
            continue;
        }

        let code = AttributeCode::from_field_name(name, normalize_names);
        if let Err(violation) = check_attribute(value, code.cardinality()) {
            violations.push(format!("{name}: {violation}"));
        }
    }

    violations
}

fn check_attribute(value: &Value, cardinality: Cardinality) -> Result<(), String> {
    let object = value
        .as_object()
        .ok_or_else(|| "expected an object with language and text".to_string())?;

    match cardinality {
        Cardinality::ScalarExpected => {
            expect_string(object, "language")?;
            expect_string(object, "text")
        }
        Cardinality::MultiValued => {
            let languages = expect_string_array(object, "language")?;
            let texts = expect_string_array(object, "text")?;
            if languages != texts {
                return Err(format!(
                    "language has {languages} entries but text has {texts}"
                ));
            }
            Ok(())
        }
    }
}

fn expect_string(object: &Map<String, Value>, key: &str) -> Result<(), String> {
    match object.get(key) {
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(format!("{key} should be a string")),
        None => Err(format!("{key} is missing")),
    }
}

fn expect_string_array(object: &Map<String, Value>, key: &str) -> Result<usize, String> {
    match object.get(key) {
        Some(Value::Array(items)) if items.iter().all(Value::is_string) => Ok(items.len()),
        Some(Value::Array(_)) => Err(format!("{key} should only contain strings")),
        Some(_) => Err(format!("{key} should be an array")),
        None => Err(format!("{key} is missing")),
    }
}
