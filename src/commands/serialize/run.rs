use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rayon::prelude::*;
use tracing::{error, info};

use super::pipeline::{output_path_for, serialize_file};
use crate::assembler::{AssemblerOptions, RecordAssembler};
use crate::cli::SerializeArgs;
use crate::model::{SerializeCounts, SerializeOptions, SerializeRunManifest, SerializedFile};
use crate::util::{expand_inputs, now_utc_string, sha256_file, utc_compact_string, write_json_pretty};

pub fn run(args: SerializeArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let inputs = expand_inputs(&args.paths, "txt")?;
    if inputs.is_empty() {
        bail!("no input files found in {:?}", args.paths);
    }

    let options = AssemblerOptions {
        normalize_names: args.naming.normalize_names,
        handle_markup: args.handle_markup,
    };
    let assembler = RecordAssembler::new(options)?;
    let max_workers = args.max_workers.max(1);

    info!(
        run_id = %run_id,
        files = inputs.len(),
        max_workers,
        normalize_names = options.normalize_names,
        handle_markup = options.handle_markup,
        "starting serialize"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers)
        .build()
        .context("failed to build serialize worker pool")?;

    let hash_inputs = args.manifest_path.is_some();
    let files: Vec<SerializedFile> = pool.install(|| {
        inputs
            .par_iter()
            .map(|input| serialize_one(input, &args, &assembler, hash_inputs))
            .collect()
    });

    let mut totals = SerializeCounts::default();
    for file in &files {
        totals.add(&file.counts);
    }
    let failed_file_count = files.iter().filter(|file| file.error.is_some()).count();

    if let Some(manifest_path) = args.manifest_path.as_ref() {
        let manifest = SerializeRunManifest {
            manifest_version: 1,
            run_id: run_id.clone(),
            status: if failed_file_count == 0 {
                "completed".to_string()
            } else {
                "failed".to_string()
            },
            started_at,
            updated_at: now_utc_string(),
            options: SerializeOptions {
                normalize_names: options.normalize_names,
                handle_markup: options.handle_markup,
                on_malformed: args.on_malformed.as_str().to_string(),
                max_workers,
            },
            file_count: files.len(),
            failed_file_count,
            totals: totals.clone(),
            files,
        };
        write_json_pretty(manifest_path, &manifest)?;
        info!(path = %manifest_path.display(), "wrote serialize run manifest");
    }

    info!(
        run_id = %run_id,
        patents = totals.patents_written,
        lines = totals.lines_read,
        malformed = totals.malformed_lines,
        cardinality_warnings = totals.cardinality_warnings,
        markup_warnings = totals.markup_warnings,
        out_of_order_keys = totals.out_of_order_keys,
        field_collisions = totals.field_collisions,
        "serialize completed"
    );

    if failed_file_count > 0 {
        bail!("{failed_file_count} input file(s) failed to serialize");
    }

    Ok(())
}

fn serialize_one(
    input: &Path,
    args: &SerializeArgs,
    assembler: &RecordAssembler,
    hash_input: bool,
) -> SerializedFile {
    let output: PathBuf = output_path_for(input, args.output_dir.as_deref());
    info!(input = %input.display(), output = %output.display(), "serializing file");

    let input_sha256 = if hash_input {
        sha256_file(input).ok()
    } else {
        None
    };

    let outcome = serialize_file(input, &output, assembler, args.on_malformed, args.verbose);
    let (status, error, counts, warnings) = match outcome {
        Ok((counts, warnings)) => {
            info!(
                input = %input.display(),
                patents = counts.patents_written,
                "file serialized"
            );
            ("completed", None, counts, warnings)
        }
        Err(err) => {
            let message = format!("{err:#}");
            error!(input = %input.display(), error = %message, "file failed");
            (
                "failed",
                Some(message),
                SerializeCounts::default(),
                Vec::new(),
            )
        }
    };

    SerializedFile {
        input_path: input.display().to_string(),
        input_sha256,
        output_path: output.display().to_string(),
        status: status.to_string(),
        error,
        counts,
        warnings,
    }
}
