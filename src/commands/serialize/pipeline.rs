use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::assembler::{
    Diagnostic, DiagnosticSink, InputLines, PublicationNumber, RecordAssembler, StreamGrouper,
    TracingSink,
};
use crate::cli::MalformedPolicy;
use crate::model::SerializeCounts;
use crate::util::ensure_parent_directory;

pub(super) const MILESTONE_INTERVAL: usize = 10_000;
pub(super) const WARNING_MESSAGE_LIMIT: usize = 20;

pub(super) struct StreamSettings<'a> {
    pub source: &'a str,
    pub policy: MalformedPolicy,
    /// Log progress every this many patents; `None` keeps quiet.
    pub milestone_interval: Option<usize>,
}

pub(super) fn at_milestone(patents_written: usize, interval: Option<usize>) -> bool {
    matches!(interval, Some(interval) if interval > 0 && patents_written % interval == 0)
}

/// Runs one input stream through grouping and assembly, writing one JSON
/// document per line. Single pass; only the batch being assembled is held.
pub(super) fn serialize_stream<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    assembler: &RecordAssembler,
    settings: &StreamSettings<'_>,
    sink: &mut TracingSink,
) -> Result<SerializeCounts> {
    let mut counts = SerializeCounts::default();
    let mut previous_key: Option<PublicationNumber> = None;

    for item in StreamGrouper::new(InputLines::new(reader)) {
        let batch = match item {
            Ok(batch) => batch,
            Err(err) if err.is_line_error() => {
                counts.lines_read += 1;
                counts.malformed_lines += 1;
                if settings.policy == MalformedPolicy::Abort {
                    return Err(err).with_context(|| {
                        format!("malformed line in {} (on-malformed=abort)", settings.source)
                    });
                }
                warn!(source = %settings.source, error = %err, "skipped malformed line");
                continue;
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read line from {}", settings.source));
            }
        };

        counts.lines_read += batch.len();

        let key = batch.publication_number().clone();
        if let Some(previous) = previous_key.as_ref() {
            if key < *previous {
                sink.report(Diagnostic::OutOfOrderKey {
                    previous: previous.clone(),
                    next: key.clone(),
                });
            }
        }
        previous_key = Some(key);

        let record = assembler.assemble(batch, sink);
        serde_json::to_writer(&mut *writer, &record).with_context(|| {
            format!(
                "failed to write {} from {}",
                record.publication_number, settings.source
            )
        })?;
        writer
            .write_all(b"\n")
            .with_context(|| format!("failed to write output for {}", settings.source))?;

        counts.patents_written += 1;
        if at_milestone(counts.patents_written, settings.milestone_interval) {
            info!(
                source = %settings.source,
                patents = counts.patents_written,
                "serialization milestone"
            );
        }
    }

    counts.cardinality_warnings = sink.cardinality_count;
    counts.markup_warnings = sink.markup_count;
    counts.out_of_order_keys = sink.out_of_order_count;
    counts.field_collisions = sink.collision_count;

    Ok(counts)
}

pub(super) fn serialize_file(
    input: &Path,
    output: &Path,
    assembler: &RecordAssembler,
    policy: MalformedPolicy,
    verbose: bool,
) -> Result<(SerializeCounts, Vec<String>)> {
    if input == output {
        bail!(
            "output path would overwrite input: {} (expected a .txt input)",
            input.display()
        );
    }

    let source = input.display().to_string();
    let reader = File::open(input)
        .map(BufReader::new)
        .with_context(|| format!("failed to open {}", input.display()))?;

    ensure_parent_directory(output)?;
    let mut writer = File::create(output)
        .map(BufWriter::new)
        .with_context(|| format!("failed to create {}", output.display()))?;

    let settings = StreamSettings {
        source: &source,
        policy,
        milestone_interval: verbose.then_some(MILESTONE_INTERVAL),
    };
    let mut sink = TracingSink::new(source.as_str(), WARNING_MESSAGE_LIMIT);
    let counts = serialize_stream(reader, &mut writer, assembler, &settings, &mut sink)?;

    writer
        .flush()
        .with_context(|| format!("failed to flush {}", output.display()))?;

    Ok((counts, sink.messages))
}

/// `<stem>.jsonl` next to the input, or under `output_dir` when given.
pub(super) fn output_path_for(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let renamed = input.with_extension("jsonl");
    match (output_dir, renamed.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => renamed,
    }
}
