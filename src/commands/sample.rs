use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::assembler::{InputLines, StreamGrouper};
use crate::cli::SampleArgs;
use crate::util::ensure_parent_directory;

pub fn run(args: SampleArgs) -> Result<()> {
    let reader = File::open(&args.input)
        .map(BufReader::new)
        .with_context(|| format!("failed to open {}", args.input.display()))?;

    ensure_parent_directory(&args.output)?;
    let mut writer = File::create(&args.output)
        .map(BufWriter::new)
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    let source = args.input.display().to_string();
    let (patents, lines) = copy_patents(reader, &mut writer, args.patents, &source)?;
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", args.output.display()))?;

    info!(
        input = %source,
        output = %args.output.display(),
        patents,
        lines,
        "wrote sample"
    );

    Ok(())
}

/// Copies whole patent batches until `limit` patents have been written.
/// Reading stops as soon as the last wanted batch is out.
fn copy_patents<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    limit: usize,
    source: &str,
) -> Result<(usize, usize)> {
    let mut patents = 0;
    let mut lines = 0;
    if limit == 0 {
        return Ok((patents, lines));
    }

    for item in StreamGrouper::new(InputLines::new(reader)) {
        let batch = match item {
            Ok(batch) => batch,
            Err(err) if err.is_line_error() => {
                warn!(source = %source, error = %err, "skipped malformed line");
                continue;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {source}"));
            }
        };

        for row in batch.rows() {
            writeln!(writer, "{}", row.to_line())
                .with_context(|| format!("failed to write sample row from {source}"))?;
        }
        lines += batch.len();
        patents += 1;
        if patents == limit {
            break;
        }
    }

    Ok((patents, lines))
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor, Read};

    use super::*;

    const INPUT: &str = "\
EP\t0000001\tA1\t2001-01-01\ten\tTITLE\tfirst
EP\t0000001\tA1\t2001-01-01\tde\tTITLE\terste
EP\t0000002\tA1\t2001-01-01\ten\tTITLE\tsecond
EP\t0000002\tA1\t2001-01-01\ten\tABSTR
EP\t0000003\tA1\t2001-01-01\ten\tTITLE\tthird
";

    #[test]
    fn copy_patents_stops_after_limit_with_whole_batches() {
        let mut output = Vec::new();
        let (patents, lines) =
            copy_patents(Cursor::new(INPUT), &mut output, 2, "memory").expect("sample copies");

        assert_eq!(patents, 2);
        assert_eq!(lines, 3);
        let text = String::from_utf8(output).expect("utf-8");
        assert_eq!(
            text,
            "EP\t0000001\tA1\t2001-01-01\ten\tTITLE\tfirst\n\
             EP\t0000001\tA1\t2001-01-01\tde\tTITLE\terste\n\
             EP\t0000002\tA1\t2001-01-01\ten\tTITLE\tsecond\n"
        );
    }

    #[test]
    fn copy_patents_with_zero_limit_writes_nothing() {
        let mut output = Vec::new();
        let (patents, _) =
            copy_patents(Cursor::new(INPUT), &mut output, 0, "memory").expect("sample copies");
        assert_eq!(patents, 0);
        assert!(output.is_empty());
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device went away"))
        }
    }

    #[test]
    fn copy_patents_does_not_read_past_the_last_wanted_batch() {
        let head = "\
EP\t0000001\tA1\t2001-01-01\ten\tTITLE\tfirst
EP\t0000002\tA1\t2001-01-01\ten\tTITLE\tsecond
";
        let reader = BufReader::new(Cursor::new(head).chain(FailingReader));
        let mut output = Vec::new();
        let (patents, lines) =
            copy_patents(reader, &mut output, 1, "memory").expect("limit reached before failure");

        assert_eq!(patents, 1);
        assert_eq!(lines, 1);
    }

    #[test]
    fn copy_patents_fails_on_read_error_before_limit() {
        let reader = BufReader::new(Cursor::new(INPUT).chain(FailingReader));
        let mut output = Vec::new();
        let err = copy_patents(reader, &mut output, 10, "memory")
            .expect_err("read error should surface");
        assert!(format!("{err:#}").contains("device went away"));
    }

    #[test]
    fn run_writes_sample_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("EP0600000.txt");
        let output = dir.path().join("samples").join("sampleEP0600000.txt");
        std::fs::write(&input, INPUT).expect("write input");

        run(SampleArgs {
            input,
            output: output.clone(),
            patents: 10,
        })
        .expect("sample run should succeed");

        let written = std::fs::read_to_string(&output).expect("read sample");
        assert_eq!(written.lines().count(), 4);
    }
}
