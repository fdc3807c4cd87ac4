use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use super::pipeline::*;
use super::run;
use crate::assembler::{AssemblerOptions, RecordAssembler, TracingSink};
use crate::cli::{MalformedPolicy, NamingArgs, SerializeArgs};
use crate::model::SerializeRunManifest;

const SAMPLE: &str = "\
EP\t0700059\tA1\t1996-03-06\tde\tTITLE\tElektroma...
EP\t0700059\tA1\t1996-03-06\ten\tTITLE\tElectroma...
EP\t0700059\tA1\t1996-03-06\ten\tABSTR\tA device...
EP\t0700060\tB1\t1996-03-06\ten\tABSTR\tFirst
EP\t0700060\tB1\t1996-03-06\tfr\tABSTR\tSecond
";

fn settings(policy: MalformedPolicy) -> StreamSettings<'static> {
    StreamSettings {
        source: "memory",
        policy,
        milestone_interval: Some(2),
    }
}

fn run_stream(
    input: &str,
    options: AssemblerOptions,
    policy: MalformedPolicy,
) -> (anyhow::Result<crate::model::SerializeCounts>, Vec<String>, TracingSink) {
    run_stream_bytes(input.as_bytes(), options, policy)
}

fn run_stream_bytes(
    input: &[u8],
    options: AssemblerOptions,
    policy: MalformedPolicy,
) -> (anyhow::Result<crate::model::SerializeCounts>, Vec<String>, TracingSink) {
    let assembler = RecordAssembler::new(options).expect("assembler should build");
    let mut output = Vec::new();
    let mut sink = TracingSink::new("memory", WARNING_MESSAGE_LIMIT);
    let counts = serialize_stream(
        Cursor::new(input),
        &mut output,
        &assembler,
        &settings(policy),
        &mut sink,
    );
    let lines = String::from_utf8(output)
        .expect("output should be UTF-8")
        .lines()
        .map(ToOwned::to_owned)
        .collect();
    (counts, lines, sink)
}

fn serialize_args(paths: Vec<PathBuf>, output_dir: Option<PathBuf>) -> SerializeArgs {
    SerializeArgs {
        paths,
        output_dir,
        max_workers: 2,
        verbose: false,
        naming: NamingArgs::default(),
        handle_markup: false,
        on_malformed: MalformedPolicy::Skip,
        manifest_path: None,
    }
}

#[test]
fn serialize_stream_writes_one_document_per_patent() {
    let (counts, lines, sink) =
        run_stream(SAMPLE, AssemblerOptions::default(), MalformedPolicy::Skip);
    let counts = counts.expect("stream should serialize");

    assert_eq!(counts.lines_read, 5);
    assert_eq!(counts.patents_written, 2);
    assert_eq!(counts.cardinality_warnings, 1);
    assert_eq!(sink.cardinality_count, 1);
    assert_eq!(lines.len(), 2);

    let first: serde_json::Value = serde_json::from_str(&lines[0]).expect("valid json");
    assert_eq!(first["publication_number"], "EP-0700059-A1");
    assert_eq!(first["TITLE"]["language"], serde_json::json!(["de", "en"]));

    let second: serde_json::Value = serde_json::from_str(&lines[1]).expect("valid json");
    assert_eq!(second["ABSTR"], serde_json::json!({"language": "en", "text": "First"}));
}

#[test]
fn serialize_stream_keeps_non_ascii_text_unescaped() {
    let input = "EP\t1\tA1\t2001-01-01\tde\tTITLE\tVorrichtung für Blätter\n";
    let (counts, lines, _) = run_stream(input, AssemblerOptions::default(), MalformedPolicy::Skip);
    counts.expect("stream should serialize");
    assert!(lines[0].contains("Vorrichtung für Blätter"));
}

#[test]
fn serialize_stream_skips_malformed_lines_by_default() {
    let input = format!("{SAMPLE}EP\t0700061\tA1\t1996-03-06\ten\tTITLE\n");
    let (counts, lines, _) = run_stream(&input, AssemblerOptions::default(), MalformedPolicy::Skip);
    let counts = counts.expect("skip policy should not fail");

    assert_eq!(counts.malformed_lines, 1);
    assert_eq!(counts.lines_read, 6);
    assert_eq!(counts.patents_written, 2);
    assert_eq!(lines.len(), 2);
}

#[test]
fn serialize_stream_aborts_on_malformed_line_when_asked() {
    let input = "EP\t1\tA1\t2001-01-01\ten\tTITLE\n";
    let (counts, lines, _) =
        run_stream(input, AssemblerOptions::default(), MalformedPolicy::Abort);

    let err = counts.expect_err("abort policy should fail");
    assert!(format!("{err:#}").contains("expected 7 tab-separated fields"));
    assert!(lines.is_empty());
}

const MIXED_ENCODING: &[u8] = b"EP\t0000001\tA1\t2001-01-01\ten\tTITLE\tone\n\
EP\t0000002\tA1\t2001-01-01\ten\tTITLE\tbad \xff byte\n\
EP\t0000003\tA1\t2001-01-01\ten\tTITLE\tthree\n";

#[test]
fn serialize_stream_skips_invalid_utf8_line_and_keeps_neighbours() {
    let (counts, lines, _) =
        run_stream_bytes(MIXED_ENCODING, AssemblerOptions::default(), MalformedPolicy::Skip);
    let counts = counts.expect("an undecodable line should not end the file");

    assert_eq!(counts.malformed_lines, 1);
    assert_eq!(counts.lines_read, 3);
    assert_eq!(counts.patents_written, 2);
    let first: serde_json::Value = serde_json::from_str(&lines[0]).expect("valid json");
    let second: serde_json::Value = serde_json::from_str(&lines[1]).expect("valid json");
    assert_eq!(first["publication_number"], "EP-0000001-A1");
    assert_eq!(second["publication_number"], "EP-0000003-A1");
}

#[test]
fn serialize_stream_aborts_on_invalid_utf8_when_asked() {
    let (counts, lines, _) =
        run_stream_bytes(MIXED_ENCODING, AssemblerOptions::default(), MalformedPolicy::Abort);

    let err = counts.expect_err("abort policy should fail");
    assert!(format!("{err:#}").contains("EP-0000002-A1: line is not valid UTF-8"));
    assert!(lines.is_empty());
}

#[test]
fn serialize_stream_reports_colliding_field_names() {
    let input = "\
EP\t0000001\tA1\t2001-01-01\ten\ttitle\traw lowercase
EP\t0000001\tA1\t2001-01-01\ten\tTITLE\tclassified
";
    let options = AssemblerOptions {
        normalize_names: true,
        ..AssemblerOptions::default()
    };
    let (counts, lines, sink) = run_stream(input, options, MalformedPolicy::Skip);
    let counts = counts.expect("collisions are not fatal");

    assert_eq!(counts.field_collisions, 1);
    assert_eq!(sink.collision_count, 1);
    assert_eq!(lines[0].matches("\"title\"").count(), 1);
    let document: serde_json::Value = serde_json::from_str(&lines[0]).expect("valid json");
    assert_eq!(document["title"]["text"], serde_json::json!(["classified"]));
}

#[test]
fn milestones_fall_on_interval_multiples() {
    assert!(at_milestone(10_000, Some(MILESTONE_INTERVAL)));
    assert!(!at_milestone(9_999, Some(MILESTONE_INTERVAL)));
    assert!(at_milestone(4, Some(2)));
    assert!(!at_milestone(3, Some(2)));
    assert!(!at_milestone(4, None));
    assert!(!at_milestone(4, Some(0)));
}

#[test]
fn serialize_stream_passes_milestones_without_disturbing_output() {
    let input = "\
EP\t0000001\tA1\t2001-01-01\ten\tTITLE\ta
EP\t0000002\tA1\t2001-01-01\ten\tTITLE\tb
EP\t0000003\tA1\t2001-01-01\ten\tTITLE\tc
EP\t0000004\tA1\t2001-01-01\ten\tTITLE\td
";
    let (counts, lines, _) = run_stream(input, AssemblerOptions::default(), MalformedPolicy::Skip);
    let counts = counts.expect("stream should serialize");
    assert_eq!(counts.patents_written, 4);
    assert_eq!(lines.len(), 4);
}

#[test]
fn serialize_stream_reports_keys_that_go_backwards() {
    let input = "\
EP\t0000002\tA1\t2001-01-01\ten\tTITLE\tb
EP\t0000001\tA1\t2001-01-01\ten\tTITLE\ta
";
    let (counts, lines, sink) =
        run_stream(input, AssemblerOptions::default(), MalformedPolicy::Skip);
    let counts = counts.expect("out-of-order input still serializes");

    assert_eq!(counts.out_of_order_keys, 1);
    assert_eq!(sink.out_of_order_count, 1);
    assert_eq!(lines.len(), 2);
}

#[test]
fn serialize_stream_of_empty_input_writes_nothing() {
    let (counts, lines, _) = run_stream("", AssemblerOptions::default(), MalformedPolicy::Skip);
    let counts = counts.expect("empty input is fine");
    assert_eq!(counts.patents_written, 0);
    assert!(lines.is_empty());
}

#[test]
fn output_path_replaces_extension_and_honors_output_dir() {
    assert_eq!(
        output_path_for(Path::new("data/EP0600000.txt"), None),
        PathBuf::from("data/EP0600000.jsonl")
    );
    assert_eq!(
        output_path_for(Path::new("data/EP0600000.txt"), Some(Path::new("out"))),
        PathBuf::from("out/EP0600000.jsonl")
    );
}

#[test]
fn serialize_file_refuses_to_overwrite_input() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("already.jsonl");
    fs::write(&input, SAMPLE).expect("write input");

    let assembler = RecordAssembler::new(AssemblerOptions::default()).expect("assembler");
    let output = output_path_for(&input, None);
    let err = serialize_file(&input, &output, &assembler, MalformedPolicy::Skip, false)
        .expect_err("same input and output should fail");
    assert!(err.to_string().contains("would overwrite input"));
}

#[test]
fn run_serializes_directory_and_writes_manifest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let inputs = dir.path().join("in");
    fs::create_dir_all(&inputs).expect("create input dir");
    fs::write(inputs.join("a.txt"), SAMPLE).expect("write a");
    fs::write(
        inputs.join("b.txt"),
        "EP\t0900001\tA2\t1999-01-01\ten\tPDFEP\thttps://data.epo.org/b.pdf\n",
    )
    .expect("write b");
    fs::write(inputs.join("ignored.csv"), "not an input").expect("write csv");

    let out = dir.path().join("out");
    let manifest_path = dir.path().join("manifests").join("serialize.json");
    let mut args = serialize_args(vec![inputs], Some(out.clone()));
    args.manifest_path = Some(manifest_path.clone());
    args.naming.normalize_names = true;

    run(args).expect("serialize run should succeed");

    let b = fs::read_to_string(out.join("b.jsonl")).expect("read b output");
    let document: serde_json::Value = serde_json::from_str(b.trim()).expect("valid json");
    assert_eq!(document["url"]["text"], "https://data.epo.org/b.pdf");
    assert!(!out.join("ignored.jsonl").exists());

    let raw = fs::read(&manifest_path).expect("read manifest");
    let manifest: SerializeRunManifest = serde_json::from_slice(&raw).expect("parse manifest");
    assert_eq!(manifest.status, "completed");
    assert_eq!(manifest.file_count, 2);
    assert_eq!(manifest.totals.patents_written, 3);
    assert_eq!(manifest.totals.cardinality_warnings, 1);
    assert!(manifest.options.normalize_names);
    assert!(manifest.files.iter().all(|file| file.input_sha256.is_some()));
}

#[test]
fn run_fails_when_a_file_fails_but_finishes_the_others() {
    let dir = tempfile::tempdir().expect("tempdir");
    let good = dir.path().join("good.txt");
    let bad = dir.path().join("bad.txt");
    fs::write(&good, SAMPLE).expect("write good");
    fs::write(&bad, "EP\t1\tA1\n").expect("write bad");

    let mut args = serialize_args(vec![good, bad], None);
    args.on_malformed = MalformedPolicy::Abort;

    let err = run(args).expect_err("aborted file should fail the run");
    assert!(err.to_string().contains("1 input file(s) failed"));
    assert!(dir.path().join("good.jsonl").exists());
}
