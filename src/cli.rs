use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "parseepo",
    version,
    about = "Serialize the EPO full-text bulk corpus into one JSON document per patent"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Turn tab-delimited EPO full-text files into JSONL, one patent per line.
    Serialize(SerializeArgs),
    /// Write the BigQuery schema matching serialized output.
    Schema(SchemaArgs),
    /// Check serialized JSONL files against the output document contract.
    Validate(ValidateArgs),
    /// Copy the first patents of a full-text file into a smaller sample.
    Sample(SampleArgs),
}

#[derive(Args, Debug, Clone, Copy, Default)]
pub struct NamingArgs {
    /// Use BigQuery patents naming (abstract, claims, url, ...) for attribute keys.
    #[arg(long, default_value_t = false)]
    pub normalize_names: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SerializeArgs {
    /// Input files or directories of `*.txt` files.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Write outputs here instead of next to each input.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 4)]
    pub max_workers: usize,

    /// Log a milestone every 10000 serialized patents.
    #[arg(long, default_value_t = false)]
    pub verbose: bool,

    #[command(flatten)]
    pub naming: NamingArgs,

    /// Convert embedded markup in text values to plain text.
    #[arg(long, default_value_t = false)]
    pub handle_markup: bool,

    #[arg(long, value_enum, default_value_t = MalformedPolicy::Skip)]
    pub on_malformed: MalformedPolicy,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum MalformedPolicy {
    Skip,
    Abort,
}

impl MalformedPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Abort => "abort",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    /// Destination of the schema JSON file.
    pub dest: PathBuf,

    #[command(flatten)]
    pub naming: NamingArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Serialized files or directories of `*.jsonl` files.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    #[command(flatten)]
    pub naming: NamingArgs,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    /// Fail when any document violates the contract.
    #[arg(long, default_value_t = false)]
    pub strict: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SampleArgs {
    pub input: PathBuf,

    pub output: PathBuf,

    #[arg(long, default_value_t = 100)]
    pub patents: usize,
}
