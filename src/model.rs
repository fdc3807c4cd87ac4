use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializeCounts {
    pub lines_read: usize,
    pub patents_written: usize,
    pub malformed_lines: usize,
    pub cardinality_warnings: usize,
    pub markup_warnings: usize,
    pub out_of_order_keys: usize,
    pub field_collisions: usize,
}

impl SerializeCounts {
    pub fn add(&mut self, other: &SerializeCounts) {
        self.lines_read += other.lines_read;
        self.patents_written += other.patents_written;
        self.malformed_lines += other.malformed_lines;
        self.cardinality_warnings += other.cardinality_warnings;
        self.markup_warnings += other.markup_warnings;
        self.out_of_order_keys += other.out_of_order_keys;
        self.field_collisions += other.field_collisions;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializeOptions {
    pub normalize_names: bool,
    pub handle_markup: bool,
    pub on_malformed: String,
    pub max_workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedFile {
    pub input_path: String,
    pub input_sha256: Option<String>,
    pub output_path: String,
    pub status: String,
    pub error: Option<String>,
    pub counts: SerializeCounts,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializeRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub options: SerializeOptions,
    pub file_count: usize,
    pub failed_file_count: usize,
    pub totals: SerializeCounts,
    pub files: Vec<SerializedFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatedFile {
    pub path: String,
    pub documents: usize,
    pub valid: usize,
    pub invalid: usize,
    pub violations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub manifest_version: u32,
    pub generated_at: String,
    pub normalize_names: bool,
    pub documents: usize,
    pub invalid: usize,
    pub files: Vec<ValidatedFile>,
}
