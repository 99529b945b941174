//! I/O error types for concord-io.

use std::path::PathBuf;

/// Errors from file I/O, CSV/JSON parsing, and report serialization.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a JSON input cannot be parsed.
    #[error("JSON parse error in {path}")]
    JsonParse {
        /// Path to the JSON file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when a file has a header but zero data rows, or a JSON
    /// array is empty.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the input file.
        path: PathBuf,
    },

    /// Returned when the CSV has only the key column.
    #[error("no feature columns in {path}: header has only the key column")]
    NoFeatureColumns {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} ({key}) has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Key cell (label or id) of the offending row.
        key: String,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a cell value is NaN, Inf, or otherwise not a finite float.
    #[error("non-finite value in {path}: row {row_index}, column {col_index}, raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Zero-based column index (excluding the key column).
        col_index: usize,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when the same row id appears more than once.
    #[error("duplicate id \"{id}\" in {path}: first at row {first_row}, again at row {second_row}")]
    DuplicateId {
        /// Path to the CSV file.
        path: PathBuf,
        /// The duplicated id.
        id: String,
        /// Zero-based row index of the first occurrence.
        first_row: usize,
        /// Zero-based row index of the second occurrence.
        second_row: usize,
    },

    /// Returned when a training row carries a label outside the class set.
    #[error("unknown class label \"{label}\" in {path} at row {row_index}; known classes: {known}")]
    UnknownLabel {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// The unrecognized label.
        label: String,
        /// Comma-separated known class names.
        known: String,
    },

    /// Returned when a class list is empty, too short, or repeats a name.
    #[error("invalid class list: {reason}")]
    InvalidClassList {
        /// What is wrong with the list.
        reason: String,
    },

    /// Returned when inference columns differ from the training columns.
    #[error("feature columns in {path} do not match the model: expected {expected:?}, got {got:?}")]
    FeatureMismatch {
        /// Path to the inference CSV.
        path: PathBuf,
        /// Training feature names.
        expected: Vec<String>,
        /// Feature names found in the file.
        got: Vec<String>,
    },

    /// Returned when the run name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid run name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidRunName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a report cannot be rendered as JSON.
    #[error("cannot serialize report for {path}")]
    Serialize {
        /// Destination path of the report.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
