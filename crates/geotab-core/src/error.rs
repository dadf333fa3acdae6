//! Error types for geotab-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in geotab-core
///
/// Loading, schema and persistence errors are fatal for a run. The rest are
/// raised while handling a single row and are contained by the processor.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse CSV
    #[error("failed to parse CSV '{path}': {message}")]
    CsvParse { path: PathBuf, message: String },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Spreadsheet could not be opened or read
    #[error("spreadsheet error in '{path}': {source}")]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    /// Spreadsheet has no sheet or no header row
    #[error("no worksheet data found in '{path}'")]
    EmptySheet { path: PathBuf },

    /// A required column is missing from the input table
    #[error("required column '{column}' not found in '{path}'")]
    MissingColumn { column: String, path: PathBuf },

    /// A required cell is empty in the current row
    #[error("row has no value for '{column}'")]
    MissingField { column: String },

    /// The address has no tokens to tag
    #[error("address is empty")]
    EmptyAddress,

    /// A component label occurs in two separate places of one address
    #[error("label {label} repeated in '{address}'")]
    RepeatedLabel { label: String, address: String },

    /// HTTP transport or status error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A well-formed JSON response that lacks a field we need
    #[error("malformed geocoding response: {0}")]
    MalformedResponse(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
