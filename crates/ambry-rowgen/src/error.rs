//! Error types for row generation and header intuition.

use thiserror::Error;

/// Result type for row generation operations
pub type Result<T> = std::result::Result<T, RowGenError>;

/// Boxed error returned by a failing header mangler
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while reading, positioning or intuiting rows
#[derive(Debug, Error)]
pub enum RowGenError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Failed to open workbook
    #[error("Failed to open workbook: {0}")]
    WorkbookOpen(String),

    /// Sheet (segment) not found in workbook
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// The delimited dialect could not be determined from the sample
    #[error("Could not determine delimiter: {0}")]
    Dialect(String),

    /// Unknown text encoding label
    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    /// Header/data ranges contradict each other
    #[error("Invalid row spec: {0}")]
    InvalidSpec(String),

    /// The intuiter sampled no rows at all
    #[error("Cannot intuit row spec from an empty source")]
    EmptySample,

    /// A row source produced rows without advancing its line counter
    #[error("Row source did not advance its line number after {0} rows")]
    Stalled(usize),

    /// The configured header mangler failed
    #[error("Header mangler failed: {0}")]
    Mangler(#[source] BoxError),

    /// Settings could not be parsed
    #[error("Invalid settings: {0}")]
    Settings(#[from] toml::de::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Calamine error
    #[error("Excel error: {0}")]
    Calamine(String),
}

impl From<calamine::Error> for RowGenError {
    fn from(err: calamine::Error) -> Self {
        RowGenError::Calamine(err.to_string())
    }
}

impl From<calamine::XlsxError> for RowGenError {
    fn from(err: calamine::XlsxError) -> Self {
        RowGenError::Calamine(err.to_string())
    }
}

impl From<calamine::XlsError> for RowGenError {
    fn from(err: calamine::XlsError) -> Self {
        RowGenError::Calamine(err.to_string())
    }
}
