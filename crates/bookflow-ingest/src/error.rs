/// Error types for stream ingestion
use std::io;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors that can occur while setting up or driving a parse.
///
/// The parsers themselves are tolerant by design: malformed markup, bad
/// encodings and short reads degrade the event stream instead of failing.
/// Errors are reserved for conditions the caller has to decide about.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Charset autodetection could not run or produced nothing
    #[error("Encoding detection failed: {0}")]
    EncodingDetection(String),

    /// Input does not look like the format this parser handles
    #[error("Format not recognized: {0}")]
    FormatMismatch(String),

    /// Standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
