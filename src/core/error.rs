// Error handling for the droplet view core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DropletError>;

#[derive(Error, Debug)]
pub enum DropletError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(String),

    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("Invalid magic bytes: expected {expected:?}, got {got:?}")]
    InvalidMagic { expected: Vec<u8>, got: Vec<u8> },

    #[error("Unsupported capture: {0}")]
    UnsupportedCapture(String),

    #[error("Corrupted data: {0}")]
    CorruptedData(String),

    #[error("Log scale domain must be strictly positive, got [{min}, {max}]")]
    InvalidLogDomain { min: f64, max: f64 },

    #[error("Empty zoom domain: [{0}, {1}]")]
    EmptyDomain(f64, f64),

    #[error("Field not plotted: {0}")]
    UnknownField(String),

    #[error("Record not found: {0}")]
    UnknownRecord(usize),

    #[error("Stream not found: {0}")]
    UnknownStream(String),

    #[error("Malformed stream key: {0}")]
    MalformedStreamKey(String),

    #[error("Malformed view query: {0}")]
    MalformedQuery(String),
}
