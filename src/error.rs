//! Collector error types

use thiserror::Error;

/// Errors surfaced by the collector's reader and configuration APIs
///
/// A full buffer is not an error: `SampleBuffer::record` reports it through
/// its `bool` return value.
#[derive(Error, Debug)]
pub enum CollectorError {
    /// No profile has been aggregated for this operation (or it was evicted)
    #[error("Operation profile not found: {operation}")]
    ProfileNotFound { operation: String },

    #[error("Invalid collector configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse collector configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Producer threads of a stress run panicked; their samples are missing
    #[error("{failed} of {total} producer threads panicked")]
    ProducerPanicked { failed: usize, total: usize },
}

impl CollectorError {
    /// Operation name carried by a `ProfileNotFound` error
    pub fn operation(&self) -> Option<&str> {
        match self {
            CollectorError::ProfileNotFound { operation } => Some(operation),
            _ => None,
        }
    }

    /// True if this is the "no data yet" condition rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, CollectorError::ProfileNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, CollectorError>;
