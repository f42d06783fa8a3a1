//! Store error types
//!
//! Error codes:
//! - STORE_UNAVAILABLE (ERROR)
//! - STORE_IO_ERROR (ERROR)
//! - STORE_ENCODING_ERROR (ERROR)
//! - STORE_BATCH_ABORTED (ERROR)
//! - STORE_DATA_CORRUPTION (FATAL)
//! - STORE_JOURNAL_POISONED (FATAL)

use std::io;

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Document store failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend cannot be reached
    #[error("document store unavailable")]
    Unavailable,

    /// Disk I/O failure
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Journal content failed checksum or framing checks
    #[error("data corruption at offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    /// Document could not be encoded or decoded
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A failed append could not be rolled back; the journal refuses
    /// further writes
    #[error("journal unrecoverable: {reason}")]
    Poisoned { reason: String },

    /// Batch rejected part-way; nothing was committed
    #[error("batch aborted after {applied} of {total} writes; nothing committed")]
    BatchAborted { applied: usize, total: usize },
}

impl StoreError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Unavailable => "STORE_UNAVAILABLE",
            StoreError::Io { .. } => "STORE_IO_ERROR",
            StoreError::Corruption { .. } => "STORE_DATA_CORRUPTION",
            StoreError::Encoding(_) => "STORE_ENCODING_ERROR",
            StoreError::BatchAborted { .. } => "STORE_BATCH_ABORTED",
            StoreError::Poisoned { .. } => "STORE_JOURNAL_POISONED",
        }
    }

    /// The journal cannot be trusted; the process must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::Corruption { .. } | StoreError::Poisoned { .. }
        )
    }
}
