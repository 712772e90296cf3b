//! Error types module
//!
//! All per-item processing failures are unified under [`ProcessError`]. Every
//! variant is terminal for the item it belongs to; none of them aborts the
//! queue as a whole. Input-file rejection happens before an item exists and
//! has its own error type in the processing crate's validator.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected noise like stale protocol messages
    Debug,
    /// Warning level - for per-item failures caused by the input
    Warn,
    /// Error level - for unexpected failures in the worker machinery
    Error,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProcessError {
    /// Source bytes could not be decoded as an image.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Invalid resize/crop parameters (zero-area source, non-positive target).
    /// Should not occur with validated settings; surfaced per item, never a panic.
    #[error("Invalid geometry: {0}")]
    Geometry(String),

    /// The encoder rejected the pixel buffer or failed internally.
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// A response arrived for an id with no matching in-flight request.
    /// Dropped silently by the coordinator; never shown to the user.
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// The worker task died before producing a terminal response.
    #[error("Worker failure: {0}")]
    Worker(String),
}

impl ProcessError {
    /// Log level the queue uses when recording this error.
    pub fn log_level(&self) -> LogLevel {
        match self {
            ProcessError::Protocol(_) => LogLevel::Debug,
            ProcessError::Decode(_) | ProcessError::Geometry(_) | ProcessError::Encode(_) => {
                LogLevel::Warn
            }
            ProcessError::Worker(_) => LogLevel::Error,
        }
    }

    /// Short machine-readable code, used in structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            ProcessError::Decode(_) => "DECODE_ERROR",
            ProcessError::Geometry(_) => "GEOMETRY_ERROR",
            ProcessError::Encode(_) => "ENCODE_ERROR",
            ProcessError::Protocol(_) => "PROTOCOL_ERROR",
            ProcessError::Worker(_) => "WORKER_ERROR",
        }
    }
}
