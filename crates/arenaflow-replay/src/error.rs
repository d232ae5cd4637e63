//! Error types for recording.

/// Errors from the recorder, the sinks and the record parser.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// Writing the record failed. Frames in memory are untouched.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("recorder is already capturing")]
    AlreadyCapturing,

    /// The record text doesn't follow the format. `line` is 1-based.
    #[error("malformed record at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}
