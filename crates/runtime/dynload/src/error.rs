//! Error types for the reference wire formats.

/// Malformed raw unit or image.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("bad magic")]
    BadMagic,

    #[error("truncated {0}")]
    Truncated(&'static str),

    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),

    #[error("{0} too long")]
    TooLong(&'static str),

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("trailing bytes after image body")]
    TrailingBytes,
}
