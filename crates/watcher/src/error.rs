//! Error types for watch registration.

use thiserror::Error;

/// Result type alias for watch operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Numeric error codes published to the host.
///
/// Values match the ones scripts already compare against, so they must not
/// change. `-6` is unused.
#[repr(i64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    FileNotFound = -1,
    FileRepeated = -2,
    FileOutOfScope = -3,
    FileNotReadable = -4,
    FileRemote = -5,
    Unspecified = -7,
}

impl ErrorCode {
    /// Raw numeric value.
    pub const fn get(self) -> i64 {
        self as i64
    }

    /// Parse a raw numeric value.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -1 => Some(Self::FileNotFound),
            -2 => Some(Self::FileRepeated),
            -3 => Some(Self::FileOutOfScope),
            -4 => Some(Self::FileNotReadable),
            -5 => Some(Self::FileRemote),
            -7 => Some(Self::Unspecified),
            _ => None,
        }
    }
}

/// Errors that can occur when establishing a watch.
#[derive(Error, Debug)]
pub enum WatchError {
    /// Path could not be resolved, or the directory does not exist.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Directory is already watched by the backend.
    #[error("directory already watched: {0}")]
    FileRepeated(String),

    /// Relative path climbs out of its root.
    #[error("path is outside its root: {0}")]
    FileOutOfScope(String),

    /// Directory exists but cannot be read.
    #[error("directory not readable: {0}")]
    FileNotReadable(String),

    /// Directory lives on a remote filesystem the backend cannot watch.
    #[error("directory is on a remote filesystem: {0}")]
    FileRemote(String),

    /// Any other backend failure.
    #[error("watch failed: {0}")]
    Unspecified(String),
}

impl WatchError {
    /// Host-facing numeric code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::FileNotFound(_) => ErrorCode::FileNotFound,
            Self::FileRepeated(_) => ErrorCode::FileRepeated,
            Self::FileOutOfScope(_) => ErrorCode::FileOutOfScope,
            Self::FileNotReadable(_) => ErrorCode::FileNotReadable,
            Self::FileRemote(_) => ErrorCode::FileRemote,
            Self::Unspecified(_) => ErrorCode::Unspecified,
        }
    }
}
