//! Error types for the media library

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::quality_search::Attempt;

/// Errors produced while probing, planning, encoding or editing media
#[derive(Error, Debug)]
pub enum MediaError {
    /// The prober could not read the file or returned malformed output
    #[error("Could not probe {path}: {message}")]
    Probe { path: PathBuf, message: String },

    /// The file decoded but contains no video stream
    #[error("No video stream found in {0}")]
    NoVideoStream(PathBuf),

    /// The file has zero width, height or duration
    #[error("Invalid media: {0}")]
    InvalidMedia(String),

    /// A caller-supplied parameter is out of range or unknown
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// One external tool invocation failed, timed out or could not start
    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },

    /// Every quality level errored before producing an artifact
    #[error("Every encode attempt failed ({} attempted)", .attempts.len())]
    EncodeFailed { attempts: Vec<Attempt> },

    /// Every quality level produced an artifact above the ceiling
    #[error("Could not meet {} KB limit", .ceiling_bytes / 1024)]
    SizeCeilingUnsatisfiable {
        ceiling_bytes: u64,
        attempts: Vec<Attempt>,
    },

    /// An external tool ran past its time limit and was killed
    #[error("{tool} timed out after {after:?}")]
    Timeout { tool: String, after: Duration },

    /// The encoder or prober executable cannot be located
    #[error("{0} not found")]
    ToolUnavailable(String),

    /// Filesystem error around artifacts
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

}

/// The user-visible class of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The upload or a parameter is unusable
    InvalidInput,
    /// ffmpeg/ffprobe are missing on this host
    ToolUnavailable,
    /// The conversion ran but no acceptable output was produced
    ConstraintUnmet,
    /// Anything else
    Internal,
}

impl MediaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MediaError::Probe { .. }
            | MediaError::NoVideoStream(_)
            | MediaError::InvalidMedia(_)
            | MediaError::InvalidParameter(_) => ErrorKind::InvalidInput,
            MediaError::ToolUnavailable(_) => ErrorKind::ToolUnavailable,
            MediaError::Tool { .. }
            | MediaError::EncodeFailed { .. }
            | MediaError::SizeCeilingUnsatisfiable { .. } => ErrorKind::ConstraintUnmet,
            MediaError::Io(_) | MediaError::Timeout { .. } => ErrorKind::Internal,
        }
    }

    /// Attempt trace carried by search failures, empty otherwise
    pub fn attempts(&self) -> &[Attempt] {
        match self {
            MediaError::EncodeFailed { attempts }
            | MediaError::SizeCeilingUnsatisfiable { attempts, .. } => attempts,
            _ => &[],
        }
    }
}

/// Type alias for Result with MediaError
pub type MediaResult<T> = Result<T, MediaError>;
