//! Custom error types for the common library

use std::path::PathBuf;
use thiserror::Error;

/// Custom error type for scratch storage operations
#[derive(Error, Debug)]
pub enum ScratchError {
    /// The scratch directory could not be created
    #[error("Failed to create scratch directory {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file name that would escape the scratch directory
    #[error("Invalid scratch file name: {0}")]
    InvalidName(String),

    /// Any other filesystem failure
    #[error("Scratch storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Result with ScratchError
pub type ScratchResult<T> = Result<T, ScratchError>;
