use std::path::PathBuf;

use thiserror::Error;

/// Errors from resolving a record to media bytes.
#[derive(Error, Debug)]
pub enum MediaError {
    /// The referenced media file does not exist
    #[error("media file not found: {0}")]
    Missing(PathBuf),

    /// Every fallback frame failed to extract
    #[error("could not extract any frame from {file} (tried frames {attempts:?})")]
    Unreadable { file: PathBuf, attempts: Vec<u32> },

    /// The extraction tool itself failed to run
    #[error("frame extraction failed: {0}")]
    Extraction(String),

    #[error("media io error: {0}")]
    Io(#[from] std::io::Error),
}
