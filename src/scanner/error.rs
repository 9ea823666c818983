//! Scanner Error Types

use crate::core::error_handling::ContextualError;
use crate::search::SearchError;
use std::path::PathBuf;

/// Scanner error types
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Search request failed
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Spool file could not be read or written
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Spooled chunk does not exist
    #[error("chunk {chunk} of slice {slice} has not been spooled ({})", path.display())]
    MissingChunk {
        slice: u32,
        chunk: usize,
        path: PathBuf,
    },

    /// Invalid slice addressing
    #[error("slice {slice} is outside 0..{max}")]
    SliceOutOfRange { slice: u32, max: u32 },
}

impl ScanError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScanError::Io {
            path: path.into(),
            source,
        }
    }
}

impl ContextualError for ScanError {
    fn is_user_actionable(&self) -> bool {
        match self {
            ScanError::Search(error) => error.is_user_actionable(),
            ScanError::MissingChunk { .. } => true, // Run the batch first
            ScanError::SliceOutOfRange { .. } => true,
            ScanError::Io { .. } => false,
        }
    }

    fn user_message(&self) -> Option<String> {
        self.is_user_actionable().then(|| self.to_string())
    }
}

pub type ScanResult<T> = Result<T, ScanError>;
