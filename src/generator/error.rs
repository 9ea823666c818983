//! Generator error types

use crate::core::error_handling::ContextualError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("collection description directory {} does not exist", path.display())]
    MissingRoot { path: PathBuf },

    #[error("invalid description search pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed collection description {}: {message}", path.display())]
    Description { path: PathBuf, message: String },
}

impl ContextualError for GeneratorError {
    fn is_user_actionable(&self) -> bool {
        !matches!(self, GeneratorError::Io { .. })
    }

    fn user_message(&self) -> Option<String> {
        self.is_user_actionable().then(|| self.to_string())
    }
}

pub type GeneratorResult<T> = Result<T, GeneratorError>;
