//! Output error types

use crate::config::OutputMethod;
use crate::core::error_handling::ContextualError;
use crate::messaging::MessagingError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("output {method} needs a filepath")]
    MissingFilepath { method: OutputMethod },

    #[error("output rabbit_mq needs a RABBIT section")]
    MissingPublisher,

    #[error("output {name} was written before it was opened")]
    NotOpen { name: String },

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode asset: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Publish(#[from] MessagingError),

    #[error("{} of {total} output sinks failed: {}", failures.len(), failures.join("; "))]
    Fanout { total: usize, failures: Vec<String> },
}

impl ContextualError for OutputError {
    fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            OutputError::MissingFilepath { .. } | OutputError::MissingPublisher
        )
    }

    fn user_message(&self) -> Option<String> {
        self.is_user_actionable().then(|| self.to_string())
    }
}

pub type OutputResult<T> = Result<T, OutputError>;
