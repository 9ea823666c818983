//! Stocktake error types

use crate::config::ConfigError;
use crate::core::error_handling::ContextualError;
use crate::generator::GeneratorError;
use crate::messaging::MessagingError;
use crate::output::OutputError;
use crate::scanner::ScanError;
use crate::search::SearchError;

#[derive(Debug, thiserror::Error)]
pub enum StocktakeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error("checkpoint {location}: {message}")]
    Checkpoint { location: String, message: String },

    #[error("stocktake interrupted")]
    Interrupted,

    #[error("{} of {total} slices failed: {}", failures.len(), failures.join("; "))]
    SlicesFailed { total: usize, failures: Vec<String> },
}

impl StocktakeError {
    pub(crate) fn checkpoint(location: impl Into<String>, message: impl ToString) -> Self {
        StocktakeError::Checkpoint {
            location: location.into(),
            message: message.to_string(),
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, StocktakeError::Interrupted)
    }
}

impl ContextualError for StocktakeError {
    fn is_user_actionable(&self) -> bool {
        match self {
            StocktakeError::Config(e) => e.is_user_actionable(),
            StocktakeError::Search(e) => e.is_user_actionable(),
            StocktakeError::Scan(e) => e.is_user_actionable(),
            StocktakeError::Generator(e) => e.is_user_actionable(),
            StocktakeError::Output(e) => e.is_user_actionable(),
            StocktakeError::Messaging(e) => e.is_user_actionable(),
            StocktakeError::Checkpoint { .. } => false,
            StocktakeError::Interrupted => true,
            StocktakeError::SlicesFailed { .. } => true,
        }
    }

    fn user_message(&self) -> Option<String> {
        self.is_user_actionable().then(|| self.to_string())
    }
}

pub type StocktakeResult<T> = Result<T, StocktakeError>;
