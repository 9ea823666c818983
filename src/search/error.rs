//! Search error types

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("failed to build Elasticsearch client: {message}")]
    Client { message: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Elasticsearch returned {status} for {url}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("unexpected Elasticsearch response: {message}")]
    Response { message: String },

    #[error("point in time {pit_id} is unknown or expired")]
    PitNotFound { pit_id: String },
}

impl SearchError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SearchError::Transport { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            SearchError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub(crate) fn response(message: impl Into<String>) -> Self {
        SearchError::Response {
            message: message.into(),
        }
    }
}

impl crate::core::error_handling::ContextualError for SearchError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, SearchError::Client { .. } | SearchError::PitNotFound { .. })
    }

    fn user_message(&self) -> Option<String> {
        self.is_user_actionable().then(|| self.to_string())
    }
}

pub type SearchResult<T> = Result<T, SearchError>;
