//! Configuration error types

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration: {message}")]
    Parse { message: String },

    #[error("missing required configuration key {key}")]
    Missing { key: String },

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(error: serde_yaml::Error) -> Self {
        // serde_yaml reports absent fields as "SECTION: missing field `KEY` at line .."
        const MARKER: &str = "missing field `";
        let message = error.to_string();
        if let Some(start) = message.find(MARKER) {
            let rest = &message[start + MARKER.len()..];
            if let Some((field, _)) = rest.split_once('`') {
                let section = message[..start].trim().trim_end_matches(':').trim();
                let key = if section.is_empty() {
                    field.to_string()
                } else {
                    format!("{section}.{field}")
                };
                return ConfigError::Missing { key };
            }
        }
        ConfigError::Parse { message }
    }
}

impl crate::core::error_handling::ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<String> {
        Some(self.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
