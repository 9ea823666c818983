//! Messaging error types

use crate::core::error_handling::ContextualError;

#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("failed to connect to RabbitMQ at {endpoint}: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: lapin::Error,
    },

    #[error("RabbitMQ {operation} on exchange '{exchange}' failed: {source}")]
    Amqp {
        operation: &'static str,
        exchange: String,
        #[source]
        source: lapin::Error,
    },

    #[error("RabbitMQ rejected message for exchange '{exchange}' with routing key '{routing_key}'")]
    Nacked {
        exchange: String,
        routing_key: String,
    },

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },
}

impl ContextualError for MessagingError {
    fn is_user_actionable(&self) -> bool {
        false
    }

    fn user_message(&self) -> Option<String> {
        None
    }
}

pub type MessagingResult<T> = Result<T, MessagingError>;
