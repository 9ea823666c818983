//! Shared error reporting
//!
//! Errors from every layer of the stocktake implement [`ContextualError`] so the
//! CLI can decide whether to show the error itself or a generic description of
//! the operation that failed.

/// Errors that know whether their message is meaningful to an operator
///
/// When `is_user_actionable()` returns `true`, `user_message()` must return
/// `Some(message)`; otherwise it returns `None`.
///
/// User-actionable examples: missing configuration keys, malformed collection
/// descriptions, an unknown slice id. System examples: Elasticsearch timeouts,
/// broker connection failures, IO errors.
pub trait ContextualError: std::error::Error {
    /// True when the message should be shown to the operator as-is
    fn is_user_actionable(&self) -> bool;

    /// The message to show for user-actionable errors
    fn user_message(&self) -> Option<String>;
}

/// Log a fatal error with the amount of detail its kind deserves
///
/// User-actionable errors log their own message. System errors log the
/// operation context at ERROR and keep the raw error for DEBUG.
///
/// ```rust,no_run
/// # use stac_stocktake::core::error_handling::log_error_with_context;
/// # use stac_stocktake::config::ConfigError;
/// let error = ConfigError::Missing { key: "GENERAL.FBI_INDEX".to_string() };
/// log_error_with_context(&error, "Loading configuration");
/// // Logs: "FATAL: missing required configuration key GENERAL.FBI_INDEX"
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message().filter(|_| error.is_user_actionable()) {
        Some(user_msg) => log::error!("FATAL: {}", user_msg),
        None => log::error!("FATAL: {} failed: {}", operation_context, error),
    }
    log::debug!("DEBUG_DETAILS: {:?}", error);
}
