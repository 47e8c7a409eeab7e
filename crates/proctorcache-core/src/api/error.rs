use thiserror::Error;

/// Failures surfaced by the data source and propagated verbatim by the
/// query cache and mutation coordinator.
///
/// `Clone` is required because a single in-flight fetch resolves every
/// caller waiting on the same key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid parameter: {0}")]
    Validation(String),

    #[error("Query cache has been disposed")]
    Disposed,
}

/// Maximum length for messages carried inside an error
const MAX_ERROR_MESSAGE_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a message to avoid logging excessive data
    fn truncate_message(message: &str) -> String {
        if message.len() <= MAX_ERROR_MESSAGE_LENGTH {
            message.to_string()
        } else {
            let mut end = MAX_ERROR_MESSAGE_LENGTH;
            while !message.is_char_boundary(end) {
                end -= 1;
            }
            format!(
                "{}... (truncated, {} total bytes)",
                &message[..end],
                message.len()
            )
        }
    }

    pub fn not_found(what: &str, id: &str) -> Self {
        ApiError::NotFound(Self::truncate_message(&format!("{} with ID {} not found", what, id)))
    }

    /// Wrap any lower-level fault as a transport failure.
    pub fn transport(cause: impl std::fmt::Display) -> Self {
        ApiError::Transport(Self::truncate_message(&cause.to_string()))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(Self::truncate_message(&message.into()))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}
