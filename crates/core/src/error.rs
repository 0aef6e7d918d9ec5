use thiserror::Error;

/// Errors that can occur in core type parsing and validation.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    /// Message role string did not match any known role.
    #[error("Invalid message role: {0}")]
    InvalidRole(String),

    /// Feedback style string did not match any known style.
    #[error("Invalid feedback style: {0}")]
    InvalidFeedbackStyle(String),

    /// Input failed a domain validation rule.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Required configuration value is missing.
    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
