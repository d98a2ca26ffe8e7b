use thiserror::Error;

/// Errors raised while coordinating the assistant with a host page
///
/// A missing anchor, trigger or overlay is never one of these: absence in the
/// host DOM is handled locally with a fallback.
#[derive(Debug, Error)]
pub enum AssistError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Page evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Malformed page event: {0}")]
    ShimProtocol(String),

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Clipboard write failed: {0}")]
    ClipboardFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Generate(#[from] crate::assistant::GenerateError),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, AssistError>;
