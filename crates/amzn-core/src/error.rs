//! Error types for amzn-core.

use thiserror::Error;

/// Result type alias using amzn-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for order retrieval
#[derive(Error, Debug)]
pub enum Error {
    // Session errors
    #[error("Not authenticated. Call amazon_login first.")]
    NotAuthenticated,

    #[error("OTP_REQUIRED")]
    OtpRequired,

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Interactive prompt required: {0}")]
    InteractivePrompt(String),

    // Lookup errors
    #[error("Order not found: {0}")]
    NotFound(String),

    // Caller errors
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("{0}")]
    Config(String),

    // Upstream errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Failed to parse {page}: {reason}")]
    Parse { page: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "amazon")]
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

/// Caller-visible classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No session, or the session is waiting for an OTP
    NotAuthenticated,
    /// The requested order does not exist
    NotFound,
    /// Bad tool arguments or missing configuration
    Invalid,
    /// Network, parsing or site-structure failures from the backend
    Upstream,
}

impl Error {
    /// Create a parse error for the named page
    pub fn parse(page: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            page: page.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid parameters error
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAuthenticated | Self::OtpRequired => ErrorKind::NotAuthenticated,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidParams(_) | Self::Config(_) => ErrorKind::Invalid,
            _ => ErrorKind::Upstream,
        }
    }

    /// Check if this error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this error means the caller must log in
    pub fn is_not_authenticated(&self) -> bool {
        self.kind() == ErrorKind::NotAuthenticated
    }
}
