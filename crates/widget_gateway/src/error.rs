use thiserror::Error;

/// Failure taxonomy of one gateway call.
///
/// The widget collapses every kind into a single apology; the kinds exist for
/// logs and diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Chat API URL is not configured")]
    ConfigMissing,

    #[error("Request timed out")]
    Timeout,

    #[error("Request cancelled")]
    Cancelled,

    #[error("API error: {0}")]
    ServerError(u16),

    #[error("Could not extract content from response")]
    UnrecognizedShape,

    #[error("Network error: {0}")]
    NetworkFailure(String),
}

impl GatewayError {
    /// Stable label for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigMissing => "config_missing",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::ServerError(_) => "server_error",
            Self::UnrecognizedShape => "unrecognized_shape",
            Self::NetworkFailure(_) => "network_failure",
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::NetworkFailure(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
