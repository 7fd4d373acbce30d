//! Error types for the NoteChat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! The budgeting core itself never fails; the only fallible collaborator in
//! this crate is the completion client. Configuration errors live in
//! `notechat-config`.

use thiserror::Error;

/// Failures of the completion API client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request blocked by cross-origin policy: {0}")]
    Cors(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Classify a non-success HTTP status into a typed error.
    pub fn from_status(status_code: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status_code {
            401 | 403 => Self::AuthenticationFailed(body),
            429 => Self::RateLimited {
                retry_after_secs: 5,
            },
            408 | 504 => Self::Timeout(body),
            _ => Self::ApiError {
                status_code,
                message: body,
            },
        }
    }

    /// Text suitable for showing in the chat sidebar.
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthenticationFailed(_) => {
                "The API key was rejected. Check it in the plugin settings.".into()
            }
            Self::RateLimited { retry_after_secs } => format!(
                "Too many requests. Wait about {retry_after_secs}s and try again."
            ),
            Self::Timeout(_) => "The model took too long to answer. Try again.".into(),
            Self::Network(_) => "Could not reach the completion API. Check your connection.".into(),
            Self::Cors(_) => {
                "The request was blocked by the app's network policy. Try a different API endpoint."
                    .into()
            }
            Self::StreamInterrupted(_) => "The response stream stopped unexpectedly.".into(),
            Self::NotConfigured(_) => {
                "No API key configured. Add one in the plugin settings.".into()
            }
            Self::ApiError {
                status_code,
                message,
            } => format!("The completion API returned an error ({status_code}): {message}"),
        }
    }

    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::Timeout(_)
                | Self::Network(_)
                | Self::StreamInterrupted(_)
        ) || matches!(self, Self::ApiError { status_code, .. } if *status_code >= 500)
    }
}
