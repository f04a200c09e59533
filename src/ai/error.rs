//! Provider error taxonomy.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building a provider through the factory.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The identifier does not name any known provider.
    #[error("Unsupported AI provider: {0}")]
    UnsupportedProvider(String),

    /// The provider was recognised but could not be initialized.
    #[error(transparent)]
    Init(#[from] InitError),
}

/// Errors raised while establishing a provider's transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    /// No API key was supplied for the provider.
    #[error("{provider} API key not found. Set {env_hint} or enter a key in settings")]
    MissingApiKey {
        /// Provider identifier.
        provider: String,
        /// Environment variable(s) that would supply the key.
        env_hint: String,
    },

    /// The API key contains characters that cannot be sent in a header.
    #[error("{provider} API key is malformed: {reason}")]
    MalformedApiKey {
        /// Provider identifier.
        provider: String,
        /// What is wrong with the key.
        reason: String,
    },

    /// The model identifier is not offered by the provider.
    #[error("Model '{model}' is not supported by {provider}. Supported models: {supported}")]
    UnsupportedModel {
        /// Provider identifier.
        provider: String,
        /// Requested model identifier.
        model: String,
        /// Comma-separated list of supported models.
        supported: String,
    },

    /// The model identifier is empty or contains whitespace.
    #[error("Malformed model identifier: '{0}'")]
    MalformedModel(String),

    /// The HTTP transport could not be constructed.
    #[error("Failed to build HTTP transport: {0}")]
    Transport(String),
}

/// Errors raised while producing a solution for a screenshot.
#[derive(Error, Debug)]
pub enum SolveError {
    /// The screenshot could not be loaded.
    #[error("Failed to read screenshot {}: {reason}", .path.display())]
    ImageRead {
        /// Location of the screenshot.
        path: PathBuf,
        /// Underlying I/O failure.
        reason: String,
    },

    /// The backend rejected the request or could not be reached.
    #[error("{}", backend_message(.status, .message))]
    Backend {
        /// HTTP status code, absent for network failures.
        status: Option<u16>,
        /// Message reported by the backend.
        message: String,
    },

    /// The backend answered but returned no usable text.
    #[error("The AI provider returned an empty response")]
    EmptyResponse,

    /// Lazy initialization failed at solve time.
    #[error(transparent)]
    Init(#[from] InitError),

    /// No provider is bound to the session.
    #[error("No AI provider is configured. Choose a provider and API key first")]
    NoActiveProvider,

    /// The caller's cancellation signal fired before the backend answered.
    #[error("Request cancelled")]
    Cancelled,

    /// A provider failed in an unexpected way.
    #[error("Internal provider failure: {0}")]
    Internal(String),
}

fn backend_message(status: &Option<u16>, message: &str) -> String {
    match *status {
        Some(429) => format!("Rate limit exceeded (HTTP 429): {message}"),
        Some(code) => format!("AI provider request failed (HTTP {code}): {message}"),
        None => format!("AI provider request failed: {message}"),
    }
}

impl SolveError {
    /// Returns true when the backend throttled the request.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SolveError::Backend { status: Some(429), .. })
    }

    /// Returns true when re-triggering the solve may succeed without
    /// changing configuration.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            SolveError::ImageRead { .. }
            | SolveError::EmptyResponse
            | SolveError::Cancelled
            | SolveError::Internal(_) => true,
            SolveError::Backend { status, .. } => !matches!(status, Some(401) | Some(403)),
            SolveError::Init(_) | SolveError::NoActiveProvider => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_provider_names_identifier() {
        let err = ProviderError::UnsupportedProvider("not-a-real-provider".to_string());
        assert_eq!(
            err.to_string(),
            "Unsupported AI provider: not-a-real-provider"
        );
    }

    #[test]
    fn backend_message_includes_status() {
        let err = SolveError::Backend {
            status: Some(401),
            message: "invalid x-api-key".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "AI provider request failed (HTTP 401): invalid x-api-key"
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn rate_limit_detection() {
        let err = SolveError::Backend {
            status: Some(429),
            message: "slow down".to_string(),
        };
        assert!(err.is_rate_limited());
        assert!(err.is_retryable());
        assert!(err.to_string().starts_with("Rate limit exceeded"));
    }

    #[test]
    fn network_failure_has_no_status() {
        let err = SolveError::Backend {
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "AI provider request failed: connection refused"
        );
    }

    #[test]
    fn init_errors_pass_through_solve_error() {
        let err: SolveError = InitError::MalformedModel(String::new()).into();
        assert_eq!(err.to_string(), "Malformed model identifier: ''");
        assert!(!err.is_retryable());
    }
}
