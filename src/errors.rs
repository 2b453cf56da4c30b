/*!
 * Error types for the bookwash application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 *
 * Only `FormatError` and I/O failures are fatal to a run. Provider and service
 * errors are caught per chapter by the pipeline and turned into a degraded but
 * valid document.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Error message from the API
        message: String,
        /// Server-provided hint for how long to wait
        retry_after_secs: Option<u64>,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether another attempt at the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_)
            | Self::ParseError(_)
            | Self::ConnectionError(_)
            | Self::RateLimitExceeded { .. } => true,
            Self::ApiError { status_code, .. } => *status_code >= 500 || *status_code == 408,
            Self::AuthenticationError(_) => false,
        }
    }

    /// Whether the provider rejected the call because of rate limiting
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimitExceeded { .. })
    }

    /// Map an HTTP status and body to the matching error variant
    pub fn from_status(status_code: u16, message: String, retry_after_secs: Option<u64>) -> Self {
        match status_code {
            429 => Self::RateLimitExceeded { message, retry_after_secs },
            401 | 403 => Self::AuthenticationError(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors raised while reading the bookwash text format
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The document as a whole cannot be interpreted
    #[error("Malformed document at line {line}: {message}")]
    MalformedDocument {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },

    /// A change block is structurally broken
    #[error("Malformed change block at line {line}: {message}")]
    MalformedBlock {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },
}

impl FormatError {
    pub fn document(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedDocument { line, message: message.into() }
    }

    pub fn block(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedBlock { line, message: message.into() }
    }
}

/// Failures of the classifier/rewriter collaborator after retries are exhausted
#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    /// The classifier could not produce a rating
    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(ProviderError),

    /// The rewriter could not produce a revision
    #[error("Reviser unavailable: {0}")]
    ReviserUnavailable(ProviderError),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the bookwash format
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the classifier/rewriter service
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
