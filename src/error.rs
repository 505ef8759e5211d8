// src/error.rs
//! Application error types with structured error handling.
//!
//! Error types form the vocabulary for failure modes in a scan. The job
//! runner decides between retrying and abandoning a plan purely by asking
//! an error whether it is fatal, so that classification lives here next to
//! the variants it inspects.

use std::fmt;
use thiserror::Error;

/// Notion API error codes as a typed vocabulary.
///
/// Instead of matching against magic strings like `"rate_limited"`,
/// the domain vocabulary is encoded in the type system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotionErrorCode {
    /// API rate limit exceeded
    RateLimited,
    /// The requested object does not exist or is not shared with the integration
    ObjectNotFound,
    /// API key is invalid or expired
    Unauthorized,
    /// API key lacks permission for this resource
    RestrictedResource,
    /// Request body contains invalid JSON
    InvalidJson,
    /// Request parameters failed Notion's validation
    ValidationFailed,
    /// Conflict with current state of the resource
    Conflict,
    /// Notion internal server error
    InternalError,
    /// Notion is temporarily unavailable
    ServiceUnavailable,
    /// HTTP status code fallback when the error body is unparseable
    HttpStatus(u16),
    /// An error code this client doesn't recognize yet
    Unknown(String),
}

impl NotionErrorCode {
    /// Parse a Notion API error code string into the typed vocabulary.
    pub fn from_api_response(code: &str) -> Self {
        match code {
            "rate_limited" => Self::RateLimited,
            "object_not_found" => Self::ObjectNotFound,
            "unauthorized" => Self::Unauthorized,
            "restricted_resource" => Self::RestrictedResource,
            "invalid_json" => Self::InvalidJson,
            "validation_error" => Self::ValidationFailed,
            "conflict_error" => Self::Conflict,
            "internal_server_error" => Self::InternalError,
            "service_unavailable" => Self::ServiceUnavailable,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Create from an HTTP status code when the error body is unparseable.
    pub fn from_http_status(status: u16) -> Self {
        Self::HttpStatus(status)
    }

    /// Whether retrying the same request with the same credential is pointless.
    ///
    /// Only a missing object and a rejected credential qualify; every other
    /// code (rate limiting included) is worth another attempt later.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ObjectNotFound | Self::Unauthorized | Self::HttpStatus(401) | Self::HttpStatus(404)
        )
    }
}

impl fmt::Display for NotionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate_limited"),
            Self::ObjectNotFound => write!(f, "object_not_found"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::RestrictedResource => write!(f, "restricted_resource"),
            Self::InvalidJson => write!(f, "invalid_json"),
            Self::ValidationFailed => write!(f, "validation_error"),
            Self::Conflict => write!(f, "conflict_error"),
            Self::InternalError => write!(f, "internal_server_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
            Self::Unknown(code) => write!(f, "{}", code),
        }
    }
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("Notion API returned an error ({code}): {message}")]
    NotionService {
        code: NotionErrorCode,
        message: String,
        status: reqwest::StatusCode,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("No usable Notion credential for plan {plan}: {reason}")]
    CredentialUnavailable { plan: String, reason: String },

    #[error("Maximum database nesting ({0}) exceeded")]
    RecursionLimitExceeded(usize),

    #[error("Statistics store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(transparent)]
    ValidationError(#[from] crate::types::ValidationError),
}

impl AppError {
    /// The Notion error code carried by this error, if it came from the API.
    pub fn notion_code(&self) -> Option<&NotionErrorCode> {
        match self {
            AppError::NotionService { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Whether a plan that hit this error should be abandoned for the cycle
    /// instead of re-queued.
    ///
    /// Validation failures (a malformed root id or token) are permanent for
    /// the same reason a rejected credential is.
    pub fn is_fatal(&self) -> bool {
        match self {
            AppError::NotionService { code, .. } => code.is_fatal(),
            AppError::CredentialUnavailable { .. } => true,
            AppError::ValidationError(_) => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

/// Failures of the relational store adapters.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid store url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{operation} rejected ({status}): {body}")]
    Rejected {
        operation: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed row: {0}")]
    Malformed(String),
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;
