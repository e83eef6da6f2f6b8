//! Error types for the chatbot.

use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error;

/// Service error codes that mean the caller's credentials or permissions are at fault.
const CLIENT_SIDE_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "AllAccessDisabled",
    "ExpiredToken",
    "ExpiredTokenException",
    "InvalidAccessKeyId",
    "InvalidClientTokenId",
    "InvalidSignatureException",
    "SignatureDoesNotMatch",
    "UnrecognizedClientException",
];

/// Errors surfaced by the chatbot flows.
#[derive(Debug, Error)]
pub enum ChatbotError {
    /// A required environment variable is absent or blank.
    #[error("missing configuration: {0} is not set")]
    ConfigurationMissing(String),

    /// A configuration value is present but unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Credentials, permissions or the network prevented the call.
    #[error("{operation} failed (client error): {detail}")]
    RemoteClient {
        /// Remote operation name.
        operation: &'static str,
        /// Error detail reported by the SDK.
        detail: String,
    },

    /// The remote service rejected the request or answered unexpectedly.
    #[error("{operation} failed (service error): {detail}")]
    RemoteService {
        /// Remote operation name.
        operation: &'static str,
        /// Error detail reported by the service.
        detail: String,
    },

    /// Ingestion did not reach a terminal state in time.
    #[error("Ingestion job timed out after {checks} status checks.")]
    Timeout {
        /// Status queries made before giving up.
        checks: u32,
    },

    /// The user supplied something we cannot act on.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for chatbot operations.
pub type ChatbotResult<T> = Result<T, ChatbotError>;

/// Coarse classification of a remote failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteFailure {
    /// Credentials, permission or transport.
    Client,
    /// Request rejected by the service.
    Service,
}

impl ChatbotError {
    /// Classify an AWS SDK error for `operation`.
    pub fn from_sdk<E, R>(operation: &'static str, err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        let failure = match err.as_service_error() {
            Some(service) => classify_service_code(service.code()),
            None => RemoteFailure::Client,
        };
        let detail = DisplayErrorContext(&err).to_string();
        match failure {
            RemoteFailure::Client => Self::RemoteClient { operation, detail },
            RemoteFailure::Service => Self::RemoteService { operation, detail },
        }
    }

    /// A request could not be assembled locally.
    pub fn malformed_request(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::RemoteService {
            operation,
            detail: format!("malformed request: {err}"),
        }
    }

    /// The response lacked a field we depend on.
    #[must_use]
    pub fn missing_field(operation: &'static str, field: &str) -> Self {
        Self::RemoteService {
            operation,
            detail: format!("response is missing `{field}`"),
        }
    }

    /// Whether this is a credentials/permission/network failure.
    #[must_use]
    pub const fn is_remote_client(&self) -> bool {
        matches!(self, Self::RemoteClient { .. })
    }
}

/// Map a service error code onto client-side vs service-side failure.
#[must_use]
pub fn classify_service_code(code: Option<&str>) -> RemoteFailure {
    match code {
        Some(code) if CLIENT_SIDE_CODES.contains(&code) => RemoteFailure::Client,
        _ => RemoteFailure::Service,
    }
}
