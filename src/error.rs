use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoryVisError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Client error: {0}")]
    ClientError(String),
    #[error("Request error: {0}")]
    RequestError(String),
}

pub type Result<T> = std::result::Result<T, StoryVisError>;

/// Failure categories for a generation attempt.
///
/// `CredentialMissing` and `EntitlementDenied` are recoverable through the
/// credential selection flow; the rest surface as a generic retryable error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    CredentialMissing,
    EntitlementDenied,
    SafetyRejected,
    TransientServiceError,
    Unknown,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::CredentialMissing => "credential-missing",
            FailureKind::EntitlementDenied => "entitlement-denied",
            FailureKind::SafetyRejected => "safety-rejected",
            FailureKind::TransientServiceError => "transient-service-error",
            FailureKind::Unknown => "unknown",
        }
    }

    /// Whether the failure is resolved by (re-)running the credential flow.
    pub fn is_credential_problem(&self) -> bool {
        matches!(
            self,
            FailureKind::CredentialMissing | FailureKind::EntitlementDenied
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified generation failure, returned as data rather than thrown.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct GenerationFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl GenerationFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
