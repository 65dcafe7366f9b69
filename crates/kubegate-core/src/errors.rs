//! Error taxonomy shared by every gate in the request path.

use std::fmt;

use serde::Serialize;

use crate::security::SecurityError;

/// Closed classification of every failure this crate and the server report.
///
/// Used for server-side metrics and alerting; callers only ever see the
/// sanitized message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    MissingOperation,
    Forbidden,
    Unauthorized,
    InvalidCredentials,
    CredentialsMissing,
    OAuthTokenMissing,
    OAuthClientFailed,
    ValidationFailed,
    /// The caller abandoned the request before resolution finished.
    Cancelled,
    /// The server context has been shut down.
    Unavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::MissingOperation => "missing_operation",
            Self::Forbidden => "forbidden",
            Self::Unauthorized => "unauthorized",
            Self::InvalidCredentials => "invalid_credentials",
            Self::CredentialsMissing => "credentials_missing",
            Self::OAuthTokenMissing => "oauth_token_missing",
            Self::OAuthClientFailed => "oauth_client_failed",
            Self::ValidationFailed => "validation_failed",
            Self::Cancelled => "cancelled",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validator stage a failure was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStage {
    Authorization,
    ResourceType,
    ResourceName,
    Namespace,
    PrivilegedOperation,
    Context,
}

impl ValidationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorization => "authorization",
            Self::ResourceType => "resource_type",
            Self::ResourceName => "resource_name",
            Self::Namespace => "namespace",
            Self::PrivilegedOperation => "privileged_operation",
            Self::Context => "context",
        }
    }
}

impl fmt::Display for ValidationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Authorization => "authorization",
            Self::ResourceType => "resource type validation",
            Self::ResourceName => "resource name validation",
            Self::Namespace => "namespace validation",
            Self::PrivilegedOperation => "privileged operation validation",
            Self::Context => "context validation",
        };
        f.write_str(label)
    }
}

/// Errors raised by request extraction, authorization and validation.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// The tool arguments could not be turned into an operation request.
    #[error("invalid operation request: {0}")]
    InvalidRequest(String),

    /// No operation type was specified or inferred.
    #[error("operation type is required")]
    MissingOperation,

    #[error(transparent)]
    Security(#[from] SecurityError),

    /// A validator stage rejected the request.
    #[error("{stage} failed: {source}")]
    Stage {
        stage: ValidationStage,
        #[source]
        source: Box<GuardError>,
    },

    /// A configured forbidden-name pattern does not compile.
    #[error("invalid forbidden name pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl GuardError {
    pub(crate) fn at(stage: ValidationStage, err: GuardError) -> Self {
        Self::Stage {
            stage,
            source: Box::new(err),
        }
    }

    /// Kind of the innermost error; stage wrappers are transparent here.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::MissingOperation => ErrorKind::MissingOperation,
            Self::Security(e) => e.error_kind(),
            Self::Stage { source, .. } => source.kind(),
            Self::InvalidPattern { .. } => ErrorKind::ValidationFailed,
        }
    }

    /// The security error at the root of this failure, if any.
    pub fn security_error(&self) -> Option<&SecurityError> {
        match self {
            Self::Security(e) => Some(e),
            Self::Stage { source, .. } => source.security_error(),
            _ => None,
        }
    }

    /// Stage the failure was raised in, if it came from the validator.
    pub fn stage(&self) -> Option<ValidationStage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type GuardResult<T> = Result<T, GuardError>;

/// User-safe rendering of a guard failure.
///
/// Security errors lose their offending value and cause; anything that is
/// neither a security error nor a fixed-text request error collapses to
/// `operation failed`.
pub fn sanitize_error(err: &GuardError) -> String {
    match err {
        GuardError::InvalidRequest(_) | GuardError::MissingOperation => err.to_string(),
        GuardError::Security(e) => e.sanitize().to_string(),
        GuardError::Stage { source, .. } => sanitize_error(source),
        GuardError::InvalidPattern { .. } => "operation failed".to_string(),
    }
}
