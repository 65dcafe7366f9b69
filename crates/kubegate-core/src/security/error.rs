use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::errors::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityErrorKind {
    Forbidden,
    Unauthorized,
    Credentials,
    Validation,
}

impl SecurityErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forbidden => "forbidden",
            Self::Unauthorized => "unauthorized",
            Self::Credentials => "credentials",
            Self::Validation => "validation",
        }
    }
}

impl fmt::Display for SecurityErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A security decision with enough context for server-side logs.
///
/// `value` and `source` may carry caller-supplied or secret material. Use
/// [`SecurityError::sanitize`] before the error crosses into a tool response
/// or the audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityError {
    pub kind: SecurityErrorKind,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resource: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
    pub reason: String,
    #[serde(skip)]
    source: Option<Arc<dyn StdError + Send + Sync>>,
}

impl SecurityError {
    fn build(
        kind: SecurityErrorKind,
        resource: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            resource: resource.into(),
            value: value.into(),
            reason: reason.into(),
            source: None,
        }
    }

    pub fn forbidden(
        resource: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::build(SecurityErrorKind::Forbidden, resource, value, reason)
    }

    pub fn unauthorized(
        resource: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::build(SecurityErrorKind::Unauthorized, resource, value, reason)
    }

    pub fn credentials(reason: impl Into<String>) -> Self {
        Self::build(SecurityErrorKind::Credentials, "", "", reason)
    }

    pub fn validation(
        resource: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::build(SecurityErrorKind::Validation, resource, value, reason)
    }

    /// Attach the underlying cause.
    pub fn with_source<E>(mut self, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(cause));
        self
    }

    pub fn is_forbidden(&self) -> bool {
        self.kind == SecurityErrorKind::Forbidden
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == SecurityErrorKind::Unauthorized
    }

    pub fn is_credentials(&self) -> bool {
        self.kind == SecurityErrorKind::Credentials
    }

    pub fn is_validation(&self) -> bool {
        self.kind == SecurityErrorKind::Validation
    }

    pub fn error_kind(&self) -> ErrorKind {
        match self.kind {
            SecurityErrorKind::Forbidden => ErrorKind::Forbidden,
            SecurityErrorKind::Unauthorized => ErrorKind::Unauthorized,
            SecurityErrorKind::Credentials => ErrorKind::InvalidCredentials,
            SecurityErrorKind::Validation => ErrorKind::ValidationFailed,
        }
    }

    /// Copy without the offending value or the wrapped cause.
    ///
    /// Credential failures additionally lose their reason.
    pub fn sanitize(&self) -> Self {
        let reason = if self.is_credentials() {
            "authentication failed".to_string()
        } else {
            self.reason.clone()
        };
        Self {
            kind: self.kind,
            resource: self.resource.clone(),
            value: String::new(),
            reason,
            source: None,
        }
    }
}

impl fmt::Display for SecurityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "security error: {} {} '{}': {}",
            self.kind, self.resource, self.value, self.reason
        )?;
        if let Some(cause) = &self.source {
            write!(f, " ({})", cause)?;
        }
        Ok(())
    }
}

impl StdError for SecurityError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}
