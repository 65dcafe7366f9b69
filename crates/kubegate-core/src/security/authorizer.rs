//! Operation-level authorization.

use serde::{Deserialize, Serialize};

use super::error::SecurityError;
use super::request::OperationRequest;
use crate::errors::{GuardError, GuardResult};

/// Operations permitted while non-destructive mode is active.
///
/// `exec` is read-only here; the mutating gate in the server treats it as a
/// state change separately.
pub const READ_ONLY_OPERATIONS: &[&str] = &["get", "list", "describe", "logs", "exec"];

/// Authorization policy, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Empty means every operation is allowed.
    pub allowed_operations: Vec<String>,
    pub restricted_namespaces: Vec<String>,
    pub non_destructive_mode: bool,
    pub dry_run_mode: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allowed_operations: Vec::new(),
            restricted_namespaces: vec!["kube-system".into(), "kube-public".into()],
            non_destructive_mode: true,
            dry_run_mode: false,
        }
    }
}

pub trait Authorize: Send + Sync {
    fn authorize(&self, request: &OperationRequest) -> GuardResult<()>;
}

/// Rule-based authorizer.
#[derive(Debug, Clone)]
pub struct PolicyAuthorizer {
    config: PolicyConfig,
}

impl PolicyAuthorizer {
    pub fn new(mut config: PolicyConfig) -> Self {
        for op in &mut config.allowed_operations {
            *op = op.to_lowercase();
        }
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    fn check_operation(&self, operation: &str) -> GuardResult<()> {
        if operation.is_empty() {
            return Err(GuardError::MissingOperation);
        }

        let op = operation.to_lowercase();
        let allowed = &self.config.allowed_operations;
        if !allowed.is_empty() && !allowed.iter().any(|a| *a == op) {
            return Err(SecurityError::forbidden(
                "operation",
                operation,
                "not in allowed operations list",
            )
            .into());
        }
        Ok(())
    }

    fn check_namespace(&self, namespace: &str) -> GuardResult<()> {
        if namespace.is_empty() {
            return Ok(());
        }
        if self
            .config
            .restricted_namespaces
            .iter()
            .any(|ns| ns == namespace)
        {
            return Err(SecurityError::forbidden(
                "namespace",
                namespace,
                "access to this namespace is restricted",
            )
            .into());
        }
        Ok(())
    }

    fn check_non_destructive(&self, operation: &str) -> GuardResult<()> {
        if !self.config.non_destructive_mode {
            return Ok(());
        }
        let op = operation.to_lowercase();
        if !READ_ONLY_OPERATIONS.contains(&op.as_str()) {
            return Err(SecurityError::forbidden(
                "operation",
                operation,
                "not allowed in non-destructive mode",
            )
            .into());
        }
        Ok(())
    }
}

impl Authorize for PolicyAuthorizer {
    fn authorize(&self, request: &OperationRequest) -> GuardResult<()> {
        self.check_operation(&request.operation)?;
        self.check_namespace(&request.namespace)?;
        self.check_non_destructive(&request.operation)?;
        Ok(())
    }
}

/// The authorizer variants the server can be configured with.
///
/// Only construction picks a variant; call sites go through [`Authorize`].
#[derive(Debug, Clone)]
pub enum Authorizer {
    Policy(PolicyAuthorizer),
    /// Allows everything. Development setups only.
    Permissive,
}

impl Authorizer {
    pub fn policy(config: PolicyConfig) -> Self {
        Self::Policy(PolicyAuthorizer::new(config))
    }

    pub fn permissive() -> Self {
        tracing::warn!("permissive authorizer selected; every operation will be allowed");
        Self::Permissive
    }

    pub fn is_permissive(&self) -> bool {
        matches!(self, Self::Permissive)
    }
}

impl Authorize for Authorizer {
    fn authorize(&self, request: &OperationRequest) -> GuardResult<()> {
        match self {
            Self::Policy(p) => p.authorize(request),
            Self::Permissive => Ok(()),
        }
    }
}
