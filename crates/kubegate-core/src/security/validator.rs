//! Resource-shape validation layered over the authorizer.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::authorizer::{Authorize, Authorizer};
use super::credentials::CredentialManager;
use super::error::SecurityError;
use super::request::{OperationRequest, PRIVILEGED_OPERATIONS};
use crate::errors::{GuardError, GuardResult, ValidationStage};

/// Kubernetes DNS-subdomain limit.
pub const DEFAULT_MAX_NAME_LENGTH: usize = 253;

/// Resource kinds that must carry a namespace when namespaces are required.
pub const NAMESPACED_RESOURCES: &[&str] = &[
    "pods",
    "services",
    "deployments",
    "replicasets",
    "configmaps",
    "secrets",
    "persistentvolumeclaims",
    "jobs",
    "cronjobs",
];

lazy_static! {
    static ref K8S_NAME: Regex =
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    pub max_name_length: usize,
    /// Empty means every resource type is allowed.
    pub allowed_resource_types: Vec<String>,
    pub forbidden_name_patterns: Vec<String>,
    pub require_namespace_for_resources: bool,
    pub allow_privileged_operations: bool,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            allowed_resource_types: [
                "pods",
                "services",
                "deployments",
                "configmaps",
                "secrets",
                "namespaces",
                "nodes",
                "persistentvolumes",
                "persistentvolumeclaims",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            forbidden_name_patterns: vec![
                "^kube-.*".into(),
                ".*-admin$".into(),
                ".*-secret$".into(),
            ],
            require_namespace_for_resources: true,
            allow_privileged_operations: false,
        }
    }
}

impl ValidationRules {
    /// Compile the forbidden-name patterns, failing on the first bad one.
    pub fn compile_patterns(&self) -> GuardResult<Vec<(String, Regex)>> {
        self.forbidden_name_patterns
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map(|re| (p.clone(), re))
                    .map_err(|source| GuardError::InvalidPattern {
                        pattern: p.clone(),
                        source,
                    })
            })
            .collect()
    }
}

/// Full request validation: authorization, then resource rules, then context.
///
/// All checks are local; nothing here touches the network.
#[derive(Debug, Clone)]
pub struct Validator {
    authorizer: Authorizer,
    credentials: Option<Arc<CredentialManager>>,
    rules: ValidationRules,
    forbidden: Vec<(String, Regex)>,
}

impl Validator {
    pub fn new(
        authorizer: Authorizer,
        credentials: Option<Arc<CredentialManager>>,
        rules: ValidationRules,
    ) -> GuardResult<Self> {
        let forbidden = rules.compile_patterns()?;
        Ok(Self {
            authorizer,
            credentials,
            rules,
            forbidden,
        })
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    pub fn authorizer(&self) -> &Authorizer {
        &self.authorizer
    }

    /// Run every check in order, stopping at the first failure.
    pub fn validate_operation(&self, request: &OperationRequest) -> GuardResult<()> {
        self.authorizer
            .authorize(request)
            .map_err(|e| GuardError::at(ValidationStage::Authorization, e))?;

        self.validate_resource_type(&request.resource)
            .map_err(|e| GuardError::at(ValidationStage::ResourceType, e))?;

        self.validate_resource_name(&request.name)
            .map_err(|e| GuardError::at(ValidationStage::ResourceName, e))?;

        self.validate_namespace_requirement(&request.resource, &request.namespace)
            .map_err(|e| GuardError::at(ValidationStage::Namespace, e))?;

        self.validate_privileged_operation(&request.operation)
            .map_err(|e| GuardError::at(ValidationStage::PrivilegedOperation, e))?;

        if let Some(credentials) = &self.credentials {
            credentials
                .validate_context(&request.context)
                .map_err(|e| GuardError::at(ValidationStage::Context, e.into()))?;
        }

        Ok(())
    }

    fn validate_resource_type(&self, resource_type: &str) -> GuardResult<()> {
        // Listing tools and pod-scoped calls (logs, exec, port-forward) name no type.
        if resource_type.is_empty() {
            return Ok(());
        }
        let allowed = &self.rules.allowed_resource_types;
        if allowed.is_empty() {
            return Ok(());
        }
        if allowed.iter().any(|t| t.eq_ignore_ascii_case(resource_type)) {
            return Ok(());
        }
        Err(SecurityError::forbidden(
            "resourceType",
            resource_type,
            "resource type not in allowed list",
        )
        .into())
    }

    fn validate_resource_name(&self, name: &str) -> GuardResult<()> {
        if name.is_empty() {
            return Ok(());
        }

        let max = self.rules.max_name_length;
        if max > 0 && name.len() > max {
            return Err(SecurityError::validation(
                "name",
                name,
                format!("name exceeds maximum length of {} characters", max),
            )
            .into());
        }

        if let Some((pattern, _)) = self.forbidden.iter().find(|(_, re)| re.is_match(name)) {
            return Err(SecurityError::forbidden(
                "name",
                name,
                format!("matches forbidden pattern: {}", pattern),
            )
            .into());
        }

        if !K8S_NAME.is_match(name) {
            return Err(SecurityError::validation(
                "name",
                name,
                "invalid Kubernetes name format: must consist of lowercase alphanumeric characters, \
                 dashes, or dots, and must start and end with an alphanumeric character",
            )
            .into());
        }

        Ok(())
    }

    fn validate_namespace_requirement(&self, resource_type: &str, namespace: &str) -> GuardResult<()> {
        if !self.rules.require_namespace_for_resources || !namespace.is_empty() {
            return Ok(());
        }
        let normalized = resource_type.to_lowercase();
        if NAMESPACED_RESOURCES.contains(&normalized.as_str()) {
            return Err(SecurityError::validation(
                "namespace",
                "",
                format!("namespace is required for resource type '{}'", resource_type),
            )
            .into());
        }
        Ok(())
    }

    fn validate_privileged_operation(&self, operation: &str) -> GuardResult<()> {
        if self.rules.allow_privileged_operations {
            return Ok(());
        }
        let op = operation.to_lowercase();
        if PRIVILEGED_OPERATIONS.contains(&op.as_str()) {
            return Err(SecurityError::forbidden(
                "operation",
                operation,
                "privileged operations are not allowed",
            )
            .into());
        }
        Ok(())
    }
}
