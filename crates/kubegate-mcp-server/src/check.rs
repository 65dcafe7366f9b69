//! Offline policy evaluation behind `kubegate check`.

use std::sync::Arc;

use anyhow::{Context, Result};
use kubegate_core::errors::sanitize_error;
use kubegate_core::security::{
    is_destructive_operation, Authorizer, CredentialManager, OperationRequest, Validator,
    NAMESPACED_RESOURCES,
};
use serde::Serialize;

use crate::config::ServerConfig;
use crate::tools::check_mutating_operation;

/// Stage label reported when the mutating-operation gate denies.
pub const MUTATING_GATE_STAGE: &str = "mutating_operation";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<&'static str>,
    pub message: String,
}

impl Decision {
    fn allow() -> Self {
        Self {
            allowed: true,
            stage: None,
            message: "operation allowed".to_string(),
        }
    }

    fn deny(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            stage: Some(stage),
            message: message.into(),
        }
    }
}

/// The validator a server built from `config` would use.
pub fn build_validator(config: &ServerConfig) -> Result<Validator> {
    let credentials = Arc::new(CredentialManager::new(config.credentials.clone()));
    Validator::new(
        Authorizer::policy(config.policy_config()),
        Some(credentials),
        config.validation.clone(),
    )
    .context("failed to build validator")
}

/// The request `kubegate check` evaluates. A namespaced resource given without
/// a namespace runs in the configured default namespace.
pub fn check_request(
    config: &ServerConfig,
    operation: &str,
    resource: &str,
    namespace: Option<&str>,
    name: &str,
    context: &str,
) -> OperationRequest {
    let namespace = match namespace {
        Some(ns) => ns.to_string(),
        None if NAMESPACED_RESOURCES.contains(&resource.to_lowercase().as_str()) => {
            config.default_namespace.clone()
        }
        None => String::new(),
    };
    OperationRequest::new(operation, resource)
        .with_namespace(namespace)
        .with_name(name)
        .with_context(context)
}

/// Operations whose handlers change state. `exec` and `port-forward` pass the
/// authorizer as reads but still go through the mutating gate.
fn has_side_effects(operation: &str) -> bool {
    is_destructive_operation(operation) || matches!(operation, "exec" | "port-forward")
}

/// Validation first, then the mutating gate for state-changing operations.
pub fn evaluate(config: &ServerConfig, validator: &Validator, request: &OperationRequest) -> Decision {
    if let Err(e) = validator.validate_operation(request) {
        let stage = e.stage().map(|s| s.as_str()).unwrap_or("request");
        return Decision::deny(stage, sanitize_error(&e));
    }
    if has_side_effects(&request.operation) {
        if let Some(denial) = check_mutating_operation(config, &request.operation) {
            let message = denial.first_text().unwrap_or_default().to_string();
            return Decision::deny(MUTATING_GATE_STAGE, message);
        }
    }
    Decision::allow()
}
