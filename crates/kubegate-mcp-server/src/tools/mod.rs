//! Building blocks shared by tool handlers: result type, handler trait, and
//! the gates every handler passes through.

pub mod audit;
pub mod cluster;
pub mod errors;
pub mod guard;
pub mod safety;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use kubegate_core::security::ToolArguments;
use serde::Serialize;

use crate::auth::RequestContext;

pub use audit::wrap_with_audit_logging;
pub use cluster::{
    extract_cluster_param, format_cluster_error, format_k8s_error, get_cluster_client,
    validate_cluster_param, ClusterClient, FederatedClient,
};
pub use errors::{format_authentication_error, is_authentication_error};
pub use guard::wrap_with_validation;
pub use safety::check_mutating_operation;

/// One inbound tool call.
#[derive(Debug, Clone, Default)]
pub struct ToolRequest {
    pub name: String,
    pub arguments: ToolArguments,
}

impl ToolRequest {
    pub fn new(name: impl Into<String>, arguments: impl Into<ToolArguments>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

/// What a handler hands back to the caller. `is_error` marks a tool-level
/// failure (the call itself succeeded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<Content>,
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: true,
        }
    }

    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|c| match c {
            Content::Text { text } => text.as_str(),
        })
    }
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, ctx: RequestContext, request: ToolRequest) -> anyhow::Result<ToolResult>;
}

#[async_trait]
impl<F, Fut> ToolHandler for F
where
    F: Fn(RequestContext, ToolRequest) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<ToolResult>> + Send + 'static,
{
    async fn call(&self, ctx: RequestContext, request: ToolRequest) -> anyhow::Result<ToolResult> {
        (self)(ctx, request).await
    }
}

pub type SharedHandler = Arc<dyn ToolHandler>;
