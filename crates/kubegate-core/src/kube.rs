//! Opaque Kubernetes capability handles.
//!
//! The verbs themselves (get, list, apply, exec, port-forward, ...) live
//! outside this crate. The gates here only choose, wrap and hand out handles.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

/// Typed client for one API server.
pub trait KubeClient: Send + Sync + fmt::Debug {
    /// API server the client talks to.
    fn host(&self) -> &str;
}

/// Untyped (dynamic) client for one API server.
pub trait DynamicClient: Send + Sync + fmt::Debug {
    fn host(&self) -> &str;
}

/// Builds call-scoped clients that authenticate with the caller's own token.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn create_bearer_token_client(&self, token: &str) -> anyhow::Result<Arc<dyn KubeClient>>;
}
