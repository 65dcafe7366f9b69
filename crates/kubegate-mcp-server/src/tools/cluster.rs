//! Per-call client selection for single- and multi-cluster tools.
//!
//! Every failure is turned into caller-safe text here. Raw collaborator
//! errors only ever reach the server log.

use std::fmt;
use std::sync::Arc;

use kubegate_core::federation::{validate_cluster_name, FederationError, UserInfo};
use kubegate_core::kube::{DynamicClient, KubeClient};
use kubegate_core::security::{RestConfig, ToolArguments};

use super::errors::format_authentication_error;
use crate::auth::RequestContext;
use crate::server::ServerContext;

const INVALID_CLUSTER_NAME: &str = "invalid cluster name provided";
const FEDERATION_DISABLED: &str = "multi-cluster operations require federation mode to be enabled";
const GENERIC_CLUSTER_ERROR: &str = "failed to access cluster: an unexpected error occurred";

/// Handles for a remote cluster, all impersonating the same caller.
#[derive(Debug, Clone)]
pub struct FederatedClient {
    pub dynamic: Arc<dyn DynamicClient>,
    pub rest_config: RestConfig,
}

/// The client a tool runs its Kubernetes calls through.
#[derive(Debug, Clone)]
pub struct ClusterClient {
    client: Arc<dyn KubeClient>,
    federated: Option<FederatedClient>,
    user: Option<UserInfo>,
    cluster_name: String,
}

impl ClusterClient {
    pub fn k8s(&self) -> &Arc<dyn KubeClient> {
        &self.client
    }

    pub fn dynamic(&self) -> Option<&Arc<dyn DynamicClient>> {
        self.federated.as_ref().map(|f| &f.dynamic)
    }

    pub fn rest_config(&self) -> Option<&RestConfig> {
        self.federated.as_ref().map(|f| &f.rest_config)
    }

    /// Impersonated user. `None` for the local cluster.
    pub fn user(&self) -> Option<&UserInfo> {
        self.user.as_ref()
    }

    /// Empty for the local cluster.
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn is_federated(&self) -> bool {
        self.federated.is_some()
    }
}

/// Resolve the client for `cluster`, or for the local cluster when it is
/// empty. The `Err` text is safe to return to the caller as is.
pub async fn get_cluster_client(
    server: &ServerContext,
    ctx: &RequestContext,
    cluster: &str,
) -> Result<ClusterClient, String> {
    tracing::debug!(cluster = %cluster, "resolving cluster client");

    if cluster.is_empty() {
        let client = server
            .k8s_client_for_context(ctx)
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, kind = %e.kind(), "credential resolution failed");
                format_authentication_error(&e)
            })?;
        return Ok(ClusterClient {
            client,
            federated: None,
            user: None,
            cluster_name: String::new(),
        });
    }

    if validate_cluster_name(cluster).is_err() {
        return Err(INVALID_CLUSTER_NAME.to_string());
    }
    let Some(manager) = server.federation() else {
        return Err(FEDERATION_DISABLED.to_string());
    };
    let Some(identity) = ctx.identity() else {
        return Err("authentication required: no user info in context".to_string());
    };
    if server.is_shutdown() {
        return Err(format_cluster_error(&FederationError::ManagerClosed, cluster));
    }
    let user = identity.to_federation_user();

    let resolve = async {
        let client = manager.get_client(cluster, &user).await.map_err(|e| {
            tracing::warn!(cluster = %cluster, error = %e, "failed to get federated clientset");
            format_cluster_error(&e, cluster)
        })?;
        let dynamic = manager.get_dynamic_client(cluster, &user).await.map_err(|e| {
            tracing::warn!(cluster = %cluster, error = %e, "failed to get federated dynamic client");
            format_cluster_error(&e, cluster)
        })?;
        let rest_config = manager.get_rest_config(cluster, &user).await.map_err(|e| {
            tracing::warn!(cluster = %cluster, error = %e, "failed to get federated rest config");
            format_cluster_error(&e, cluster)
        })?;
        Ok::<_, String>((client, dynamic, rest_config))
    };

    let (client, dynamic, rest_config) = tokio::select! {
        biased;
        _ = ctx.done() => {
            tracing::debug!(cluster = %cluster, "request cancelled during cluster client resolution");
            return Err("request cancelled".to_string());
        }
        resolved = resolve => resolved?,
    };

    tracing::debug!(cluster = %cluster, "created federated client");

    Ok(ClusterClient {
        client,
        federated: Some(FederatedClient {
            dynamic,
            rest_config: server.credentials().secure_rest_config(&rest_config),
        }),
        user: Some(user),
        cluster_name: cluster.to_string(),
    })
}

/// Caller-safe text for a federation failure. Unrecognised errors map to one
/// fixed message that never includes the original text.
pub fn format_cluster_error(err: &FederationError, cluster: &str) -> String {
    if let Some(msg) = err.user_facing_error() {
        return msg;
    }
    match err {
        FederationError::NotFound if cluster.is_empty() => "cluster not found".to_string(),
        FederationError::NotFound => format!(
            "cluster '{}' not found - use 'capi_list_clusters' to see available clusters",
            cluster
        ),
        FederationError::Unreachable => format!(
            "cluster '{}' is unreachable - check network connectivity",
            cluster
        ),
        FederationError::Denied => format!("you don't have access to cluster '{}'", cluster),
        FederationError::Timeout => "connection to cluster timed out".to_string(),
        FederationError::TlsHandshakeFailed => "secure connection to cluster failed".to_string(),
        FederationError::ManagerClosed => "federation manager is unavailable".to_string(),
        FederationError::UserInfoRequired => {
            "authentication required for multi-cluster operations".to_string()
        }
        FederationError::InvalidClusterName(_) => INVALID_CLUSTER_NAME.to_string(),
        _ => GENERIC_CLUSTER_ERROR.to_string(),
    }
}

/// The `cluster` argument, or `""` when absent or not a string.
pub fn extract_cluster_param(args: &ToolArguments) -> &str {
    args.str("cluster").unwrap_or("")
}

/// For handlers without multi-cluster support: reject a cluster argument
/// they cannot honour. `None` means usable.
pub fn validate_cluster_param(server: &ServerContext, cluster: &str) -> Option<String> {
    if cluster.is_empty() {
        return None;
    }
    if server.federation().is_none() {
        return Some(FEDERATION_DISABLED.to_string());
    }
    if validate_cluster_name(cluster).is_err() {
        return Some(INVALID_CLUSTER_NAME.to_string());
    }
    None
}

/// `<prefix>: <err>`, plus the impersonated identity when there is one, to
/// make RBAC denials diagnosable.
pub fn format_k8s_error(prefix: &str, err: impl fmt::Display, user: Option<&UserInfo>) -> String {
    let mut msg = format!("{}: {}", prefix, err);
    if let Some(user) = user.filter(|u| !u.email.is_empty()) {
        msg.push_str(&format!(" (impersonating user={}", user.email));
        if !user.groups.is_empty() {
            msg.push_str(&format!(", groups=[{}]", user.groups.join(", ")));
        }
        msg.push(')');
    }
    msg
}
