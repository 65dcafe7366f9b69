use std::time::Duration;

use thiserror::Error;

use super::validation::{anonymize_email, ClusterNameError};

/// One message for every "cluster missing / broken" case, so callers cannot
/// tell a non-existent cluster from an inaccessible one.
pub const USER_FACING_CLUSTER_ERROR: &str = "cluster access denied or unavailable";

/// Failure modes of the federation collaborator.
///
/// The `Display` text is for server logs. Emails are anonymised but hosts and
/// cluster names are kept, so it must never be returned to a tool caller.
#[derive(Debug, Error)]
pub enum FederationError {
    #[error("cluster {cluster:?} not found{}: {reason}", in_namespace(.namespace))]
    ClusterNotFound {
        cluster: String,
        namespace: String,
        reason: String,
    },

    #[error("kubeconfig error for cluster {cluster:?} (secret {namespace}/{secret}): {reason}")]
    Kubeconfig {
        cluster: String,
        secret: String,
        namespace: String,
        reason: String,
        /// Secret missing, as opposed to present but unparseable.
        not_found: bool,
    },

    #[error("connection to cluster {cluster:?} ({host}) failed: {reason}")]
    Connection {
        cluster: String,
        host: String,
        reason: String,
    },

    #[error(
        "impersonation failed for cluster {cluster:?} (user {}, {group_count} groups): {reason}",
        anonymize_email(.user_email)
    )]
    Impersonation {
        cluster: String,
        user_email: String,
        group_count: usize,
        reason: String,
    },

    #[error(transparent)]
    AccessDenied(AccessDenied),

    #[error("access check failed for cluster {cluster:?} ({verb} {resource}): {reason}")]
    AccessCheck {
        cluster: String,
        verb: String,
        resource: String,
        reason: String,
    },

    #[error("connection to cluster {cluster:?} ({host}) timed out{}", after(.timeout))]
    ConnectivityTimeout {
        cluster: String,
        host: String,
        timeout: Option<Duration>,
    },

    #[error("TLS handshake with cluster {cluster:?} ({host}) failed: {reason}")]
    Tls {
        cluster: String,
        host: String,
        reason: String,
    },

    #[error("cluster not found")]
    NotFound,

    #[error("cluster unreachable")]
    Unreachable,

    #[error("access denied")]
    Denied,

    #[error("connection timeout")]
    Timeout,

    #[error("TLS handshake failed")]
    TlsHandshakeFailed,

    #[error("federation manager is closed")]
    ManagerClosed,

    #[error("user info is required for impersonation")]
    UserInfoRequired,

    #[error(transparent)]
    InvalidClusterName(#[from] ClusterNameError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn in_namespace(ns: &str) -> String {
    if ns.is_empty() {
        String::new()
    } else {
        format!(" in namespace {:?}", ns)
    }
}

fn after(timeout: &Option<Duration>) -> String {
    match timeout {
        Some(d) if !d.is_zero() => format!(" after {:?}", d),
        _ => String::new(),
    }
}

/// RBAC denial reported by an access review on the target cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error(
    "access denied: user {} cannot {verb} {} in {} on cluster {cluster:?}: {reason}",
    anonymize_email(.user_email),
    target_of(.api_group, .resource, .name),
    location_of(.namespace)
)]
pub struct AccessDenied {
    pub cluster: String,
    pub user_email: String,
    pub verb: String,
    pub resource: String,
    pub api_group: String,
    pub namespace: String,
    pub name: String,
    pub reason: String,
}

fn target_of(api_group: &str, resource: &str, name: &str) -> String {
    let mut target = if api_group.is_empty() {
        resource.to_string()
    } else {
        format!("{}/{}", api_group, resource)
    };
    if !name.is_empty() {
        target.push('/');
        target.push_str(name);
    }
    target
}

fn location_of(namespace: &str) -> String {
    if namespace.is_empty() {
        "cluster-wide".to_string()
    } else {
        format!("namespace {}", namespace)
    }
}

impl AccessDenied {
    pub fn user_facing_error(&self) -> String {
        let location = if self.namespace.is_empty() {
            String::new()
        } else {
            format!(" in namespace {:?}", self.namespace)
        };
        format!(
            "permission denied: you cannot {} {}{} - please contact your administrator to request access",
            self.verb,
            target_of(&self.api_group, &self.resource, &self.name),
            location
        )
    }
}

impl FederationError {
    /// Caller-safe text for the detailed variants. Bare variants return `None`;
    /// their message depends on the cluster the caller asked for.
    pub fn user_facing_error(&self) -> Option<String> {
        let msg = match self {
            Self::ClusterNotFound { .. } | Self::Kubeconfig { .. } | Self::Connection { .. } => {
                USER_FACING_CLUSTER_ERROR.to_string()
            }
            Self::Impersonation { .. } => "insufficient permissions to access this cluster - \
                 please contact your administrator to verify your RBAC configuration"
                .to_string(),
            Self::AccessDenied(denied) => denied.user_facing_error(),
            Self::AccessCheck { .. } => {
                "unable to verify permissions - please try again or contact your administrator"
                    .to_string()
            }
            Self::ConnectivityTimeout { .. } => "connection to cluster timed out - \
                 please verify the cluster is reachable from the management cluster"
                .to_string(),
            Self::Tls { reason, .. } => tls_user_message(reason).to_string(),
            _ => return None,
        };
        Some(msg)
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied(_) | Self::Denied)
    }

    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Tls { .. } | Self::TlsHandshakeFailed
        )
    }
}

fn tls_user_message(reason: &str) -> &'static str {
    if reason.contains("expired") {
        "cluster certificate has expired - please contact your administrator to renew the certificate"
    } else if reason.contains("unknown authority") {
        "cluster certificate not trusted - please verify the kubeconfig contains the correct CA certificate"
    } else if reason.contains("mismatch") || reason.contains("doesn't match") {
        "cluster certificate doesn't match the hostname - please contact your administrator"
    } else {
        "secure connection to cluster failed - please contact your administrator"
    }
}
