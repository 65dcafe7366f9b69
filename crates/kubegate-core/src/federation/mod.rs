//! Contract for the multi-cluster collaborator.
//!
//! The federation manager discovers workload clusters and builds clients
//! that impersonate the caller on them. Only its interface and error kinds
//! live here.

pub mod error;
pub mod validation;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::kube::{DynamicClient, KubeClient};
use crate::security::RestConfig;

pub use error::{AccessDenied, FederationError, USER_FACING_CLUSTER_ERROR};
pub use validation::{anonymize_email, validate_cluster_name, ClusterNameError, MAX_CLUSTER_NAME_LENGTH};

/// Identity used for impersonation on a remote cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub email: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub extra: BTreeMap<String, Vec<String>>,
}

/// Per-cluster client source. Each call is independent and independently fallible.
#[async_trait]
pub trait ClusterClientManager: Send + Sync {
    async fn get_client(
        &self,
        cluster: &str,
        user: &UserInfo,
    ) -> Result<Arc<dyn KubeClient>, FederationError>;

    async fn get_dynamic_client(
        &self,
        cluster: &str,
        user: &UserInfo,
    ) -> Result<Arc<dyn DynamicClient>, FederationError>;

    async fn get_rest_config(&self, cluster: &str, user: &UserInfo) -> Result<RestConfig, FederationError>;

    /// Release cached clients. Called once at server shutdown.
    async fn close(&self) -> Result<(), FederationError> {
        Ok(())
    }
}
