#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kubegate_core::audit::{AuditSink, ToolInvocation};
use kubegate_core::federation::{ClusterClientManager, FederationError, UserInfo};
use kubegate_core::kube::{ClientFactory, DynamicClient, KubeClient};
use kubegate_core::security::RestConfig;
use kubegate_mcp_server::{ServerConfig, ServerContext, ServerOptions};

pub const SHARED_HOST: &str = "https://shared.cluster.local";

#[derive(Debug)]
pub struct FakeKube {
    pub host: String,
}

impl KubeClient for FakeKube {
    fn host(&self) -> &str {
        &self.host
    }
}

#[derive(Debug)]
pub struct FakeDynamic {
    pub host: String,
}

impl DynamicClient for FakeDynamic {
    fn host(&self) -> &str {
        &self.host
    }
}

pub fn shared_client() -> Arc<dyn KubeClient> {
    Arc::new(FakeKube {
        host: SHARED_HOST.to_string(),
    })
}

/// Builds per-caller clients whose host embeds the token, so tests can tell
/// which identity a client runs under.
#[derive(Default)]
pub struct FakeFactory {
    pub calls: AtomicUsize,
    pub fail: bool,
    pub delay: Option<Duration>,
}

impl FakeFactory {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientFactory for FakeFactory {
    async fn create_bearer_token_client(&self, token: &str) -> anyhow::Result<Arc<dyn KubeClient>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            anyhow::bail!("token rejected by https://10.0.0.1:6443");
        }
        Ok(Arc::new(FakeKube {
            host: format!("per-caller:{}", token),
        }))
    }
}

/// Federation collaborator counting every call. `error` builds the failure
/// returned by `get_client`.
#[derive(Default)]
pub struct FakeFederation {
    pub calls: AtomicUsize,
    pub closes: AtomicUsize,
    pub error: Option<fn() -> FederationError>,
    pub delay: Option<Duration>,
    pub last_user: Mutex<Option<UserInfo>>,
}

impl FakeFederation {
    pub fn failing(error: fn() -> FederationError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterClientManager for FakeFederation {
    async fn get_client(
        &self,
        cluster: &str,
        user: &UserInfo,
    ) -> Result<Arc<dyn KubeClient>, FederationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(make) = self.error {
            return Err(make());
        }
        *self.last_user.lock().unwrap() = Some(user.clone());
        Ok(Arc::new(FakeKube {
            host: format!("https://{}.clusters.local", cluster),
        }))
    }

    async fn get_dynamic_client(
        &self,
        cluster: &str,
        _user: &UserInfo,
    ) -> Result<Arc<dyn DynamicClient>, FederationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeDynamic {
            host: format!("https://{}.clusters.local", cluster),
        }))
    }

    async fn get_rest_config(&self, cluster: &str, user: &UserInfo) -> Result<RestConfig, FederationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut config = RestConfig::new(format!("https://{}.clusters.local", cluster));
        config.impersonate.user_name = user.email.clone();
        config.impersonate.groups = user.groups.clone();
        Ok(config)
    }

    async fn close(&self) -> Result<(), FederationError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Keeps every invocation it receives.
#[derive(Default)]
pub struct RecordingSink {
    pub records: Mutex<Vec<ToolInvocation>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<ToolInvocation> {
        std::mem::take(&mut *self.records.lock().unwrap())
    }
}

impl AuditSink for RecordingSink {
    fn log_tool_invocation(&self, invocation: &ToolInvocation) {
        self.records.lock().unwrap().push(invocation.clone());
    }
}

/// Quiet config: no audit sink unless a test adds one.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.audit.enabled = false;
    config
}

pub fn oauth_config() -> ServerConfig {
    let mut config = test_config();
    config.downstream_oauth = true;
    config
}

pub fn server(options: ServerOptions) -> ServerContext {
    ServerContext::new(options.with_k8s_client(shared_client())).unwrap()
}
