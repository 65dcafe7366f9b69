//! Server-lifetime state and per-call credential resolution.

use std::sync::{Arc, RwLock};

use kubegate_core::audit::{AuditSink, FileAuditSink, TracingAuditSink};
use kubegate_core::federation::ClusterClientManager;
use kubegate_core::kube::{ClientFactory, KubeClient};
use kubegate_core::security::{Authorizer, CredentialManager, Validator};
use kubegate_core::ErrorKind;
use thiserror::Error;
use tokio::sync::watch;

use super::sessions::SessionRegistry;
use crate::auth::RequestContext;
use crate::config::ServerConfig;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("kubernetes client is required")]
    MissingK8sClient,

    #[error("invalid server configuration: {0:#}")]
    InvalidConfig(anyhow::Error),
}

/// Why credential resolution produced no client.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("authentication required: no OAuth token in request context")]
    OAuthTokenMissing,

    #[error("authentication failed: could not create client from OAuth token")]
    OAuthClientFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("request cancelled before client resolution completed")]
    Cancelled,

    #[error("server context has been shut down")]
    Unavailable,
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OAuthTokenMissing => ErrorKind::OAuthTokenMissing,
            Self::OAuthClientFailed { .. } => ErrorKind::OAuthClientFailed,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Unavailable => ErrorKind::Unavailable,
        }
    }
}

/// Everything needed to build a [`ServerContext`]. Only the shared client is
/// mandatory.
pub struct ServerOptions {
    pub config: ServerConfig,
    pub k8s_client: Option<Arc<dyn KubeClient>>,
    pub client_factory: Option<Arc<dyn ClientFactory>>,
    pub federation: Option<Arc<dyn ClusterClientManager>>,
    /// Overrides the sink derived from `config.audit`.
    pub audit_sink: Option<Arc<dyn AuditSink>>,
}

impl ServerOptions {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            k8s_client: None,
            client_factory: None,
            federation: None,
            audit_sink: None,
        }
    }

    pub fn with_k8s_client(mut self, client: Arc<dyn KubeClient>) -> Self {
        self.k8s_client = Some(client);
        self
    }

    pub fn with_client_factory(mut self, factory: Arc<dyn ClientFactory>) -> Self {
        self.client_factory = Some(factory);
        self
    }

    pub fn with_federation(mut self, manager: Arc<dyn ClusterClientManager>) -> Self {
        self.federation = Some(manager);
        self
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }
}

#[derive(Debug, Default)]
struct Lifecycle {
    shut_down: bool,
}

/// Shared by every tool handler for the lifetime of the process.
///
/// Configuration and collaborators are fixed at construction. The only
/// mutable server-level state is the lifecycle flag behind `lifecycle`,
/// written at shutdown and read on every resolution.
pub struct ServerContext {
    config: ServerConfig,
    k8s_client: Arc<dyn KubeClient>,
    client_factory: Option<Arc<dyn ClientFactory>>,
    federation: Option<Arc<dyn ClusterClientManager>>,
    audit_sink: Option<Arc<dyn AuditSink>>,
    credentials: Arc<CredentialManager>,
    validator: Arc<Validator>,
    sessions: SessionRegistry,
    lifecycle: RwLock<Lifecycle>,
    shutdown_signal: watch::Sender<bool>,
}

impl std::fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerContext")
            .field("server_name", &self.config.server_name)
            .field("k8s_client", &self.k8s_client)
            .field("downstream_oauth", &self.config.downstream_oauth)
            .field("client_factory", &self.client_factory.is_some())
            .field("federation", &self.federation.is_some())
            .field("audit", &self.audit_sink.is_some())
            .field("shut_down", &self.is_shutdown())
            .finish()
    }
}

impl ServerContext {
    pub fn new(options: ServerOptions) -> Result<Self, ServerError> {
        let ServerOptions {
            config,
            k8s_client,
            client_factory,
            federation,
            audit_sink,
        } = options;

        let k8s_client = k8s_client.ok_or(ServerError::MissingK8sClient)?;
        config.validate().map_err(ServerError::InvalidConfig)?;

        let credentials = Arc::new(CredentialManager::new(config.credentials.clone()));
        if !config.in_cluster {
            credentials
                .validate_kubeconfig_path(&config.kubeconfig_path)
                .map_err(|e| ServerError::InvalidConfig(e.into()))?;
        }
        credentials
            .validate_context(&config.default_context)
            .map_err(|e| ServerError::InvalidConfig(e.into()))?;

        let validator = Validator::new(
            Authorizer::policy(config.policy_config()),
            Some(credentials.clone()),
            config.validation.clone(),
        )
        .map(Arc::new)
        .map_err(|e| ServerError::InvalidConfig(e.into()))?;

        let audit_sink = match audit_sink {
            Some(sink) => Some(sink),
            None => default_audit_sink(&config)?,
        };

        if config.downstream_oauth && client_factory.is_none() {
            tracing::warn!(
                "downstream OAuth enabled without a client factory; calls will use the shared identity"
            );
        }

        let (shutdown_signal, _) = watch::channel(false);

        Ok(Self {
            config,
            k8s_client,
            client_factory,
            federation,
            audit_sink,
            credentials,
            validator,
            sessions: SessionRegistry::new(),
            lifecycle: RwLock::new(Lifecycle::default()),
            shutdown_signal,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn validator(&self) -> &Arc<Validator> {
        &self.validator
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    /// The shared (service) identity client. Tool handlers go through
    /// [`Self::k8s_client_for_context`] instead.
    pub fn k8s_client(&self) -> &Arc<dyn KubeClient> {
        &self.k8s_client
    }

    pub fn federation(&self) -> Option<&Arc<dyn ClusterClientManager>> {
        self.federation.as_ref()
    }

    pub fn federation_enabled(&self) -> bool {
        self.federation.is_some()
    }

    pub fn audit_sink(&self) -> Option<&Arc<dyn AuditSink>> {
        self.audit_sink.as_ref()
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn downstream_oauth_enabled(&self) -> bool {
        self.config.downstream_oauth
    }

    pub fn in_cluster_mode(&self) -> bool {
        self.config.in_cluster
    }

    pub fn is_shutdown(&self) -> bool {
        self.lifecycle.read().map(|l| l.shut_down).unwrap_or(true)
    }

    /// A fresh per-call context that is cancelled when the server shuts down.
    pub fn request_context(&self) -> RequestContext {
        RequestContext::new().with_server_signal(self.shutdown_signal.subscribe())
    }

    /// Pick the client a call runs under.
    ///
    /// Downstream OAuth off, or no factory: the shared client. Otherwise the
    /// caller's token must be present and accepted by the factory; there is no
    /// fallback to the shared identity. Cancellation of `ctx` abandons client
    /// construction.
    pub async fn k8s_client_for_context(
        &self,
        ctx: &RequestContext,
    ) -> Result<Arc<dyn KubeClient>, ResolveError> {
        if self.is_shutdown() {
            return Err(ResolveError::Unavailable);
        }
        if ctx.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }

        if !self.config.downstream_oauth {
            return Ok(self.k8s_client.clone());
        }
        let Some(factory) = &self.client_factory else {
            tracing::debug!("no client factory configured, using shared client");
            return Ok(self.k8s_client.clone());
        };

        let token = match ctx.access_token() {
            Some(t) if !t.is_empty() => t,
            _ => {
                tracing::warn!("no access token in request context, denying access");
                return Err(ResolveError::OAuthTokenMissing);
            }
        };

        tokio::select! {
            biased;
            _ = ctx.done() => {
                tracing::debug!("request cancelled during client construction");
                Err(ResolveError::Cancelled)
            }
            created = factory.create_bearer_token_client(token) => match created {
                Ok(client) => {
                    tracing::debug!("created bearer token client for request");
                    Ok(client)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to create bearer token client, denying access");
                    Err(ResolveError::OAuthClientFailed { source: e.into() })
                }
            },
        }
    }

    /// Stop sessions, close the federation manager, cancel outstanding request
    /// contexts. Safe to call more than once.
    pub async fn shutdown(&self) {
        {
            let Ok(mut lifecycle) = self.lifecycle.write() else {
                return;
            };
            if lifecycle.shut_down {
                return;
            }
            lifecycle.shut_down = true;
        }

        tracing::info!("shutting down server context");

        let stopped = self.sessions.stop_all();
        if stopped > 0 {
            tracing::info!(count = stopped, "stopped port forward sessions");
        }

        if let Some(federation) = &self.federation {
            if let Err(e) = federation.close().await {
                tracing::error!(error = %e, "failed to close federation manager");
            }
        }

        self.shutdown_signal.send_replace(true);
        tracing::info!("server context shutdown complete");
    }
}

fn default_audit_sink(config: &ServerConfig) -> Result<Option<Arc<dyn AuditSink>>, ServerError> {
    if !config.audit.enabled {
        return Ok(None);
    }
    match &config.audit.path {
        Some(path) => {
            let sink = FileAuditSink::new(path).map_err(|e| {
                ServerError::InvalidConfig(anyhow::Error::new(e).context(format!(
                    "failed to open audit log {}",
                    path.display()
                )))
            })?;
            Ok(Some(Arc::new(sink)))
        }
        None => Ok(Some(Arc::new(TracingAuditSink))),
    }
}
