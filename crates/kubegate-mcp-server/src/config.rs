use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use kubegate_core::security::{CredentialConfig, PolicyConfig, ValidationRules};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => bail!("unknown log format '{}' (expected json or text)", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,
    /// NDJSON audit trail. When unset, records go to the log stream.
    pub path: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

/// Process-wide server settings. Loaded once at startup, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server_name: String,
    pub version: String,

    /// Namespace for namespaced resources when a call names none.
    pub default_namespace: String,
    pub kubeconfig_path: PathBuf,
    pub default_context: String,
    pub in_cluster: bool,

    pub non_destructive_mode: bool,
    pub dry_run: bool,

    pub log_level: String,
    pub log_format: LogFormat,

    pub allowed_operations: Vec<String>,
    pub restricted_namespaces: Vec<String>,
    /// Run every call under the caller's own token (always fail-closed).
    pub downstream_oauth: bool,

    pub credentials: CredentialConfig,
    pub validation: ValidationRules,
    pub audit: AuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_name: "kubegate".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            default_namespace: "default".to_string(),
            kubeconfig_path: PathBuf::new(),
            default_context: String::new(),
            in_cluster: false,
            non_destructive_mode: true,
            dry_run: false,
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            allowed_operations: vec!["get".into(), "list".into(), "describe".into()],
            restricted_namespaces: vec!["kube-system".into(), "kube-public".into()],
            downstream_oauth: false,
            credentials: CredentialConfig::default(),
            validation: ValidationRules::default(),
            audit: AuditConfig::default(),
        }
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{} must be a boolean, got '{}'", name, other),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ServerConfig {
    /// Load YAML from `path`, overlay `KUBEGATE_*` variables, then validate.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut cfg: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        cfg.normalize();
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults overlaid with `KUBEGATE_*` variables.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(v) = env::var("KUBEGATE_NON_DESTRUCTIVE") {
            self.non_destructive_mode = parse_bool("KUBEGATE_NON_DESTRUCTIVE", &v)?;
        }
        if let Ok(v) = env::var("KUBEGATE_DRY_RUN") {
            self.dry_run = parse_bool("KUBEGATE_DRY_RUN", &v)?;
        }
        if let Ok(v) = env::var("KUBEGATE_ALLOWED_OPERATIONS") {
            self.allowed_operations = parse_list(&v);
        }
        if let Ok(v) = env::var("KUBEGATE_RESTRICTED_NAMESPACES") {
            self.restricted_namespaces = parse_list(&v);
        }
        if let Ok(v) = env::var("KUBEGATE_DOWNSTREAM_OAUTH") {
            self.downstream_oauth = parse_bool("KUBEGATE_DOWNSTREAM_OAUTH", &v)?;
        }
        if let Ok(v) = env::var("KUBEGATE_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Ok(v) = env::var("KUBEGATE_LOG_FORMAT") {
            self.log_format = v.parse()?;
        }
        if let Ok(v) = env::var("KUBEGATE_KUBECONFIG") {
            self.kubeconfig_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("KUBEGATE_CONTEXT") {
            self.default_context = v;
        }
        if let Ok(v) = env::var("KUBEGATE_AUDIT_PATH") {
            self.audit.path = if v.is_empty() {
                None
            } else {
                Some(PathBuf::from(v))
            };
        }
        self.normalize();
        Ok(())
    }

    fn normalize(&mut self) {
        for op in &mut self.allowed_operations {
            *op = op.trim().to_lowercase();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_name.trim().is_empty() {
            bail!("server_name must not be empty");
        }
        if self.allowed_operations.iter().any(|o| o.trim().is_empty()) {
            bail!("allowed_operations must not contain blank entries");
        }
        if let Some(op) = self
            .allowed_operations
            .iter()
            .find(|o| **o != o.to_lowercase())
        {
            bail!("allowed operation '{}' must be lower-case", op);
        }
        if self.default_namespace.trim().is_empty() {
            bail!("default_namespace must not be empty");
        }
        if self.restricted_namespaces.iter().any(|n| n.trim().is_empty()) {
            bail!("restricted_namespaces must not contain blank entries");
        }
        if self.validation.max_name_length == 0 {
            bail!("validation.max_name_length must be greater than zero");
        }
        self.validation
            .compile_patterns()
            .context("invalid validation.forbidden_name_patterns")?;
        Ok(())
    }

    pub fn policy_config(&self) -> PolicyConfig {
        PolicyConfig {
            allowed_operations: self.allowed_operations.clone(),
            restricted_namespaces: self.restricted_namespaces.clone(),
            non_destructive_mode: self.non_destructive_mode,
            dry_run_mode: self.dry_run,
        }
    }
}
