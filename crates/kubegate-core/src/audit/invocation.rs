use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use super::cardinality::{classify_cluster_name, extract_user_domain, ClusterType};

/// One tool call, from start to completion.
///
/// Built by the audit wrapper with the `with_*` methods, finished with one of
/// the `complete*` methods, then handed to an [`super::AuditSink`].
#[derive(Debug, Clone, Serialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub invocation_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(rename = "duration_ms", serialize_with = "duration_millis")]
    pub duration: Duration,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_email: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_groups: Vec<String>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resource_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resource_name: String,

    pub success: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub trace_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub span_id: String,

    #[serde(skip)]
    started: Instant,
}

fn duration_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl ToolInvocation {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            invocation_id: uuid::Uuid::new_v4().to_string(),
            start_time: Utc::now(),
            duration: Duration::ZERO,
            user_email: String::new(),
            user_groups: Vec::new(),
            cluster_name: String::new(),
            namespace: String::new(),
            resource_type: String::new(),
            resource_name: String::new(),
            success: false,
            error: String::new(),
            trace_id: String::new(),
            span_id: String::new(),
            started: Instant::now(),
        }
    }

    pub fn with_user(mut self, email: impl Into<String>, groups: Vec<String>) -> Self {
        self.user_email = email.into();
        self.user_groups = groups;
        self
    }

    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster_name = cluster.into();
        self
    }

    pub fn with_resource(
        mut self,
        namespace: impl Into<String>,
        resource_type: impl Into<String>,
        resource_name: impl Into<String>,
    ) -> Self {
        self.namespace = namespace.into();
        self.resource_type = resource_type.into();
        self.resource_name = resource_name.into();
        self
    }

    /// Attach trace correlation ids. Empty ids are ignored.
    pub fn with_trace(mut self, trace_id: &str, span_id: &str) -> Self {
        if !trace_id.is_empty() {
            self.trace_id = trace_id.to_string();
        }
        if !span_id.is_empty() {
            self.span_id = span_id.to_string();
        }
        self
    }

    pub fn complete(mut self, success: bool, error: Option<String>) -> Self {
        self.duration = self.started.elapsed();
        self.success = success;
        self.error = error.unwrap_or_default();
        self
    }

    pub fn complete_success(self) -> Self {
        self.complete(true, None)
    }

    pub fn complete_with_error(self, error: impl std::fmt::Display) -> Self {
        self.complete(false, Some(error.to_string()))
    }

    pub fn user_domain(&self) -> &str {
        extract_user_domain(&self.user_email)
    }

    pub fn cluster_type(&self) -> ClusterType {
        classify_cluster_name(&self.cluster_name)
    }

    pub fn status(&self) -> &'static str {
        if self.success {
            "success"
        } else {
            "error"
        }
    }

    /// Fields safe for indexed logs and metrics labels: no emails, no cluster
    /// names, no resource names.
    pub fn log_attrs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("tool", self.tool_name.clone()),
            ("user_domain", self.user_domain().to_string()),
            ("group_count", self.user_groups.len().to_string()),
            ("cluster_type", self.cluster_type().to_string()),
            ("duration_ms", self.duration.as_millis().to_string()),
            ("success", self.success.to_string()),
        ]
    }

    /// Full record for the audit trail.
    pub fn audit_attrs(&self) -> Map<String, Value> {
        let mut attrs = Map::new();
        attrs.insert("invocation_id".into(), json!(self.invocation_id));
        attrs.insert("tool".into(), json!(self.tool_name));
        attrs.insert("start_time".into(), json!(self.start_time.to_rfc3339()));
        attrs.insert(
            "duration_ms".into(),
            json!(self.duration.as_millis() as u64),
        );
        attrs.insert("user_email".into(), json!(self.user_email));
        attrs.insert("user_groups".into(), json!(self.user_groups));
        attrs.insert("cluster".into(), json!(self.cluster_name));
        attrs.insert("cluster_type".into(), json!(self.cluster_type()));
        attrs.insert("namespace".into(), json!(self.namespace));
        attrs.insert("resource_type".into(), json!(self.resource_type));
        attrs.insert("resource_name".into(), json!(self.resource_name));
        attrs.insert("status".into(), json!(self.status()));
        if !self.error.is_empty() {
            attrs.insert("error".into(), json!(self.error));
        }
        if !self.trace_id.is_empty() {
            attrs.insert("trace_id".into(), json!(self.trace_id));
        }
        if !self.span_id.is_empty() {
            attrs.insert("span_id".into(), json!(self.span_id));
        }
        attrs
    }
}
