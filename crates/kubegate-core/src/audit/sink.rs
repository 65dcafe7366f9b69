use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use super::ToolInvocation;

/// Receives every completed tool invocation.
pub trait AuditSink: Send + Sync {
    fn log_tool_invocation(&self, invocation: &ToolInvocation);
}

/// Structured `info` event under target `kubegate::audit`.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn log_tool_invocation(&self, inv: &ToolInvocation) {
        tracing::info!(
            target: "kubegate::audit",
            invocation_id = %inv.invocation_id,
            tool = %inv.tool_name,
            user_email = %inv.user_email,
            user_domain = %inv.user_domain(),
            group_count = inv.user_groups.len(),
            cluster = %inv.cluster_name,
            cluster_type = %inv.cluster_type(),
            namespace = %inv.namespace,
            resource_type = %inv.resource_type,
            resource_name = %inv.resource_name,
            duration_ms = inv.duration.as_millis() as u64,
            status = inv.status(),
            error = %inv.error,
            trace_id = %inv.trace_id,
            span_id = %inv.span_id,
            "tool invocation"
        );
    }
}

/// Append-only NDJSON audit trail.
pub struct FileAuditSink {
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    pub fn new(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn log_tool_invocation(&self, inv: &ToolInvocation) {
        match serde_json::to_string(inv) {
            Ok(line) => {
                // Whole lines are written under the lock, so a poisoned
                // guard still holds a consistent file.
                let mut f = self.file.lock().unwrap_or_else(|poisoned| {
                    tracing::error!("audit file lock poisoned, recovering");
                    poisoned.into_inner()
                });
                if let Err(e) = writeln!(f, "{}", line) {
                    tracing::warn!(error = %e, "failed to write audit record");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize audit record"),
        }
    }
}

pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn log_tool_invocation(&self, _invocation: &ToolInvocation) {}
}
