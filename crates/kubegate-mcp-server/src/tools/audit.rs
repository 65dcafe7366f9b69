use std::sync::Arc;

use async_trait::async_trait;
use kubegate_core::audit::{AuditSink, ToolInvocation};
use kubegate_core::security::ToolArguments;

use super::{SharedHandler, ToolHandler, ToolRequest, ToolResult};
use crate::auth::RequestContext;

/// Keys that carry the target resource name, most specific first.
const RESOURCE_NAME_KEYS: &[&str] = &["name", "podName", "resourceName", "pattern", "sessionID"];
const CLUSTER_KEYS: &[&str] = &["cluster", "kubeContext", "context"];

/// Record every call of `handler` as a [`ToolInvocation`] on `sink`.
///
/// Without a sink the handler is returned unchanged.
pub fn wrap_with_audit_logging(
    tool_name: impl Into<String>,
    handler: SharedHandler,
    sink: Option<Arc<dyn AuditSink>>,
) -> SharedHandler {
    match sink {
        Some(sink) => Arc::new(Audited {
            tool_name: tool_name.into(),
            inner: handler,
            sink,
        }),
        None => handler,
    }
}

struct Audited {
    tool_name: String,
    inner: SharedHandler,
    sink: Arc<dyn AuditSink>,
}

#[async_trait]
impl ToolHandler for Audited {
    async fn call(&self, ctx: RequestContext, request: ToolRequest) -> anyhow::Result<ToolResult> {
        let mut invocation = ToolInvocation::new(self.tool_name.as_str());
        if let Some(trace) = ctx.trace() {
            invocation = invocation.with_trace(&trace.trace_id, &trace.span_id);
        }
        if let Some(identity) = ctx.identity() {
            invocation = invocation.with_user(identity.email.as_str(), identity.groups.clone());
        }
        let invocation = describe_target(invocation, &request.arguments);

        let outcome = self.inner.call(ctx, request).await;

        let invocation = match &outcome {
            Err(e) => invocation.complete_with_error(e),
            Ok(result) if result.is_error => {
                invocation.complete(false, result.first_text().map(str::to_string))
            }
            Ok(_) => invocation.complete_success(),
        };
        self.sink.log_tool_invocation(&invocation);

        outcome
    }
}

fn describe_target(invocation: ToolInvocation, args: &ToolArguments) -> ToolInvocation {
    let invocation = match args.first_non_empty(CLUSTER_KEYS) {
        Some(cluster) => invocation.with_cluster(cluster),
        None => invocation,
    };
    invocation.with_resource(
        args.str("namespace").unwrap_or_default(),
        args.str("resourceType").unwrap_or_default(),
        args.first_non_empty(RESOURCE_NAME_KEYS).unwrap_or_default(),
    )
}
