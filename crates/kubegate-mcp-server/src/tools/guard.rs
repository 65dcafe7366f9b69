use std::sync::Arc;

use async_trait::async_trait;
use kubegate_core::errors::sanitize_error;
use kubegate_core::security::{OperationRequest, Validator};

use super::{SharedHandler, ToolHandler, ToolRequest, ToolResult};
use crate::auth::RequestContext;

/// Run `validator` on the call's arguments before `handler`. A rejected call
/// never reaches the handler and comes back as a tool error.
pub fn wrap_with_validation(validator: Arc<Validator>, handler: SharedHandler) -> SharedHandler {
    Arc::new(Validated {
        validator,
        inner: handler,
    })
}

struct Validated {
    validator: Arc<Validator>,
    inner: SharedHandler,
}

#[async_trait]
impl ToolHandler for Validated {
    async fn call(&self, ctx: RequestContext, request: ToolRequest) -> anyhow::Result<ToolResult> {
        let checked = OperationRequest::from_arguments(&request.arguments)
            .and_then(|op| self.validator.validate_operation(&op).map(|()| op));

        match checked {
            Ok(op) => {
                tracing::debug!(
                    tool = %request.name,
                    operation = %op.operation,
                    resource = %op.resource,
                    "operation validated"
                );
                self.inner.call(ctx, request).await
            }
            Err(e) => {
                tracing::warn!(
                    tool = %request.name,
                    kind = %e.kind(),
                    stage = ?e.stage(),
                    error = %e,
                    "operation rejected"
                );
                Ok(ToolResult::error(format!(
                    "operation not authorized: {}",
                    sanitize_error(&e)
                )))
            }
        }
    }
}
