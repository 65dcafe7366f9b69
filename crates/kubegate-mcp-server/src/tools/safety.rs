use crate::config::ServerConfig;

use super::ToolResult;

/// Gate for handlers with side effects (create, apply, delete, patch, scale,
/// exec, port-forward). `None` means the operation may proceed.
///
/// Allowed when non-destructive mode is off, dry-run is on, or the operation
/// is explicitly listed in `allowed_operations`. Read-only handlers never
/// call this.
pub fn check_mutating_operation(config: &ServerConfig, operation: &str) -> Option<ToolResult> {
    if !config.non_destructive_mode || config.dry_run {
        return None;
    }
    let operation = operation.to_lowercase();
    if config.allowed_operations.iter().any(|op| *op == operation) {
        return None;
    }
    Some(ToolResult::error(format!(
        "{} operations are not allowed in non-destructive mode (use --dry-run to validate without applying)",
        title_case(&operation)
    )))
}

/// Upper-case the first letter of each word, lower-case the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut word_start = true;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(c);
            word_start = true;
        }
    }
    out
}
