use kubegate_core::ErrorKind;

use crate::server::ResolveError;

/// Caller-facing text for a failed credential resolution.
pub fn format_authentication_error(err: &ResolveError) -> String {
    match err.kind() {
        ErrorKind::OAuthTokenMissing => {
            "authentication required: please log in to access this resource".to_string()
        }
        ErrorKind::OAuthClientFailed => {
            "authentication failed: your session may have expired, please log in again".to_string()
        }
        _ => "authentication error: unable to verify your credentials".to_string(),
    }
}

pub fn is_authentication_error(err: &ResolveError) -> bool {
    matches!(
        err.kind(),
        ErrorKind::OAuthTokenMissing | ErrorKind::OAuthClientFailed
    )
}
