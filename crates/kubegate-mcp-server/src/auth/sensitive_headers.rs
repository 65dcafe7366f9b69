//! Inbound credentials never travel downstream.
//!
//! Headers for calls made on a caller's behalf are built from scratch via
//! [build_downstream_headers], or filtered with [strip_sensitive_headers]
//! when an existing set must be reused. The caller's token reaches the API
//! server only through the client factory, never as a copied header.

pub use kubegate_core::security::SENSITIVE_HEADER_NAMES;

/// True if `name` carries credentials (case-insensitive).
#[inline]
pub fn is_sensitive(name: &str) -> bool {
    kubegate_core::security::is_sensitive_header(name)
}

/// Drop every sensitive header, keeping the order of the rest.
pub fn strip_sensitive_headers<K, V>(headers: &[(K, V)]) -> Vec<(K, V)>
where
    K: AsRef<str> + Clone,
    V: Clone,
{
    headers
        .iter()
        .filter(|(k, _)| !is_sensitive(k.as_ref()))
        .cloned()
        .collect()
}

/// Headers for a downstream request, from an allow-list only.
///
/// Carries the caller's trace correlation when present, nothing else.
pub fn build_downstream_headers(traceparent: Option<&str>) -> Vec<(&'static str, String)> {
    let mut headers = Vec::new();
    if let Some(tp) = traceparent.filter(|t| !t.is_empty()) {
        headers.push(("traceparent", tp.to_string()));
    }
    headers
}
