use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

pub const MAX_CLUSTER_NAME_LENGTH: usize = 253;

lazy_static! {
    /// DNS-subdomain grammar: dot-separated labels, alphanumeric at both ends.
    static ref CLUSTER_NAME: Regex =
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").unwrap();
}

/// Rejected cluster name. `value` is truncated so logs never carry a full payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid cluster name{}: {reason}", display_value(.value))]
pub struct ClusterNameError {
    pub value: String,
    pub reason: String,
}

fn display_value(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!(" {:?}", value)
    }
}

fn truncate_for_error(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max).collect();
    format!("{}...", head)
}

pub fn validate_cluster_name(name: &str) -> Result<(), ClusterNameError> {
    let fail = |reason: String| ClusterNameError {
        value: truncate_for_error(name, 20),
        reason,
    };

    if name.is_empty() {
        return Err(ClusterNameError {
            value: String::new(),
            reason: "cluster name cannot be empty".into(),
        });
    }

    if name.len() > MAX_CLUSTER_NAME_LENGTH {
        return Err(fail(format!(
            "cluster name too long (max {} characters)",
            MAX_CLUSTER_NAME_LENGTH
        )));
    }

    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(fail("cluster name contains invalid path characters".into()));
    }

    if !CLUSTER_NAME.is_match(name) {
        return Err(fail(
            "cluster name must consist of lowercase alphanumeric characters, '-' or '.', \
             and must start and end with an alphanumeric character"
                .into(),
        ));
    }

    Ok(())
}

/// Stable, non-reversible handle for an email in logs: `user:<16 hex chars>`.
pub fn anonymize_email(email: &str) -> String {
    if email.is_empty() {
        return String::new();
    }
    let digest = Sha256::digest(email.as_bytes());
    format!("user:{}", hex::encode(&digest[..8]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dns_style_names() {
        for name in ["prod-wc-01", "a", "cluster.eu-west.example", "x1"] {
            assert!(validate_cluster_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_bad_names() {
        for name in [
            "",
            "../escape",
            "a/b",
            "a\\b",
            "UPPERCASE",
            "cluster_underscore",
            "-leading-dash",
            "trailing-",
            ".dot",
        ] {
            assert!(validate_cluster_name(name).is_err(), "{name:?}");
        }
        let long = "a".repeat(MAX_CLUSTER_NAME_LENGTH + 1);
        let err = validate_cluster_name(&long).unwrap_err();
        assert!(err.reason.contains("too long"));
        assert!(err.value.len() < 30);
    }

    #[test]
    fn error_text_mentions_invalid_cluster_name() {
        let err = validate_cluster_name("Bad").unwrap_err();
        assert!(err.to_string().starts_with("invalid cluster name"));
    }

    #[test]
    fn anonymize_is_stable_and_hides_email() {
        let a = anonymize_email("jane@example.com");
        assert_eq!(a, anonymize_email("jane@example.com"));
        assert!(a.starts_with("user:"));
        assert_eq!(a.len(), "user:".len() + 16);
        assert!(!a.contains("jane"));
        assert_eq!(anonymize_email(""), "");
    }
}
