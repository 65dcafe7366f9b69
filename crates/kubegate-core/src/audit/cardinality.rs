//! Low-cardinality reductions of user and cluster identifiers.
//!
//! Metrics and log indexes must not be keyed by raw emails or cluster names;
//! these helpers fold them into small fixed sets.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterType {
    Management,
    Cicd,
    Operations,
    Production,
    Staging,
    Development,
    Other,
}

impl ClusterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterType::Management => "management",
            ClusterType::Cicd => "cicd",
            ClusterType::Operations => "operations",
            ClusterType::Production => "production",
            ClusterType::Staging => "staging",
            ClusterType::Development => "development",
            ClusterType::Other => "other",
        }
    }
}

impl std::fmt::Display for ClusterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn any_prefix(name: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| name.starts_with(p))
}

fn any_contains(name: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| name.contains(n))
}

fn any_suffix(name: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|s| name.ends_with(s))
}

/// Classify a cluster name, case-insensitively. The empty name is the
/// management cluster. CI/CD is checked first since those names often embed
/// `prod` or `dev`.
pub fn classify_cluster_name(name: &str) -> ClusterType {
    if name.is_empty() {
        return ClusterType::Management;
    }
    let name = name.to_lowercase();
    let name = name.as_str();

    if name.contains("cicd") {
        return ClusterType::Cicd;
    }

    if name.contains("operations")
        || any_prefix(name, &["ops-", "ops_"])
        || name.contains("-ops-")
        || name.ends_with("-ops")
    {
        return ClusterType::Operations;
    }

    if any_prefix(name, &["prod-", "prod_"])
        || any_contains(name, &["production", "-prod-"])
        || name.ends_with("-prod")
    {
        return ClusterType::Production;
    }

    if any_prefix(name, &["staging-", "staging_", "stg-"])
        || any_contains(name, &["staging", "-stg-"])
        || name.ends_with("-stg")
    {
        return ClusterType::Staging;
    }

    if any_prefix(name, &["dev-", "dev_", "demo", "test-", "test_"])
        || any_contains(name, &["development", "-dev-", "-demo-", "-test-"])
        || any_suffix(name, &["-dev", "-test"])
    {
        return ClusterType::Development;
    }

    ClusterType::Other
}

/// Domain part of an email, or `unknown`.
pub fn extract_user_domain(email: &str) -> &str {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(domain), None) if !domain.is_empty() => domain,
        _ => "unknown",
    }
}
