use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::federation::UserInfo;

/// Authenticated caller, as extracted from the request's auth context.
///
/// Lives only as long as the request. Absence is a normal state
/// (service-identity mode).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    #[serde(default)]
    pub groups: Vec<String>,
    /// Subject claim of the token, when the provider supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl Identity {
    pub fn new(email: impl Into<String>, groups: Vec<String>) -> Self {
        Self {
            email: email.into(),
            groups,
            subject: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Shape expected by the federation collaborator for impersonation.
    pub fn to_federation_user(&self) -> UserInfo {
        let mut extra = BTreeMap::new();
        if let Some(sub) = self.subject.as_deref().filter(|s| !s.is_empty()) {
            extra.insert("sub".to_string(), vec![sub.to_string()]);
        }
        UserInfo {
            email: self.email.clone(),
            groups: self.groups.clone(),
            extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_copies_groups_and_subject() {
        let id = Identity::new("jane@example.com", vec!["team-a".into(), "team-b".into()])
            .with_subject("abc-123");
        let user = id.to_federation_user();

        assert_eq!(user.email, "jane@example.com");
        assert_eq!(user.groups, vec!["team-a", "team-b"]);
        assert_eq!(user.extra.get("sub"), Some(&vec!["abc-123".to_string()]));
    }

    #[test]
    fn conversion_without_subject_has_no_extra() {
        let user = Identity::new("a@b.c", vec![]).to_federation_user();
        assert!(user.extra.is_empty());
        assert!(user.groups.is_empty());
    }
}
