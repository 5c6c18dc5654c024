//! Core configuration.
//!
//! # Responsibility
//! - Carry the policy constants the domain core needs: institutional email
//!   domain, forbidden-content terms, and the sentinel deleted-user identity.
//!
//! # Invariants
//! - The sentinel identity fields are constant for the process lifetime; the
//!   sentinel entity itself is created once at initialization and passed
//!   explicitly to the services that reassign authorship.

use serde::Deserialize;

/// Policy configuration consumed by the domain services.
///
/// Deserializable so an embedding process can load it from its own settings
/// source; `Default` gives the campus deployment values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Email domain every account must belong to.
    pub institution_domain: String,
    /// Case-insensitive substring terms rejected in post messages.
    pub forbidden_terms: Vec<String>,
    /// Fixed username of the sentinel deleted user.
    pub deleted_user_name: String,
    /// Placeholder address the sentinel account is stored under.
    pub deleted_user_email: String,
    /// Placeholder major for the sentinel account.
    pub deleted_user_major: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            institution_domain: "scu.edu".to_string(),
            forbidden_terms: vec!["crypto giveaway".to_string(), "essay mill".to_string()],
            deleted_user_name: "[deleted]".to_string(),
            deleted_user_email: "deleted@scu.edu".to_string(),
            deleted_user_major: "N/A".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CoreConfig;

    #[test]
    fn default_matches_campus_deployment() {
        let config = CoreConfig::default();
        assert_eq!(config.institution_domain, "scu.edu");
        assert_eq!(config.deleted_user_name, "[deleted]");
        assert!(config.deleted_user_email.ends_with("@scu.edu"));
        assert!(!config.forbidden_terms.is_empty());
    }

    #[test]
    fn deserializes_with_partial_overrides() {
        let config: CoreConfig =
            serde_json::from_str(r#"{"institution_domain": "example.edu"}"#)
                .expect("partial config should deserialize");
        assert_eq!(config.institution_domain, "example.edu");
        assert_eq!(config.deleted_user_name, "[deleted]");
    }
}
