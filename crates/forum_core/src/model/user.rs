//! User account model.
//!
//! # Responsibility
//! - Define the account record shared by regular members and admins.
//! - Validate account fields against the campus email policy.
//!
//! # Invariants
//! - `is_admin` is a capability flag, not a separate entity kind.
//! - `is_deleted` is the source of truth for account tombstone state; it never
//!   implies anything about the user's already-deleted posts.

use crate::config::CoreConfig;
use crate::model::forum::ForumId;
use crate::model::post::PostId;
use crate::model::reaction::ReactionId;
use crate::model::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Stable identifier for a user account.
pub type UserId = Uuid;

/// Allowed characters for the local part of a campus email address.
static EMAIL_LOCAL_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+$").expect("static email pattern must compile"));

/// Canonical in-memory account record.
///
/// Owned collections hold ids only; the entities behind them resolve through
/// the identity registry so every access path observes one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub major: String,
    pub year: i64,
    pub first_name: String,
    pub last_name: String,
    pub is_deleted: bool,
    pub is_admin: bool,
    pub created_at: i64,
    /// Posts (including comments) authored by this user, in creation order.
    pub posts: Vec<PostId>,
    /// Forums this user has joined.
    pub forums: BTreeSet<ForumId>,
    /// Reactions made by this user.
    pub reactions: Vec<ReactionId>,
}

/// Validated input for account creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub major: String,
    pub year: i64,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
}

impl NewUser {
    /// Builds a member-account request with empty display names.
    pub fn member(username: &str, email: &str, major: &str, year: i64) -> Self {
        Self {
            username: username.to_string(),
            email: email.to_string(),
            major: major.to_string(),
            year,
            first_name: String::new(),
            last_name: String::new(),
            is_admin: false,
        }
    }

    /// Builds an admin-account request with empty display names.
    pub fn admin(username: &str, email: &str, major: &str, year: i64) -> Self {
        Self {
            is_admin: true,
            ..Self::member(username, email, major, year)
        }
    }

    /// Validates account fields against the configured campus policy.
    ///
    /// # Errors
    /// - `EmptyField` for blank username/major.
    /// - `InvalidEmail` for addresses outside the institutional domain or with
    ///   an empty/malformed local part.
    /// - `NonPositiveYear` for `year < 1`.
    pub fn validate(&self, config: &CoreConfig) -> Result<(), ValidationError> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::EmptyField("username"));
        }
        if self.major.trim().is_empty() {
            return Err(ValidationError::EmptyField("major"));
        }
        if self.year < 1 {
            return Err(ValidationError::NonPositiveYear(self.year));
        }
        validate_campus_email(&self.email, &config.institution_domain)?;
        Ok(())
    }
}

impl User {
    /// Materializes a user with a generated id and validated fields.
    pub fn new(request: &NewUser, created_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: request.username.clone(),
            email: request.email.clone(),
            major: request.major.clone(),
            year: request.year,
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            is_deleted: false,
            is_admin: request.is_admin,
            created_at,
            posts: Vec::new(),
            forums: BTreeSet::new(),
            reactions: Vec::new(),
        }
    }

    /// One-line account summary used by profile rendering.
    pub fn account_info(&self) -> String {
        let status = if self.is_deleted { " [DELETED]" } else { "" };
        format!(
            "User ID: {}, Username: {}{}, Email: {}, Major: {}, Year: {}",
            self.id, self.username, status, self.email, self.major, self.year
        )
    }

    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}

/// Checks that `email` is a well-formed address on `domain`.
pub fn validate_campus_email(email: &str, domain: &str) -> Result<(), ValidationError> {
    let suffix = format!("@{domain}");
    let Some(local) = email.strip_suffix(suffix.as_str()) else {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    };
    if local.is_empty() || !EMAIL_LOCAL_PART.is_match(local) {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }
    Ok(())
}
