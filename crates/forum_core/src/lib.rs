//! Core domain logic for the course forum system.
//! This crate is the single source of truth for business invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod registry;
pub mod repo;
pub mod service;

pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::forum::{Forum, ForumId};
pub use model::post::{Post, PostId, DELETED_MESSAGE};
pub use model::reaction::{Reaction, ReactionId, ReactionKind};
pub use model::user::{NewUser, User, UserId};
pub use model::ValidationError;
pub use registry::{EntityKind, EntityRegistry};
pub use repo::{
    ForumRepository, MemberSet, PostRepository, RepoError, RepoResult, SqliteForumRepository,
    SqlitePostRepository, SqliteUserRepository, UserRepository,
};
pub use service::{
    AccountService, ContentService, DomainError, DomainResult, MembershipService,
    ModerationService,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
