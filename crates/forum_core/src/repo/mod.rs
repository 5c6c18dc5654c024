//! Repository layer: persistence contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the abstract capability set the domain core consumes from its
//!   persistence collaborator (find/create/update, relationship-edge
//!   primitives).
//! - Keep SQL details out of the service layer.
//!
//! # Invariants
//! - Zero-row updates surface as `RepoError::NotFound`, never silently.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::registry::EntityKind;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod forum_repo;
pub mod post_repo;
pub mod user_repo;

pub use forum_repo::{ForumRecord, ForumRepository, MemberSet, SqliteForumRepository};
pub use post_repo::{PostRecord, PostRepository, ReactionRecord, SqlitePostRepository};
pub use user_repo::{SqliteUserRepository, UserRecord, UserRepository};

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for forum-domain persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(EntityKind, Uuid),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(kind, id) => write!(f, "{kind} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(..) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn parse_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}
