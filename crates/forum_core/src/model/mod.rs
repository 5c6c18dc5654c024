//! Domain entities for the course-forum core.
//!
//! # Responsibility
//! - Define the canonical in-memory shapes for users, forums, posts and
//!   reactions.
//! - Own field-level validation shared by creation paths.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID that never moves to another
//!   entity.
//! - Deletion is represented by soft-delete flags and tombstones, never by
//!   structural removal from the content tree.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod forum;
pub mod post;
pub mod reaction;
pub mod user;

/// Field-level validation failures raised before any mutation happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField(&'static str),
    InvalidEmail(String),
    NonPositiveYear(i64),
    ForbiddenContent(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "{field} must be non-empty"),
            Self::InvalidEmail(email) => write!(f, "email is not a valid campus address: {email}"),
            Self::NonPositiveYear(year) => write!(f, "enrollment year must be positive, got {year}"),
            Self::ForbiddenContent(term) => {
                write!(f, "message contains a forbidden term: {term}")
            }
        }
    }
}

impl Error for ValidationError {}

/// Current wall-clock time in epoch milliseconds.
///
/// Creation timestamps are assigned here so the in-memory entity and the
/// persisted row carry the same value.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
