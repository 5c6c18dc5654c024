//! Post and comment model.
//!
//! # Responsibility
//! - Define the message-tree node shared by top-level posts and comments.
//! - Validate message content against the forbidden-term policy.
//!
//! # Invariants
//! - A comment is a post with `parent = Some(..)`; there is no separate
//!   comment entity kind.
//! - Tombstoned nodes keep their place in the tree and keep their children;
//!   only title, message and the deleted flag change.

use crate::model::forum::ForumId;
use crate::model::reaction::ReactionId;
use crate::model::user::UserId;
use crate::model::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a post or comment.
pub type PostId = Uuid;

/// Fixed marker written over tombstoned content.
pub const DELETED_MESSAGE: &str = "[deleted]";

/// Canonical in-memory message-tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub message: String,
    pub created_at: i64,
    /// Author. Reassigned to the sentinel deleted user when the author is
    /// removed from the owning forum.
    pub poster: UserId,
    /// Owning forum. `None` for comments and for detached posts.
    pub forum: Option<ForumId>,
    /// Parent node. `Some` makes this node a comment.
    pub parent: Option<PostId>,
    /// Child comments in attach order.
    pub comments: Vec<PostId>,
    /// Reactions currently attached to this node.
    pub reactions: Vec<ReactionId>,
    pub is_deleted: bool,
}

impl Post {
    /// Materializes a new node authored by `poster`.
    ///
    /// `born_deleted` carries the poster's deletion status so that content
    /// authored by an already-deleted identity starts suppressed.
    pub fn new(poster: UserId, title: &str, message: &str, created_at: i64, born_deleted: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            message: message.to_string(),
            created_at,
            poster,
            forum: None,
            parent: None,
            comments: Vec::new(),
            reactions: Vec::new(),
            is_deleted: born_deleted,
        }
    }

    pub fn is_comment(&self) -> bool {
        self.parent.is_some()
    }

    pub fn is_tombstoned(&self) -> bool {
        self.message == DELETED_MESSAGE
    }

    /// Replaces title and message with the tombstone marker and flags the node
    /// deleted. Children and reactions are left untouched.
    pub fn tombstone(&mut self) {
        self.title = DELETED_MESSAGE.to_string();
        self.message = DELETED_MESSAGE.to_string();
        self.is_deleted = true;
    }
}

/// Validates post content before any entity is materialized.
///
/// # Errors
/// - `EmptyField` for blank title/message.
/// - `ForbiddenContent` when the message contains any configured term,
///   matched case-insensitively as a substring.
pub fn validate_content(
    title: &str,
    message: &str,
    forbidden_terms: &[String],
) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyField("title"));
    }
    if message.trim().is_empty() {
        return Err(ValidationError::EmptyField("message"));
    }

    let message_lower = message.to_lowercase();
    for term in forbidden_terms {
        if message_lower.contains(term.to_lowercase().as_str()) {
            return Err(ValidationError::ForbiddenContent(term.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_content, Post, DELETED_MESSAGE};
    use crate::model::ValidationError;
    use uuid::Uuid;

    fn terms() -> Vec<String> {
        vec!["crypto giveaway".to_string()]
    }

    #[test]
    fn validate_content_accepts_clean_message() {
        validate_content("Intro", "Hello", &terms()).expect("clean content should pass");
    }

    #[test]
    fn validate_content_rejects_blank_fields() {
        assert_eq!(
            validate_content(" ", "Hello", &terms()),
            Err(ValidationError::EmptyField("title"))
        );
        assert_eq!(
            validate_content("Intro", "", &terms()),
            Err(ValidationError::EmptyField("message"))
        );
    }

    #[test]
    fn forbidden_match_is_case_insensitive_substring() {
        let err = validate_content("Intro", "free CRYPTO Giveaway inside", &terms()).unwrap_err();
        assert!(matches!(err, ValidationError::ForbiddenContent(_)));
    }

    #[test]
    fn tombstone_replaces_content_and_keeps_children() {
        let mut post = Post::new(Uuid::new_v4(), "Q", "original", 0, false);
        let child = Uuid::new_v4();
        post.comments.push(child);

        post.tombstone();
        assert_eq!(post.title, DELETED_MESSAGE);
        assert_eq!(post.message, DELETED_MESSAGE);
        assert!(post.is_deleted);
        assert!(post.is_tombstoned());
        assert_eq!(post.comments, vec![child]);
    }

    #[test]
    fn poster_deletion_status_is_inherited_at_birth() {
        let post = Post::new(Uuid::new_v4(), "Q", "body", 0, true);
        assert!(post.is_deleted);
        assert!(!post.is_tombstoned(), "flag set, content intact");
    }
}
