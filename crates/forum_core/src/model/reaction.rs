//! Reaction model.
//!
//! # Responsibility
//! - Define the fixed reaction vocabulary and the per-parent uniqueness rule.
//!
//! # Invariants
//! - Domain equality of a reaction is `(kind, user)`, never the persistent id.
//!   At most one reaction per `(kind, user)` pair may exist on one parent's
//!   active set.

use crate::model::post::PostId;
use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a reaction row.
pub type ReactionId = Uuid;

/// Fixed reaction vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    Like,
    Dislike,
    Heart,
    Flag,
}

/// Canonical in-memory reaction record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: ReactionId,
    pub kind: ReactionKind,
    pub user: UserId,
    /// Post or comment this reaction is attached to.
    pub parent: Option<PostId>,
}

impl Reaction {
    pub fn new(kind: ReactionKind, user: UserId, parent: Option<PostId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            user,
            parent,
        }
    }

    /// Domain equality: same kind made by the same user.
    pub fn same_reaction(&self, kind: ReactionKind, user: UserId) -> bool {
        self.kind == kind && self.user == user
    }
}

#[cfg(test)]
mod tests {
    use super::{Reaction, ReactionKind};
    use uuid::Uuid;

    #[test]
    fn same_reaction_ignores_persistent_id() {
        let user = Uuid::new_v4();
        let a = Reaction::new(ReactionKind::Like, user, None);
        let b = Reaction::new(ReactionKind::Like, user, None);

        assert_ne!(a.id, b.id);
        assert!(a.same_reaction(b.kind, b.user));
        assert!(!a.same_reaction(ReactionKind::Heart, user));
        assert!(!a.same_reaction(ReactionKind::Like, Uuid::new_v4()));
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_value(ReactionKind::Dislike).expect("kind should serialize");
        assert_eq!(json, "dislike");
    }
}
