//! Course forum model.
//!
//! # Responsibility
//! - Hold the three membership sets and the top-level post list for a course.
//!
//! # Invariants
//! - `authorized` and `restricted` are disjoint at all times.
//! - `authorized ⊆ members` and `restricted ⊆ members`.
//!
//! The membership service owns every transition between the sets; nothing else
//! mutates them, which is what keeps the disjointness structural rather than
//! checked after the fact.

use crate::model::post::PostId;
use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Stable identifier for a course forum.
pub type ForumId = Uuid;

/// Canonical in-memory forum record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forum {
    pub id: ForumId,
    /// Unique natural key; one forum per course.
    pub course_name: String,
    pub created_at: i64,
    /// Join set. Authorization and restriction are layered over this.
    pub members: BTreeSet<UserId>,
    /// Members with elevated forum privileges.
    pub authorized: BTreeSet<UserId>,
    /// Members barred from posting.
    pub restricted: BTreeSet<UserId>,
    /// Top-level posts attached to this course, in attach order.
    pub posts: Vec<PostId>,
}

impl Forum {
    pub fn new(course_name: &str, created_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_name: course_name.to_string(),
            created_at,
            members: BTreeSet::new(),
            authorized: BTreeSet::new(),
            restricted: BTreeSet::new(),
            posts: Vec::new(),
        }
    }

    pub fn is_member(&self, user: UserId) -> bool {
        self.members.contains(&user)
    }

    pub fn is_authorized(&self, user: UserId) -> bool {
        self.authorized.contains(&user)
    }

    pub fn is_restricted(&self, user: UserId) -> bool {
        self.restricted.contains(&user)
    }

    /// Checks the set invariants. Debug/test aid; transitions must keep this
    /// true without ever consulting it.
    pub fn sets_consistent(&self) -> bool {
        self.authorized.is_disjoint(&self.restricted)
            && self.authorized.is_subset(&self.members)
            && self.restricted.is_subset(&self.members)
    }
}

#[cfg(test)]
mod tests {
    use super::Forum;
    use uuid::Uuid;

    #[test]
    fn new_forum_has_empty_sets() {
        let forum = Forum::new("CSEN174", 0);
        assert!(forum.members.is_empty());
        assert!(forum.authorized.is_empty());
        assert!(forum.restricted.is_empty());
        assert!(forum.posts.is_empty());
        assert!(forum.sets_consistent());
    }

    #[test]
    fn sets_consistent_detects_violations() {
        let mut forum = Forum::new("CSEN174", 0);
        let user = Uuid::new_v4();

        forum.authorized.insert(user);
        assert!(!forum.sets_consistent(), "authorized non-member");

        forum.members.insert(user);
        assert!(forum.sets_consistent());

        forum.restricted.insert(user);
        assert!(!forum.sets_consistent(), "authorized and restricted overlap");
    }
}
