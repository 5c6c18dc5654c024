//! In-process identity registry.
//!
//! # Responsibility
//! - Hold the single live in-memory instance for every materialized entity,
//!   keyed by `(kind, id)`.
//!
//! # Invariants
//! - Once registered, an id resolves to the same instance for the rest of the
//!   process lifetime or is removed entirely; it is never silently swapped.
//! - Load paths consult the registry before materializing from a persisted
//!   record, and register a fresh instance before populating its nested
//!   relationships so cyclic traversals short-circuit here.

use crate::model::forum::{Forum, ForumId};
use crate::model::post::{Post, PostId};
use crate::model::reaction::{Reaction, ReactionId};
use crate::model::user::{User, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Entity kinds tracked by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Forum,
    Post,
    Reaction,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Forum => "forum",
            Self::Post => "post",
            Self::Reaction => "reaction",
        };
        f.write_str(name)
    }
}

/// Identity map over all materialized domain entities.
///
/// The registry is the read-through cache in front of the persistence
/// collaborator: the relational store stays authoritative, while every handle
/// to "the same" persisted entity resolves to one slot here.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    users: BTreeMap<UserId, User>,
    forums: BTreeMap<ForumId, Forum>,
    posts: BTreeMap<PostId, Post>,
    reactions: BTreeMap<ReactionId, Reaction>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user instance. First write wins: if the id is already
    /// present the existing instance is kept.
    pub fn register_user(&mut self, user: User) -> UserId {
        let id = user.id;
        self.users.entry(id).or_insert(user);
        id
    }

    pub fn register_forum(&mut self, forum: Forum) -> ForumId {
        let id = forum.id;
        self.forums.entry(id).or_insert(forum);
        id
    }

    pub fn register_post(&mut self, post: Post) -> PostId {
        let id = post.id;
        self.posts.entry(id).or_insert(post);
        id
    }

    pub fn register_reaction(&mut self, reaction: Reaction) -> ReactionId {
        let id = reaction.id;
        self.reactions.entry(id).or_insert(reaction);
        id
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn user_mut(&mut self, id: UserId) -> Option<&mut User> {
        self.users.get_mut(&id)
    }

    pub fn forum(&self, id: ForumId) -> Option<&Forum> {
        self.forums.get(&id)
    }

    pub fn forum_mut(&mut self, id: ForumId) -> Option<&mut Forum> {
        self.forums.get_mut(&id)
    }

    pub fn post(&self, id: PostId) -> Option<&Post> {
        self.posts.get(&id)
    }

    pub fn post_mut(&mut self, id: PostId) -> Option<&mut Post> {
        self.posts.get_mut(&id)
    }

    pub fn reaction(&self, id: ReactionId) -> Option<&Reaction> {
        self.reactions.get(&id)
    }

    pub fn reaction_mut(&mut self, id: ReactionId) -> Option<&mut Reaction> {
        self.reactions.get_mut(&id)
    }

    pub fn contains(&self, kind: EntityKind, id: Uuid) -> bool {
        match kind {
            EntityKind::User => self.users.contains_key(&id),
            EntityKind::Forum => self.forums.contains_key(&id),
            EntityKind::Post => self.posts.contains_key(&id),
            EntityKind::Reaction => self.reactions.contains_key(&id),
        }
    }

    /// Total number of registered instances across all kinds.
    pub fn len(&self) -> usize {
        self.users.len() + self.forums.len() + self.posts.len() + self.reactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes one entity. Full-reset and test-teardown paths only.
    pub fn unregister(&mut self, kind: EntityKind, id: Uuid) {
        match kind {
            EntityKind::User => {
                self.users.remove(&id);
            }
            EntityKind::Forum => {
                self.forums.remove(&id);
            }
            EntityKind::Post => {
                self.posts.remove(&id);
            }
            EntityKind::Reaction => {
                self.reactions.remove(&id);
            }
        }
    }

    /// Drops every registered instance. Full-reset paths only.
    pub fn clear(&mut self) {
        self.users.clear();
        self.forums.clear();
        self.posts.clear();
        self.reactions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{EntityKind, EntityRegistry};
    use crate::model::post::Post;
    use crate::model::user::{NewUser, User};
    use uuid::Uuid;

    fn sample_user(name: &str) -> User {
        User::new(
            &NewUser::member(name, &format!("{name}@scu.edu"), "CSEN", 2),
            0,
        )
    }

    #[test]
    fn register_then_lookup_returns_same_instance() {
        let mut registry = EntityRegistry::new();
        let user = sample_user("james");
        let id = registry.register_user(user);

        registry
            .user_mut(id)
            .expect("registered user should resolve")
            .major = "MATH".to_string();
        assert_eq!(registry.user(id).expect("still resolvable").major, "MATH");
        assert!(registry.contains(EntityKind::User, id));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn re_register_keeps_first_instance() {
        let mut registry = EntityRegistry::new();
        let mut first = sample_user("james");
        let id = first.id;
        first.major = "CSEN".to_string();

        let mut second = sample_user("impostor");
        second.id = id;

        registry.register_user(first);
        registry.register_user(second);
        assert_eq!(registry.user(id).expect("resolvable").username, "james");
    }

    #[test]
    fn unregister_and_clear_remove_instances() {
        let mut registry = EntityRegistry::new();
        let user_id = registry.register_user(sample_user("james"));
        let post_id = registry.register_post(Post::new(user_id, "T", "M", 0, false));

        registry.unregister(EntityKind::Post, post_id);
        assert!(!registry.contains(EntityKind::Post, post_id));
        assert!(registry.contains(EntityKind::User, user_id));

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn unknown_ids_resolve_to_absent() {
        let registry = EntityRegistry::new();
        let id = Uuid::new_v4();
        assert!(registry.user(id).is_none());
        assert!(registry.forum(id).is_none());
        assert!(registry.post(id).is_none());
        assert!(registry.reaction(id).is_none());
        assert!(!registry.contains(EntityKind::Reaction, id));
    }
}
