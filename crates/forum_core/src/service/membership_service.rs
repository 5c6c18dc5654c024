//! Forum lifecycle and membership transitions.
//!
//! # Responsibility
//! - Create and load forums (idempotent by course name).
//! - Own every transition of the member/authorized/restricted sets.
//! - Attach and detach top-level posts, enforcing the posting policy.
//!
//! # Invariants
//! - `authorized` and `restricted` stay disjoint subsets of `members` through
//!   every transition.
//! - Removing a member reassigns their posts in the forum to the sentinel
//!   account before the membership edges go away.

use crate::model::forum::{Forum, ForumId};
use crate::model::post::PostId;
use crate::model::user::UserId;
use crate::model::now_epoch_ms;
use crate::model::ValidationError;
use crate::registry::{EntityKind, EntityRegistry};
use crate::repo::{ForumRecord, ForumRepository, MemberSet, PostRepository};
use crate::service::{materialize_post_tree, DomainError, DomainResult};
use log::info;

/// Service for forum lifecycle and membership state.
pub struct MembershipService<F: ForumRepository, P: PostRepository> {
    forums: F,
    posts: P,
    /// Sentinel account that orphaned posts are reassigned to.
    deleted_user: UserId,
}

impl<F: ForumRepository, P: PostRepository> MembershipService<F, P> {
    pub fn new(forums: F, posts: P, deleted_user: UserId) -> Self {
        Self {
            forums,
            posts,
            deleted_user,
        }
    }

    pub fn deleted_user(&self) -> UserId {
        self.deleted_user
    }

    /// Creates a forum for a course, or returns the existing one when the
    /// course already has a forum.
    pub fn create_forum(
        &self,
        registry: &mut EntityRegistry,
        course_name: &str,
    ) -> DomainResult<ForumId> {
        if course_name.trim().is_empty() {
            return Err(ValidationError::EmptyField("course_name").into());
        }

        if let Some(record) = self.forums.find_forum_by_course_name(course_name)? {
            let id = self.materialize_forum(registry, record)?;
            info!("event=forum_create module=membership_service status=exists uuid={id}");
            return Ok(id);
        }

        let forum = Forum::new(course_name, now_epoch_ms());
        let record = ForumRecord {
            uuid: forum.id,
            course_name: forum.course_name.clone(),
            created_at: forum.created_at,
        };
        let id = registry.register_forum(forum);
        if let Err(err) = self.forums.create_forum(&record) {
            registry.unregister(EntityKind::Forum, id);
            return Err(err.into());
        }
        info!("event=forum_create module=membership_service status=created uuid={id}");
        Ok(id)
    }

    /// Resolves a forum by id, registry first, store second.
    pub fn load_forum(
        &self,
        registry: &mut EntityRegistry,
        id: ForumId,
    ) -> DomainResult<Option<ForumId>> {
        if registry.forum(id).is_some() {
            return Ok(Some(id));
        }
        match self.forums.find_forum(id)? {
            Some(record) => Ok(Some(self.materialize_forum(registry, record)?)),
            None => Ok(None),
        }
    }

    pub fn load_forum_by_course_name(
        &self,
        registry: &mut EntityRegistry,
        course_name: &str,
    ) -> DomainResult<Option<ForumId>> {
        match self.forums.find_forum_by_course_name(course_name)? {
            Some(record) => Ok(Some(self.materialize_forum(registry, record)?)),
            None => Ok(None),
        }
    }

    /// Materializes every persisted forum and returns their ids.
    pub fn load_all_forums(&self, registry: &mut EntityRegistry) -> DomainResult<Vec<ForumId>> {
        let mut ids = Vec::new();
        for record in self.forums.list_forums()? {
            ids.push(self.materialize_forum(registry, record)?);
        }
        Ok(ids)
    }

    /// Adds a user to the forum's member set. Idempotent.
    pub fn add_member(
        &self,
        registry: &mut EntityRegistry,
        forum: ForumId,
        user: UserId,
    ) -> DomainResult<()> {
        require_forum(registry, forum)?;
        require_user(registry, user)?;
        if registry.forum(forum).is_some_and(|f| f.is_member(user)) {
            return Ok(());
        }

        if let Some(entry) = registry.forum_mut(forum) {
            entry.members.insert(user);
        }
        if let Some(entry) = registry.user_mut(user) {
            entry.forums.insert(forum);
        }
        if let Err(err) = self.forums.add_edge(MemberSet::Members, forum, user) {
            if let Some(entry) = registry.forum_mut(forum) {
                entry.members.remove(&user);
            }
            if let Some(entry) = registry.user_mut(user) {
                entry.forums.remove(&forum);
            }
            return Err(err.into());
        }
        info!("event=member_add module=membership_service status=ok forum={forum} user={user}");
        Ok(())
    }

    /// Removes a member, reassigning their posts in the forum to the sentinel
    /// account and clearing any authorization or restriction. No-op for a
    /// non-member.
    pub fn remove_member(
        &self,
        registry: &mut EntityRegistry,
        forum: ForumId,
        user: UserId,
    ) -> DomainResult<()> {
        require_forum(registry, forum)?;
        if !registry.forum(forum).is_some_and(|f| f.is_member(user)) {
            return Ok(());
        }

        let post_ids: Vec<PostId> = registry
            .forum(forum)
            .map(|f| f.posts.clone())
            .unwrap_or_default();
        for post_id in post_ids {
            let authored = registry
                .post(post_id)
                .is_some_and(|post| post.poster == user);
            if !authored {
                continue;
            }
            if let Some(post) = registry.post_mut(post_id) {
                post.poster = self.deleted_user;
            }
            self.posts.set_post_poster(post_id, self.deleted_user)?;
        }

        if let Some(entry) = registry.forum_mut(forum) {
            entry.members.remove(&user);
            entry.authorized.remove(&user);
            entry.restricted.remove(&user);
        }
        if let Some(entry) = registry.user_mut(user) {
            entry.forums.remove(&forum);
        }
        for set in [MemberSet::Members, MemberSet::Authorized, MemberSet::Restricted] {
            self.forums.remove_edge(set, forum, user)?;
        }
        info!("event=member_remove module=membership_service status=ok forum={forum} user={user}");
        Ok(())
    }

    /// Grants elevated privileges to a member, lifting any restriction in the
    /// same transition. Idempotent for an already-authorized member.
    pub fn authorize(
        &self,
        registry: &mut EntityRegistry,
        forum: ForumId,
        user: UserId,
    ) -> DomainResult<()> {
        self.promote(registry, forum, user, MemberSet::Authorized)
    }

    /// Bars a member from posting, revoking any authorization in the same
    /// transition. Idempotent for an already-restricted member.
    pub fn restrict(
        &self,
        registry: &mut EntityRegistry,
        forum: ForumId,
        user: UserId,
    ) -> DomainResult<()> {
        self.promote(registry, forum, user, MemberSet::Restricted)
    }

    /// Removes a member from the authorized set. No-op when not authorized.
    pub fn deauthorize(
        &self,
        registry: &mut EntityRegistry,
        forum: ForumId,
        user: UserId,
    ) -> DomainResult<()> {
        self.demote(registry, forum, user, MemberSet::Authorized)
    }

    /// Removes a member from the restricted set. No-op when not restricted.
    pub fn unrestrict(
        &self,
        registry: &mut EntityRegistry,
        forum: ForumId,
        user: UserId,
    ) -> DomainResult<()> {
        self.demote(registry, forum, user, MemberSet::Restricted)
    }

    pub fn is_authorized(
        &self,
        registry: &EntityRegistry,
        forum: ForumId,
        user: UserId,
    ) -> DomainResult<bool> {
        let forum = registry
            .forum(forum)
            .ok_or(DomainError::NotFound(EntityKind::Forum, forum))?;
        Ok(forum.is_authorized(user))
    }

    /// Attaches a post to the forum's top-level list.
    ///
    /// The author must resolve in the registry and be an unrestricted,
    /// non-deleted member; nothing is mutated when the policy rejects the
    /// attach. Idempotent for a post that is already attached.
    pub fn add_post(
        &self,
        registry: &mut EntityRegistry,
        forum: ForumId,
        post: PostId,
    ) -> DomainResult<()> {
        require_forum(registry, forum)?;
        let poster = registry
            .post(post)
            .ok_or(DomainError::NotFound(EntityKind::Post, post))?
            .poster;
        if registry.forum(forum).is_some_and(|f| f.posts.contains(&post)) {
            return Ok(());
        }

        let entry = registry
            .forum(forum)
            .ok_or(DomainError::NotFound(EntityKind::Forum, forum))?;
        if !entry.is_member(poster) {
            return Err(DomainError::StateConflict(format!(
                "user {poster} is not a member of forum {forum}"
            )));
        }
        if entry.is_restricted(poster) {
            return Err(DomainError::StateConflict(format!(
                "user {poster} is restricted in forum {forum}"
            )));
        }
        // The account entity is required here; a member id alone cannot
        // answer the deletion check.
        let poster_deleted = registry
            .user(poster)
            .ok_or(DomainError::NotFound(EntityKind::User, poster))?
            .is_deleted;
        if poster_deleted {
            return Err(DomainError::StateConflict(format!(
                "user {poster} is deleted and cannot post"
            )));
        }

        if let Some(entry) = registry.forum_mut(forum) {
            entry.posts.push(post);
        }
        if let Some(entry) = registry.post_mut(post) {
            entry.forum = Some(forum);
        }
        if let Err(err) = self.posts.set_post_forum(post, Some(forum)) {
            if let Some(entry) = registry.forum_mut(forum) {
                entry.posts.retain(|id| *id != post);
            }
            if let Some(entry) = registry.post_mut(post) {
                entry.forum = None;
            }
            return Err(err.into());
        }
        info!("event=post_attach module=membership_service status=ok forum={forum} post={post}");
        Ok(())
    }

    /// Detaches a post from the forum's top-level list. No-op when the post is
    /// not attached to this forum.
    pub fn remove_post(
        &self,
        registry: &mut EntityRegistry,
        forum: ForumId,
        post: PostId,
    ) -> DomainResult<()> {
        require_forum(registry, forum)?;
        if !registry.forum(forum).is_some_and(|f| f.posts.contains(&post)) {
            return Ok(());
        }

        if let Some(entry) = registry.forum_mut(forum) {
            entry.posts.retain(|id| *id != post);
        }
        if let Some(entry) = registry.post_mut(post) {
            entry.forum = None;
        }
        self.posts.set_post_forum(post, None)?;
        Ok(())
    }

    /// Deletes a forum with its whole post tree and membership edges, then
    /// evicts everything removed from the registry.
    pub fn delete_forum(&self, registry: &mut EntityRegistry, forum: ForumId) -> DomainResult<()> {
        require_forum(registry, forum)?;

        let tree = self.forums.list_post_tree(forum)?;
        self.forums.delete_forum_cascade(forum)?;

        for post_id in tree {
            let reaction_ids = registry
                .post(post_id)
                .map(|post| post.reactions.clone())
                .unwrap_or_default();
            for reaction_id in reaction_ids {
                registry.unregister(EntityKind::Reaction, reaction_id);
            }
            registry.unregister(EntityKind::Post, post_id);
        }

        let members: Vec<UserId> = registry
            .forum(forum)
            .map(|f| f.members.iter().copied().collect())
            .unwrap_or_default();
        for user in members {
            if let Some(entry) = registry.user_mut(user) {
                entry.forums.remove(&forum);
            }
        }
        registry.unregister(EntityKind::Forum, forum);
        info!("event=forum_delete module=membership_service status=ok uuid={forum}");
        Ok(())
    }

    /// Moves a member into `target` (authorized or restricted), evicting them
    /// from the opposite set.
    fn promote(
        &self,
        registry: &mut EntityRegistry,
        forum: ForumId,
        user: UserId,
        target: MemberSet,
    ) -> DomainResult<()> {
        require_forum(registry, forum)?;
        let entry = registry
            .forum(forum)
            .ok_or(DomainError::NotFound(EntityKind::Forum, forum))?;
        if !entry.is_member(user) {
            return Err(DomainError::StateConflict(format!(
                "user {user} is not a member of forum {forum}"
            )));
        }
        let (already, was_opposite) = match target {
            MemberSet::Authorized => (entry.is_authorized(user), entry.is_restricted(user)),
            MemberSet::Restricted => (entry.is_restricted(user), entry.is_authorized(user)),
            MemberSet::Members => (true, false),
        };
        if already {
            return Ok(());
        }

        let opposite = match target {
            MemberSet::Authorized => MemberSet::Restricted,
            MemberSet::Restricted => MemberSet::Authorized,
            MemberSet::Members => return Ok(()),
        };
        if let Some(entry) = registry.forum_mut(forum) {
            match target {
                MemberSet::Authorized => {
                    entry.authorized.insert(user);
                    entry.restricted.remove(&user);
                }
                MemberSet::Restricted => {
                    entry.restricted.insert(user);
                    entry.authorized.remove(&user);
                }
                MemberSet::Members => {}
            }
        }
        if let Err(err) = self.forums.move_edge(forum, user, target, opposite) {
            if let Some(entry) = registry.forum_mut(forum) {
                match target {
                    MemberSet::Authorized => {
                        entry.authorized.remove(&user);
                        if was_opposite {
                            entry.restricted.insert(user);
                        }
                    }
                    MemberSet::Restricted => {
                        entry.restricted.remove(&user);
                        if was_opposite {
                            entry.authorized.insert(user);
                        }
                    }
                    MemberSet::Members => {}
                }
            }
            return Err(err.into());
        }
        info!(
            "event=member_transition module=membership_service status=ok forum={forum} user={user} set={}",
            match target {
                MemberSet::Authorized => "authorized",
                MemberSet::Restricted => "restricted",
                MemberSet::Members => "members",
            }
        );
        Ok(())
    }

    fn demote(
        &self,
        registry: &mut EntityRegistry,
        forum: ForumId,
        user: UserId,
        target: MemberSet,
    ) -> DomainResult<()> {
        require_forum(registry, forum)?;
        let present = {
            let entry = registry
                .forum(forum)
                .ok_or(DomainError::NotFound(EntityKind::Forum, forum))?;
            match target {
                MemberSet::Authorized => entry.is_authorized(user),
                MemberSet::Restricted => entry.is_restricted(user),
                MemberSet::Members => false,
            }
        };
        if !present {
            return Ok(());
        }

        if let Some(entry) = registry.forum_mut(forum) {
            match target {
                MemberSet::Authorized => {
                    entry.authorized.remove(&user);
                }
                MemberSet::Restricted => {
                    entry.restricted.remove(&user);
                }
                MemberSet::Members => {}
            }
        }
        self.forums.remove_edge(target, forum, user)?;
        Ok(())
    }

    fn materialize_forum(
        &self,
        registry: &mut EntityRegistry,
        record: ForumRecord,
    ) -> DomainResult<ForumId> {
        let id = record.uuid;
        if registry.forum(id).is_some() {
            return Ok(id);
        }

        let mut forum = Forum::new(&record.course_name, record.created_at);
        forum.id = id;
        registry.register_forum(forum);

        let members = self.forums.list_edge_users(MemberSet::Members, id)?;
        let authorized = self.forums.list_edge_users(MemberSet::Authorized, id)?;
        let restricted = self.forums.list_edge_users(MemberSet::Restricted, id)?;
        if let Some(entry) = registry.forum_mut(id) {
            entry.members = members.into_iter().collect();
            entry.authorized = authorized.into_iter().collect();
            entry.restricted = restricted.into_iter().collect();
        }

        let mut post_ids = Vec::new();
        for record in self.posts.list_posts_by_forum(id)? {
            post_ids.push(materialize_post_tree(registry, record, &self.posts)?);
        }
        if let Some(entry) = registry.forum_mut(id) {
            entry.posts = post_ids;
        }
        Ok(id)
    }
}

pub(crate) fn require_forum(registry: &EntityRegistry, id: ForumId) -> DomainResult<()> {
    if registry.forum(id).is_none() {
        return Err(DomainError::NotFound(EntityKind::Forum, id));
    }
    Ok(())
}

pub(crate) fn require_user(registry: &EntityRegistry, id: UserId) -> DomainResult<()> {
    if registry.user(id).is_none() {
        return Err(DomainError::NotFound(EntityKind::User, id));
    }
    Ok(())
}
