//! Admin-only moderation operations.
//!
//! # Responsibility
//! - Gate forum-scoped moderation and account deletion behind the admin
//!   capability flag.
//! - Apply the account delete ratchet: deleting cascades over the user's
//!   authored posts, undeleting never revives them.

use crate::model::forum::ForumId;
use crate::model::post::PostId;
use crate::model::user::UserId;
use crate::registry::{EntityKind, EntityRegistry};
use crate::repo::{ForumRepository, PostRepository, UserRepository};
use crate::service::membership_service::require_forum;
use crate::service::{DomainError, DomainResult, MembershipService};
use log::info;

/// Service for admin moderation of forums and accounts.
pub struct ModerationService<U, F, P>
where
    U: UserRepository,
    F: ForumRepository,
    P: PostRepository,
{
    users: U,
    posts: P,
    membership: MembershipService<F, P>,
}

impl<U, F, P> ModerationService<U, F, P>
where
    U: UserRepository,
    F: ForumRepository,
    P: PostRepository,
{
    pub fn new(users: U, posts: P, membership: MembershipService<F, P>) -> Self {
        Self {
            users,
            posts,
            membership,
        }
    }

    pub fn membership(&self) -> &MembershipService<F, P> {
        &self.membership
    }

    /// Suppresses a post in a forum. No-op when the post is not attached to
    /// the forum's top-level list.
    pub fn remove_post(
        &self,
        registry: &mut EntityRegistry,
        actor: UserId,
        forum: ForumId,
        post: PostId,
    ) -> DomainResult<()> {
        self.require_admin(registry, actor)?;
        require_forum(registry, forum)?;
        let attached = registry
            .forum(forum)
            .is_some_and(|entry| entry.posts.contains(&post));
        if !attached {
            return Ok(());
        }

        if let Some(entry) = registry.post_mut(post) {
            entry.is_deleted = true;
        }
        self.posts.set_post_deleted(post, true)?;
        info!("event=post_remove module=moderation_service status=ok forum={forum} post={post}");
        Ok(())
    }

    /// Grants a member elevated privileges in a forum.
    pub fn authorize_user(
        &self,
        registry: &mut EntityRegistry,
        actor: UserId,
        forum: ForumId,
        target: UserId,
    ) -> DomainResult<()> {
        self.require_admin(registry, actor)?;
        self.require_active_target(registry, target, "authorize")?;
        self.membership.authorize(registry, forum, target)
    }

    pub fn deauthorize_user(
        &self,
        registry: &mut EntityRegistry,
        actor: UserId,
        forum: ForumId,
        target: UserId,
    ) -> DomainResult<()> {
        self.require_admin(registry, actor)?;
        self.require_active_target(registry, target, "deauthorize")?;
        self.membership.deauthorize(registry, forum, target)
    }

    /// Bars a member from posting in a forum.
    pub fn restrict_user(
        &self,
        registry: &mut EntityRegistry,
        actor: UserId,
        forum: ForumId,
        target: UserId,
    ) -> DomainResult<()> {
        self.require_admin(registry, actor)?;
        self.require_active_target(registry, target, "restrict")?;
        self.membership.restrict(registry, forum, target)
    }

    pub fn unrestrict_user(
        &self,
        registry: &mut EntityRegistry,
        actor: UserId,
        forum: ForumId,
        target: UserId,
    ) -> DomainResult<()> {
        self.require_admin(registry, actor)?;
        self.require_active_target(registry, target, "unrestrict")?;
        self.membership.unrestrict(registry, forum, target)
    }

    /// Deletes an account and cascades the deleted flag over every post the
    /// account authored. Deleting an already-deleted account is a conflict,
    /// not a no-op.
    pub fn delete_user(
        &self,
        registry: &mut EntityRegistry,
        actor: UserId,
        target: UserId,
    ) -> DomainResult<()> {
        self.require_admin(registry, actor)?;
        let entry = registry
            .user(target)
            .ok_or(DomainError::NotFound(EntityKind::User, target))?;
        if entry.is_deleted {
            return Err(DomainError::StateConflict(format!(
                "user {target} is already deleted"
            )));
        }
        let authored: Vec<PostId> = entry.posts.clone();

        if let Some(entry) = registry.user_mut(target) {
            entry.is_deleted = true;
        }
        self.users.set_user_deleted(target, true)?;

        for post in authored {
            if let Some(entry) = registry.post_mut(post) {
                entry.is_deleted = true;
            }
            self.posts.set_post_deleted(post, true)?;
        }
        info!("event=user_delete module=moderation_service status=ok uuid={target}");
        Ok(())
    }

    /// Reverses an account deletion. The user's posts stay deleted; the
    /// ratchet only moves one way. Undeleting an active account is a conflict.
    pub fn undelete_user(
        &self,
        registry: &mut EntityRegistry,
        actor: UserId,
        target: UserId,
    ) -> DomainResult<()> {
        self.require_admin(registry, actor)?;
        let entry = registry
            .user(target)
            .ok_or(DomainError::NotFound(EntityKind::User, target))?;
        if !entry.is_deleted {
            return Err(DomainError::StateConflict(format!(
                "user {target} is not deleted"
            )));
        }

        if let Some(entry) = registry.user_mut(target) {
            entry.is_deleted = false;
        }
        self.users.set_user_deleted(target, false)?;
        info!("event=user_undelete module=moderation_service status=ok uuid={target}");
        Ok(())
    }

    fn require_admin(&self, registry: &EntityRegistry, actor: UserId) -> DomainResult<()> {
        let entry = registry
            .user(actor)
            .ok_or(DomainError::NotFound(EntityKind::User, actor))?;
        if !entry.is_admin {
            return Err(DomainError::StateConflict(format!(
                "user {actor} lacks the admin capability"
            )));
        }
        Ok(())
    }

    fn require_active_target(
        &self,
        registry: &EntityRegistry,
        target: UserId,
        operation: &str,
    ) -> DomainResult<()> {
        let entry = registry
            .user(target)
            .ok_or(DomainError::NotFound(EntityKind::User, target))?;
        if entry.is_deleted {
            return Err(DomainError::StateConflict(format!(
                "cannot {operation} deleted user {target}"
            )));
        }
        Ok(())
    }
}
