//! Post, comment and reaction operations.
//!
//! # Responsibility
//! - Create posts and comments with content validation.
//! - Manage the comment tree (attach, tombstone) and the reaction lists.
//!
//! # Invariants
//! - A comment is never created under a tombstoned parent.
//! - A post carries at most one reaction per `(kind, user)` pair.
//! - Tombstoning replaces content in place; tree structure is untouched.

use crate::config::CoreConfig;
use crate::model::post::{validate_content, Post, PostId, DELETED_MESSAGE};
use crate::model::reaction::{Reaction, ReactionId, ReactionKind};
use crate::model::user::UserId;
use crate::model::now_epoch_ms;
use crate::registry::{EntityKind, EntityRegistry};
use crate::repo::PostRepository;
use crate::service::membership_service::require_user;
use crate::service::{materialize_post_tree, post_to_record, DomainError, DomainResult};
use log::info;

/// Service for the post/comment tree and reactions.
pub struct ContentService<P: PostRepository> {
    repo: P,
    config: CoreConfig,
}

impl<P: PostRepository> ContentService<P> {
    pub fn new(repo: P, config: CoreConfig) -> Self {
        Self { repo, config }
    }

    /// Creates a top-level post (unattached until a forum accepts it).
    ///
    /// A deleted author may still create; the post is then born tombstoned,
    /// which keeps the author's delete ratchet observable in their content.
    pub fn create_post(
        &self,
        registry: &mut EntityRegistry,
        poster: UserId,
        title: &str,
        message: &str,
    ) -> DomainResult<PostId> {
        self.create_node(registry, poster, title, message, None)
    }

    /// Creates a comment under `parent` and attaches it.
    pub fn create_comment(
        &self,
        registry: &mut EntityRegistry,
        poster: UserId,
        title: &str,
        message: &str,
        parent: PostId,
    ) -> DomainResult<PostId> {
        let parent_entry = registry
            .post(parent)
            .ok_or(DomainError::NotFound(EntityKind::Post, parent))?;
        if parent_entry.is_tombstoned() {
            return Err(DomainError::StateConflict(format!(
                "cannot comment under deleted post {parent}"
            )));
        }
        let id = self.create_node(registry, poster, title, message, Some(parent))?;
        if let Some(entry) = registry.post_mut(parent) {
            if !entry.comments.contains(&id) {
                entry.comments.push(id);
            }
        }
        Ok(id)
    }

    /// Attaches an existing comment under `parent`.
    ///
    /// Rejects self-attachment and posts already attached to a forum; the
    /// comment's parent pointer is updated even when it is already listed, so
    /// re-attach keeps pointer and list consistent.
    pub fn attach_comment(
        &self,
        registry: &mut EntityRegistry,
        parent: PostId,
        child: PostId,
    ) -> DomainResult<()> {
        require_post(registry, parent)?;
        let child_entry = registry
            .post(child)
            .ok_or(DomainError::NotFound(EntityKind::Post, child))?;
        if child == parent {
            return Err(DomainError::InvalidArgument(format!(
                "post {child} cannot be its own comment"
            )));
        }
        if child_entry.forum.is_some() {
            return Err(DomainError::InvalidArgument(format!(
                "post {child} is attached to a forum and cannot become a comment"
            )));
        }

        if let Some(entry) = registry.post_mut(parent) {
            if !entry.comments.contains(&child) {
                entry.comments.push(child);
            }
        }
        if let Some(entry) = registry.post_mut(child) {
            entry.parent = Some(parent);
        }
        self.repo.set_post_parent(child, Some(parent))?;
        Ok(())
    }

    /// Tombstones a comment under `parent`: content is replaced by the
    /// tombstone marker, descendants stay attached. No-op when `child` is not
    /// one of the parent's comments.
    pub fn remove_comment(
        &self,
        registry: &mut EntityRegistry,
        parent: PostId,
        child: PostId,
    ) -> DomainResult<()> {
        require_post(registry, parent)?;
        let listed = registry
            .post(parent)
            .is_some_and(|entry| entry.comments.contains(&child));
        if !listed {
            return Ok(());
        }

        if let Some(entry) = registry.post_mut(child) {
            entry.tombstone();
        }
        self.repo
            .update_post_content(child, DELETED_MESSAGE, DELETED_MESSAGE)?;
        self.repo.set_post_deleted(child, true)?;
        info!("event=comment_tombstone module=content_service status=ok uuid={child}");
        Ok(())
    }

    /// Replaces a post's message. Only the author may edit.
    pub fn edit_post(
        &self,
        registry: &mut EntityRegistry,
        actor: UserId,
        post: PostId,
        message: &str,
    ) -> DomainResult<()> {
        require_post(registry, post)?;
        let owns = registry
            .user(actor)
            .ok_or(DomainError::NotFound(EntityKind::User, actor))?
            .posts
            .contains(&post);
        if !owns {
            return Err(DomainError::StateConflict(format!(
                "user {actor} is not the author of post {post}"
            )));
        }

        let title = registry
            .post(post)
            .map(|entry| entry.title.clone())
            .unwrap_or_default();
        if let Some(entry) = registry.post_mut(post) {
            entry.message = message.to_string();
        }
        self.repo.update_post_content(post, &title, message)?;
        Ok(())
    }

    /// Adds a reaction to a post. A second reaction with the same kind from
    /// the same user is a conflict, not a toggle.
    pub fn add_reaction(
        &self,
        registry: &mut EntityRegistry,
        actor: UserId,
        post: PostId,
        kind: ReactionKind,
    ) -> DomainResult<ReactionId> {
        require_post(registry, post)?;
        require_user(registry, actor)?;
        if self.find_reaction(registry, post, actor, kind).is_some() {
            return Err(DomainError::StateConflict(format!(
                "user {actor} already reacted with {kind:?} on post {post}"
            )));
        }

        let reaction = Reaction::new(kind, actor, Some(post));
        let record = crate::repo::ReactionRecord {
            uuid: reaction.id,
            kind: reaction.kind,
            user: reaction.user,
            parent: reaction.parent,
        };
        let id = registry.register_reaction(reaction);
        if let Err(err) = self.repo.create_reaction(&record) {
            registry.unregister(EntityKind::Reaction, id);
            return Err(err.into());
        }
        if let Some(entry) = registry.post_mut(post) {
            entry.reactions.push(id);
        }
        if let Some(entry) = registry.user_mut(actor) {
            entry.reactions.push(id);
        }
        info!("event=reaction_add module=content_service status=ok post={post} user={actor}");
        Ok(id)
    }

    /// Removes the actor's reaction of `kind` from the post. No-op when no
    /// such reaction exists.
    pub fn remove_reaction(
        &self,
        registry: &mut EntityRegistry,
        actor: UserId,
        post: PostId,
        kind: ReactionKind,
    ) -> DomainResult<()> {
        require_post(registry, post)?;
        let Some(id) = self.find_reaction(registry, post, actor, kind) else {
            return Ok(());
        };

        self.repo.delete_reaction(id)?;
        if let Some(entry) = registry.post_mut(post) {
            entry.reactions.retain(|existing| *existing != id);
        }
        if let Some(entry) = registry.user_mut(actor) {
            entry.reactions.retain(|existing| *existing != id);
        }
        registry.unregister(EntityKind::Reaction, id);
        Ok(())
    }

    /// Resolves a post (with its subtree) by id, registry first.
    pub fn load_post(
        &self,
        registry: &mut EntityRegistry,
        id: PostId,
    ) -> DomainResult<Option<PostId>> {
        if registry.post(id).is_some() {
            return Ok(Some(id));
        }
        match self.repo.find_post(id)? {
            Some(record) => Ok(Some(materialize_post_tree(registry, record, &self.repo)?)),
            None => Ok(None),
        }
    }

    /// Distinct posts the user has reacted to, in reaction order.
    pub fn reacted_posts(
        &self,
        registry: &mut EntityRegistry,
        user: UserId,
    ) -> DomainResult<Vec<PostId>> {
        let mut seen = Vec::new();
        for record in self.repo.list_reactions_by_user(user)? {
            crate::service::materialize_reaction(registry, &record);
            if let Some(parent) = record.parent {
                if !seen.contains(&parent) {
                    seen.push(parent);
                }
            }
        }
        Ok(seen)
    }

    fn create_node(
        &self,
        registry: &mut EntityRegistry,
        poster: UserId,
        title: &str,
        message: &str,
        parent: Option<PostId>,
    ) -> DomainResult<PostId> {
        require_user(registry, poster)?;
        validate_content(title, message, &self.config.forbidden_terms)?;

        let born_deleted = registry.user(poster).is_some_and(|u| u.is_deleted);
        let mut post = Post::new(poster, title, message, now_epoch_ms(), born_deleted);
        post.parent = parent;
        let record = post_to_record(&post);
        let id = registry.register_post(post);
        if let Err(err) = self.repo.create_post(&record) {
            registry.unregister(EntityKind::Post, id);
            return Err(err.into());
        }
        if let Some(entry) = registry.user_mut(poster) {
            entry.posts.push(id);
        }
        info!("event=post_create module=content_service status=ok uuid={id}");
        Ok(id)
    }

    fn find_reaction(
        &self,
        registry: &EntityRegistry,
        post: PostId,
        actor: UserId,
        kind: ReactionKind,
    ) -> Option<ReactionId> {
        let entry = registry.post(post)?;
        entry
            .reactions
            .iter()
            .copied()
            .find(|id| {
                registry
                    .reaction(*id)
                    .is_some_and(|reaction| reaction.same_reaction(kind, actor))
            })
    }
}

pub(crate) fn require_post(registry: &EntityRegistry, id: PostId) -> DomainResult<()> {
    if registry.post(id).is_none() {
        return Err(DomainError::NotFound(EntityKind::Post, id));
    }
    Ok(())
}
