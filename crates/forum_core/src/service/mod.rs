//! Domain operation services.
//!
//! # Responsibility
//! - Orchestrate registry state and repository writes into the public
//!   operation set (membership transitions, content tree, moderation).
//! - Own the domain error taxonomy surfaced to the embedding layer.
//!
//! # Invariants
//! - Every mutating operation validates first and mutates second; a domain
//!   error leaves both registry and store untouched.
//! - Load paths consult the registry before materializing from records, and
//!   register fresh instances before populating nested relationships.

use crate::model::post::{Post, PostId};
use crate::model::reaction::Reaction;
use crate::model::ValidationError;
use crate::registry::{EntityKind, EntityRegistry};
use crate::repo::{PostRecord, PostRepository, ReactionRecord, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod account_service;
pub mod content_service;
pub mod membership_service;
pub mod moderation_service;

pub use account_service::AccountService;
pub use content_service::ContentService;
pub use membership_service::MembershipService;
pub use moderation_service::ModerationService;

pub type DomainResult<T> = Result<T, DomainError>;

/// Error taxonomy for every public domain operation.
///
/// All variants are raised synchronously at the point of violation; the core
/// never retries and never partially mutates on a domain error. `Storage`
/// marks a durable write that failed after a valid transition; it is its own
/// kind so callers can distinguish policy violations from infrastructure.
#[derive(Debug)]
pub enum DomainError {
    /// An argument with the wrong shape for the operation (e.g. a top-level
    /// forum post passed where a comment is required).
    InvalidArgument(String),
    /// Field-level validation failure.
    Validation(ValidationError),
    /// Operation invalid for the current state of the entities involved.
    StateConflict(String),
    /// A handle that does not resolve to a live entity or persisted record.
    NotFound(EntityKind, Uuid),
    /// Persistence collaborator failure.
    Storage(RepoError),
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::StateConflict(message) => write!(f, "{message}"),
            Self::NotFound(kind, id) => write!(f, "{kind} not found: {id}"),
            Self::Storage(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for DomainError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for DomainError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for DomainError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

/// Materializes a post and its whole subtree (comments, reactions) into the
/// registry, returning the canonical id.
///
/// The node is registered *before* its relationships are populated so that a
/// cyclic parent chain terminates at the registry instead of recursing.
pub(crate) fn materialize_post_tree<P: PostRepository>(
    registry: &mut EntityRegistry,
    record: PostRecord,
    posts: &P,
) -> DomainResult<PostId> {
    let id = record.uuid;
    if registry.post(id).is_some() {
        return Ok(id);
    }

    registry.register_post(post_from_record(&record));

    for child in posts.list_children(id)? {
        let child_id = materialize_post_tree(registry, child, posts)?;
        if let Some(post) = registry.post_mut(id) {
            if !post.comments.contains(&child_id) {
                post.comments.push(child_id);
            }
        }
    }

    for reaction in posts.list_reactions_by_parent(id)? {
        let reaction_id = materialize_reaction(registry, &reaction);
        if let Some(post) = registry.post_mut(id) {
            if !post.reactions.contains(&reaction_id) {
                post.reactions.push(reaction_id);
            }
        }
    }

    Ok(id)
}

pub(crate) fn materialize_reaction(
    registry: &mut EntityRegistry,
    record: &ReactionRecord,
) -> crate::model::reaction::ReactionId {
    if registry.reaction(record.uuid).is_none() {
        registry.register_reaction(Reaction {
            id: record.uuid,
            kind: record.kind,
            user: record.user,
            parent: record.parent,
        });
    }
    record.uuid
}

pub(crate) fn post_from_record(record: &PostRecord) -> Post {
    Post {
        id: record.uuid,
        title: record.title.clone(),
        message: record.message.clone(),
        created_at: record.created_at,
        poster: record.poster,
        forum: record.forum,
        parent: record.parent,
        comments: Vec::new(),
        reactions: Vec::new(),
        is_deleted: record.is_deleted,
    }
}

pub(crate) fn post_to_record(post: &Post) -> PostRecord {
    PostRecord {
        uuid: post.id,
        poster: post.poster,
        forum: post.forum,
        parent: post.parent,
        title: post.title.clone(),
        message: post.message.clone(),
        is_deleted: post.is_deleted,
        created_at: post.created_at,
    }
}
