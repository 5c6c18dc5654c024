//! Post and reaction repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide post rows and the forum↔post / post↔post(parent) link mutations.
//! - Own reaction row persistence.
//!
//! # Invariants
//! - Link mutations against a missing post surface as `NotFound`.
//! - Child listings come back in creation order.

use crate::model::forum::ForumId;
use crate::model::post::PostId;
use crate::model::reaction::{ReactionId, ReactionKind};
use crate::model::user::UserId;
use crate::registry::EntityKind;
use crate::repo::{bool_to_int, parse_bool, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const POST_SELECT_SQL: &str = "SELECT
    uuid,
    poster_uuid,
    forum_uuid,
    parent_uuid,
    title,
    message,
    is_deleted,
    created_at
FROM posts";

const REACTION_SELECT_SQL: &str =
    "SELECT uuid, reaction_type, user_uuid, parent_uuid FROM reactions";

/// Row shape exchanged with the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub uuid: PostId,
    pub poster: UserId,
    pub forum: Option<ForumId>,
    pub parent: Option<PostId>,
    pub title: String,
    pub message: String,
    pub is_deleted: bool,
    pub created_at: i64,
}

/// Row shape for persisted reactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionRecord {
    pub uuid: ReactionId,
    pub kind: ReactionKind,
    pub user: UserId,
    pub parent: Option<PostId>,
}

/// Repository interface for post-tree and reaction persistence.
pub trait PostRepository {
    fn create_post(&self, record: &PostRecord) -> RepoResult<()>;
    fn find_post(&self, id: PostId) -> RepoResult<Option<PostRecord>>;
    fn list_posts_by_forum(&self, forum: ForumId) -> RepoResult<Vec<PostRecord>>;
    fn list_children(&self, parent: PostId) -> RepoResult<Vec<PostRecord>>;
    fn set_post_forum(&self, post: PostId, forum: Option<ForumId>) -> RepoResult<()>;
    fn set_post_parent(&self, post: PostId, parent: Option<PostId>) -> RepoResult<()>;
    fn set_post_poster(&self, post: PostId, poster: UserId) -> RepoResult<()>;
    fn set_post_deleted(&self, post: PostId, deleted: bool) -> RepoResult<()>;
    fn update_post_content(&self, post: PostId, title: &str, message: &str) -> RepoResult<()>;
    fn create_reaction(&self, record: &ReactionRecord) -> RepoResult<()>;
    fn delete_reaction(&self, id: ReactionId) -> RepoResult<()>;
    fn list_reactions_by_parent(&self, parent: PostId) -> RepoResult<Vec<ReactionRecord>>;
    fn list_reactions_by_user(&self, user: UserId) -> RepoResult<Vec<ReactionRecord>>;
}

/// SQLite-backed post/reaction repository.
pub struct SqlitePostRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePostRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn update_post_link(&self, post: PostId, column: &str, value: Option<String>) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("UPDATE posts SET {column} = ?1 WHERE uuid = ?2;"),
            params![value, post.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityKind::Post, post));
        }
        Ok(())
    }
}

impl PostRepository for SqlitePostRepository<'_> {
    fn create_post(&self, record: &PostRecord) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO posts (
                uuid,
                poster_uuid,
                forum_uuid,
                parent_uuid,
                title,
                message,
                is_deleted,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                record.uuid.to_string(),
                record.poster.to_string(),
                record.forum.map(|id| id.to_string()),
                record.parent.map(|id| id.to_string()),
                record.title.as_str(),
                record.message.as_str(),
                bool_to_int(record.is_deleted),
                record.created_at,
            ],
        )?;
        Ok(())
    }

    fn find_post(&self, id: PostId) -> RepoResult<Option<PostRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{POST_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_post_row(row)?));
        }
        Ok(None)
    }

    fn list_posts_by_forum(&self, forum: ForumId) -> RepoResult<Vec<PostRecord>> {
        collect_posts(
            self.conn,
            &format!("{POST_SELECT_SQL} WHERE forum_uuid = ?1 ORDER BY created_at, uuid;"),
            forum.to_string(),
        )
    }

    fn list_children(&self, parent: PostId) -> RepoResult<Vec<PostRecord>> {
        collect_posts(
            self.conn,
            &format!("{POST_SELECT_SQL} WHERE parent_uuid = ?1 ORDER BY created_at, uuid;"),
            parent.to_string(),
        )
    }

    fn set_post_forum(&self, post: PostId, forum: Option<ForumId>) -> RepoResult<()> {
        self.update_post_link(post, "forum_uuid", forum.map(|id| id.to_string()))
    }

    fn set_post_parent(&self, post: PostId, parent: Option<PostId>) -> RepoResult<()> {
        self.update_post_link(post, "parent_uuid", parent.map(|id| id.to_string()))
    }

    fn set_post_poster(&self, post: PostId, poster: UserId) -> RepoResult<()> {
        self.update_post_link(post, "poster_uuid", Some(poster.to_string()))
    }

    fn set_post_deleted(&self, post: PostId, deleted: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE posts SET is_deleted = ?1 WHERE uuid = ?2;",
            params![bool_to_int(deleted), post.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityKind::Post, post));
        }
        Ok(())
    }

    fn update_post_content(&self, post: PostId, title: &str, message: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE posts SET title = ?1, message = ?2 WHERE uuid = ?3;",
            params![title, message, post.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityKind::Post, post));
        }
        Ok(())
    }

    fn create_reaction(&self, record: &ReactionRecord) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO reactions (uuid, reaction_type, user_uuid, parent_uuid)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                record.uuid.to_string(),
                reaction_kind_to_db(record.kind),
                record.user.to_string(),
                record.parent.map(|id| id.to_string()),
            ],
        )?;
        Ok(())
    }

    fn delete_reaction(&self, id: ReactionId) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM reactions WHERE uuid = ?1;", [id.to_string()])?;
        Ok(())
    }

    fn list_reactions_by_parent(&self, parent: PostId) -> RepoResult<Vec<ReactionRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REACTION_SELECT_SQL} WHERE parent_uuid = ?1 ORDER BY uuid;"
        ))?;
        let mut rows = stmt.query([parent.to_string()])?;
        let mut reactions = Vec::new();
        while let Some(row) = rows.next()? {
            reactions.push(parse_reaction_row(row)?);
        }
        Ok(reactions)
    }

    fn list_reactions_by_user(&self, user: UserId) -> RepoResult<Vec<ReactionRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REACTION_SELECT_SQL} WHERE user_uuid = ?1 ORDER BY uuid;"
        ))?;
        let mut rows = stmt.query([user.to_string()])?;
        let mut reactions = Vec::new();
        while let Some(row) = rows.next()? {
            reactions.push(parse_reaction_row(row)?);
        }
        Ok(reactions)
    }
}

fn collect_posts(conn: &Connection, sql: &str, key: String) -> RepoResult<Vec<PostRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([key.as_str()])?;
    let mut posts = Vec::new();
    while let Some(row) = rows.next()? {
        posts.push(parse_post_row(row)?);
    }
    Ok(posts)
}

fn parse_post_row(row: &Row<'_>) -> RepoResult<PostRecord> {
    let uuid_text: String = row.get("uuid")?;
    let poster_text: String = row.get("poster_uuid")?;
    let forum = match row.get::<_, Option<String>>("forum_uuid")? {
        Some(text) => Some(parse_uuid(&text, "posts.forum_uuid")?),
        None => None,
    };
    let parent = match row.get::<_, Option<String>>("parent_uuid")? {
        Some(text) => Some(parse_uuid(&text, "posts.parent_uuid")?),
        None => None,
    };
    Ok(PostRecord {
        uuid: parse_uuid(&uuid_text, "posts.uuid")?,
        poster: parse_uuid(&poster_text, "posts.poster_uuid")?,
        forum,
        parent,
        title: row.get("title")?,
        message: row.get("message")?,
        is_deleted: parse_bool(row.get("is_deleted")?, "posts.is_deleted")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_reaction_row(row: &Row<'_>) -> RepoResult<ReactionRecord> {
    let uuid_text: String = row.get("uuid")?;
    let user_text: String = row.get("user_uuid")?;
    let kind_text: String = row.get("reaction_type")?;
    let kind = parse_reaction_kind(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid reaction type `{kind_text}` in reactions.reaction_type"
        ))
    })?;
    let parent = match row.get::<_, Option<String>>("parent_uuid")? {
        Some(text) => Some(parse_uuid(&text, "reactions.parent_uuid")?),
        None => None,
    };
    Ok(ReactionRecord {
        uuid: parse_uuid(&uuid_text, "reactions.uuid")?,
        kind,
        user: parse_uuid(&user_text, "reactions.user_uuid")?,
        parent,
    })
}

fn reaction_kind_to_db(kind: ReactionKind) -> &'static str {
    match kind {
        ReactionKind::Like => "like",
        ReactionKind::Dislike => "dislike",
        ReactionKind::Heart => "heart",
        ReactionKind::Flag => "flag",
    }
}

fn parse_reaction_kind(value: &str) -> Option<ReactionKind> {
    match value {
        "like" => Some(ReactionKind::Like),
        "dislike" => Some(ReactionKind::Dislike),
        "heart" => Some(ReactionKind::Heart),
        "flag" => Some(ReactionKind::Flag),
        _ => None,
    }
}
