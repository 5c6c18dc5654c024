//! User repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide account rows by id or natural key (email).
//! - List the ids of a user's related forums, posts and reactions so load
//!   paths can populate owned collections without recursive materialization.

use crate::model::forum::ForumId;
use crate::model::post::PostId;
use crate::model::reaction::ReactionId;
use crate::model::user::UserId;
use crate::registry::EntityKind;
use crate::repo::{bool_to_int, parse_bool, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const USER_SELECT_SQL: &str = "SELECT
    uuid,
    username,
    email,
    major,
    year,
    first_name,
    last_name,
    is_deleted,
    is_admin,
    created_at
FROM users";

/// Row shape exchanged with the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub uuid: UserId,
    pub username: String,
    pub email: String,
    pub major: String,
    pub year: i64,
    pub first_name: String,
    pub last_name: String,
    pub is_deleted: bool,
    pub is_admin: bool,
    pub created_at: i64,
}

/// Repository interface for account persistence.
pub trait UserRepository {
    fn create_user(&self, record: &UserRecord) -> RepoResult<()>;
    fn find_user(&self, id: UserId) -> RepoResult<Option<UserRecord>>;
    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<UserRecord>>;
    fn set_user_deleted(&self, id: UserId, deleted: bool) -> RepoResult<()>;
    fn list_forum_ids(&self, user: UserId) -> RepoResult<Vec<ForumId>>;
    fn list_post_ids(&self, user: UserId) -> RepoResult<Vec<PostId>>;
    fn list_reaction_ids(&self, user: UserId) -> RepoResult<Vec<ReactionId>>;
}

/// SQLite-backed account repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, record: &UserRecord) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO users (
                uuid,
                username,
                email,
                major,
                year,
                first_name,
                last_name,
                is_deleted,
                is_admin,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                record.uuid.to_string(),
                record.username.as_str(),
                record.email.as_str(),
                record.major.as_str(),
                record.year,
                record.first_name.as_str(),
                record.last_name.as_str(),
                bool_to_int(record.is_deleted),
                bool_to_int(record.is_admin),
                record.created_at,
            ],
        )?;
        Ok(())
    }

    fn find_user(&self, id: UserId) -> RepoResult<Option<UserRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<UserRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE email = ?1;"))?;
        let mut rows = stmt.query([email])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn set_user_deleted(&self, id: UserId, deleted: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users SET is_deleted = ?1 WHERE uuid = ?2;",
            params![bool_to_int(deleted), id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityKind::User, id));
        }
        Ok(())
    }

    fn list_forum_ids(&self, user: UserId) -> RepoResult<Vec<ForumId>> {
        list_id_column(
            self.conn,
            "SELECT forum_uuid FROM forum_members WHERE user_uuid = ?1 ORDER BY forum_uuid;",
            user,
            "forum_members.forum_uuid",
        )
    }

    fn list_post_ids(&self, user: UserId) -> RepoResult<Vec<PostId>> {
        list_id_column(
            self.conn,
            "SELECT uuid FROM posts WHERE poster_uuid = ?1 ORDER BY created_at, uuid;",
            user,
            "posts.uuid",
        )
    }

    fn list_reaction_ids(&self, user: UserId) -> RepoResult<Vec<ReactionId>> {
        list_id_column(
            self.conn,
            "SELECT uuid FROM reactions WHERE user_uuid = ?1 ORDER BY uuid;",
            user,
            "reactions.uuid",
        )
    }
}

fn list_id_column(
    conn: &Connection,
    sql: &str,
    user: UserId,
    column: &str,
) -> RepoResult<Vec<uuid::Uuid>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([user.to_string()])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let text: String = row.get(0)?;
        ids.push(parse_uuid(&text, column)?);
    }
    Ok(ids)
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<UserRecord> {
    let uuid_text: String = row.get("uuid")?;
    Ok(UserRecord {
        uuid: parse_uuid(&uuid_text, "users.uuid")?,
        username: row.get("username")?,
        email: row.get("email")?,
        major: row.get("major")?,
        year: row.get("year")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        is_deleted: parse_bool(row.get("is_deleted")?, "users.is_deleted")?,
        is_admin: parse_bool(row.get("is_admin")?, "users.is_admin")?,
        created_at: row.get("created_at")?,
    })
}
