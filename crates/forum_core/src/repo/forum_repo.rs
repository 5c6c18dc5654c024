//! Forum repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide forum rows by id or natural key (course name).
//! - Own the relationship-edge primitives for the three forum↔user
//!   association sets behind one `MemberSet` selector.
//! - Delete a forum and its owned content transactionally.

use crate::model::forum::ForumId;
use crate::model::post::PostId;
use crate::model::user::UserId;
use crate::repo::{parse_uuid, RepoResult};
use rusqlite::{params, Connection, Row};

const FORUM_SELECT_SQL: &str = "SELECT uuid, course_name, created_at FROM forums";

/// Recursive walk over a forum's post tree: top-level posts plus every
/// descendant comment.
const FORUM_POST_TREE_SQL: &str = "WITH RECURSIVE forum_posts(uuid) AS (
    SELECT uuid FROM posts WHERE forum_uuid = ?1
    UNION
    SELECT p.uuid FROM posts p JOIN forum_posts fp ON p.parent_uuid = fp.uuid
)";

/// Row shape exchanged with the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForumRecord {
    pub uuid: ForumId,
    pub course_name: String,
    pub created_at: i64,
}

/// Selector for the three forum↔user association sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberSet {
    Members,
    Authorized,
    Restricted,
}

impl MemberSet {
    fn table(self) -> &'static str {
        match self {
            Self::Members => "forum_members",
            Self::Authorized => "forum_authorized",
            Self::Restricted => "forum_restricted",
        }
    }
}

/// Repository interface for forum persistence.
pub trait ForumRepository {
    fn create_forum(&self, record: &ForumRecord) -> RepoResult<()>;
    fn find_forum(&self, id: ForumId) -> RepoResult<Option<ForumRecord>>;
    fn find_forum_by_course_name(&self, course_name: &str) -> RepoResult<Option<ForumRecord>>;
    fn list_forums(&self) -> RepoResult<Vec<ForumRecord>>;
    /// Inserts one membership edge. Idempotent.
    fn add_edge(&self, set: MemberSet, forum: ForumId, user: UserId) -> RepoResult<()>;
    /// Removes one membership edge. No-op when absent.
    fn remove_edge(&self, set: MemberSet, forum: ForumId, user: UserId) -> RepoResult<()>;
    /// Moves one membership edge from `from` to `to` in a single transaction,
    /// so the store never holds the user in both sets.
    fn move_edge(&self, forum: ForumId, user: UserId, to: MemberSet, from: MemberSet)
        -> RepoResult<()>;
    fn list_edge_users(&self, set: MemberSet, forum: ForumId) -> RepoResult<Vec<UserId>>;
    /// Ids of every post in the forum's tree, comments included.
    fn list_post_tree(&self, forum: ForumId) -> RepoResult<Vec<PostId>>;
    /// Removes the forum row, its post tree, those posts' reactions and all
    /// membership edges in one transaction.
    fn delete_forum_cascade(&self, forum: ForumId) -> RepoResult<()>;
}

/// SQLite-backed forum repository.
pub struct SqliteForumRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteForumRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ForumRepository for SqliteForumRepository<'_> {
    fn create_forum(&self, record: &ForumRecord) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO forums (uuid, course_name, created_at) VALUES (?1, ?2, ?3);",
            params![
                record.uuid.to_string(),
                record.course_name.as_str(),
                record.created_at,
            ],
        )?;
        Ok(())
    }

    fn find_forum(&self, id: ForumId) -> RepoResult<Option<ForumRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{FORUM_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_forum_row(row)?));
        }
        Ok(None)
    }

    fn find_forum_by_course_name(&self, course_name: &str) -> RepoResult<Option<ForumRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{FORUM_SELECT_SQL} WHERE course_name = ?1;"))?;
        let mut rows = stmt.query([course_name])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_forum_row(row)?));
        }
        Ok(None)
    }

    fn list_forums(&self) -> RepoResult<Vec<ForumRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{FORUM_SELECT_SQL} ORDER BY created_at, uuid;"))?;
        let mut rows = stmt.query([])?;
        let mut forums = Vec::new();
        while let Some(row) = rows.next()? {
            forums.push(parse_forum_row(row)?);
        }
        Ok(forums)
    }

    fn add_edge(&self, set: MemberSet, forum: ForumId, user: UserId) -> RepoResult<()> {
        self.conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} (forum_uuid, user_uuid) VALUES (?1, ?2);",
                set.table()
            ),
            params![forum.to_string(), user.to_string()],
        )?;
        Ok(())
    }

    fn remove_edge(&self, set: MemberSet, forum: ForumId, user: UserId) -> RepoResult<()> {
        self.conn.execute(
            &format!(
                "DELETE FROM {} WHERE forum_uuid = ?1 AND user_uuid = ?2;",
                set.table()
            ),
            params![forum.to_string(), user.to_string()],
        )?;
        Ok(())
    }

    fn move_edge(
        &self,
        forum: ForumId,
        user: UserId,
        to: MemberSet,
        from: MemberSet,
    ) -> RepoResult<()> {
        let forum_key = forum.to_string();
        let user_key = user.to_string();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            &format!(
                "INSERT OR IGNORE INTO {} (forum_uuid, user_uuid) VALUES (?1, ?2);",
                to.table()
            ),
            params![forum_key.as_str(), user_key.as_str()],
        )?;
        tx.execute(
            &format!(
                "DELETE FROM {} WHERE forum_uuid = ?1 AND user_uuid = ?2;",
                from.table()
            ),
            params![forum_key.as_str(), user_key.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn list_edge_users(&self, set: MemberSet, forum: ForumId) -> RepoResult<Vec<UserId>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT user_uuid FROM {} WHERE forum_uuid = ?1 ORDER BY user_uuid;",
            set.table()
        ))?;
        let mut rows = stmt.query([forum.to_string()])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            users.push(parse_uuid(&text, "user_uuid")?);
        }
        Ok(users)
    }

    fn list_post_tree(&self, forum: ForumId) -> RepoResult<Vec<PostId>> {
        let mut stmt = self.conn.prepare(&format!(
            "{FORUM_POST_TREE_SQL} SELECT uuid FROM forum_posts;"
        ))?;
        let mut rows = stmt.query([forum.to_string()])?;
        let mut posts = Vec::new();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            posts.push(parse_uuid(&text, "posts.uuid")?);
        }
        Ok(posts)
    }

    fn delete_forum_cascade(&self, forum: ForumId) -> RepoResult<()> {
        let forum_key = forum.to_string();
        let tx = self.conn.unchecked_transaction()?;
        // Subtree rows reference each other via parent_uuid; defer checks so
        // one DELETE can take the whole tree regardless of row order.
        tx.execute_batch("PRAGMA defer_foreign_keys = ON;")?;
        tx.execute(
            &format!(
                "{FORUM_POST_TREE_SQL}
                 DELETE FROM reactions
                 WHERE parent_uuid IN (SELECT uuid FROM forum_posts);"
            ),
            [forum_key.as_str()],
        )?;
        tx.execute(
            &format!(
                "{FORUM_POST_TREE_SQL}
                 DELETE FROM posts
                 WHERE uuid IN (SELECT uuid FROM forum_posts);"
            ),
            [forum_key.as_str()],
        )?;
        for set in [MemberSet::Members, MemberSet::Authorized, MemberSet::Restricted] {
            tx.execute(
                &format!("DELETE FROM {} WHERE forum_uuid = ?1;", set.table()),
                [forum_key.as_str()],
            )?;
        }
        tx.execute("DELETE FROM forums WHERE uuid = ?1;", [forum_key.as_str()])?;
        tx.commit()?;
        Ok(())
    }
}

fn parse_forum_row(row: &Row<'_>) -> RepoResult<ForumRecord> {
    let uuid_text: String = row.get("uuid")?;
    Ok(ForumRecord {
        uuid: parse_uuid(&uuid_text, "forums.uuid")?,
        course_name: row.get("course_name")?,
        created_at: row.get("created_at")?,
    })
}
