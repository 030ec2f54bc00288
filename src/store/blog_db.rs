//! SQLite-backed blog storage

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::types::{FeedQuery, NewPost, Post, PostUpdate, PostWithAuthor, User};

const POST_COLUMNS: &str =
    "id, created_at, updated_at, title, content, published, view_count, author_id";

/// SQLite database holding users and posts
pub struct BlogDb {
    conn: Mutex<Connection>,
}

impl BlogDb {
    /// Open or create the database
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        Self::from_connection(Connection::open(path)?)
    }

    /// Open a private in-memory database
    #[cfg(test)]
    fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Other("database connection lock poisoned".into()))
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                name TEXT
            );

            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT,
                published INTEGER NOT NULL DEFAULT 0,
                view_count INTEGER NOT NULL DEFAULT 0,
                author_id INTEGER NOT NULL,
                FOREIGN KEY (author_id) REFERENCES users(id)
            );

            CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id, published);
            CREATE INDEX IF NOT EXISTS idx_posts_updated ON posts(updated_at);
            "#,
        )?;

        Ok(())
    }

    // Users

    /// Insert a user
    pub fn create_user(&self, email: &str, name: Option<&str>) -> Result<User> {
        let conn = self.conn()?;

        let user = conn.query_row(
            "INSERT INTO users (email, name) VALUES (?1, ?2) RETURNING id, email, name",
            params![email, name],
            |row| user_from_row(row, 0),
        )?;

        Ok(user)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;

        let user = conn
            .query_row(
                "SELECT id, email, name FROM users WHERE email = ?1",
                params![email],
                |row| user_from_row(row, 0),
            )
            .optional()?;

        Ok(user)
    }

    /// All users in id order
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, email, name FROM users ORDER BY id")?;

        let users = stmt
            .query_map([], |row| user_from_row(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(users)
    }

    // Posts

    /// Insert a post. The author must exist.
    pub fn create_post(&self, post: NewPost) -> Result<Post> {
        let conn = self.conn()?;
        let now = timestamp(Utc::now());

        let post = conn.query_row(
            &format!(
                "INSERT INTO posts (created_at, updated_at, title, content, author_id)
                 VALUES (?1, ?1, ?2, ?3, ?4)
                 RETURNING {POST_COLUMNS}"
            ),
            params![now, post.title, post.content, post.author_id],
            |row| post_from_row(row, 0),
        )?;

        Ok(post)
    }

    pub fn find_post(&self, id: i64) -> Result<Option<Post>> {
        let conn = self.conn()?;

        let post = conn
            .query_row(
                &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
                params![id],
                |row| post_from_row(row, 0),
            )
            .optional()?;

        Ok(post)
    }

    /// Add one to a post's view count
    pub fn increment_views(&self, id: i64) -> Result<Post> {
        self.update_returning(id, "view_count = view_count + 1", &[])
    }

    /// Flip a post's `published` flag
    pub fn toggle_published(&self, id: i64) -> Result<Post> {
        self.update_returning(id, "published = NOT published", &[])
    }

    /// Overwrite the fields present in `update`
    pub fn update_post(&self, id: i64, update: PostUpdate) -> Result<Post> {
        self.update_returning(
            id,
            "title = COALESCE(?3, title), content = COALESCE(?4, content)",
            &[&update.title, &update.content],
        )
    }

    /// Run `UPDATE posts SET <assignments>` on one row, bumping `updated_at`.
    ///
    /// `?1` is the id and `?2` the new timestamp; `extra` binds from `?3` on.
    fn update_returning(
        &self,
        id: i64,
        assignments: &str,
        extra: &[&dyn rusqlite::ToSql],
    ) -> Result<Post> {
        let conn = self.conn()?;
        let now = timestamp(Utc::now());

        let mut bound: Vec<&dyn rusqlite::ToSql> = vec![&id, &now];
        bound.extend_from_slice(extra);

        conn.query_row(
            &format!(
                "UPDATE posts SET {assignments}, updated_at = ?2
                 WHERE id = ?1
                 RETURNING {POST_COLUMNS}"
            ),
            bound.as_slice(),
            |row| post_from_row(row, 0),
        )
        .optional()?
        .ok_or(Error::PostNotFound(id))
    }

    /// Delete a post, returning the removed row
    pub fn delete_post(&self, id: i64) -> Result<Post> {
        let conn = self.conn()?;

        conn.query_row(
            &format!("DELETE FROM posts WHERE id = ?1 RETURNING {POST_COLUMNS}"),
            params![id],
            |row| post_from_row(row, 0),
        )
        .optional()?
        .ok_or(Error::PostNotFound(id))
    }

    /// Unpublished posts of one author
    pub fn drafts_by_author(&self, author_id: i64) -> Result<Vec<Post>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {POST_COLUMNS} FROM posts
             WHERE author_id = ?1 AND published = 0
             ORDER BY id"
        ))?;

        let posts = stmt
            .query_map(params![author_id], |row| post_from_row(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(posts)
    }

    /// Published posts matching `query`, each with its author
    pub fn feed(&self, query: &FeedQuery) -> Result<Vec<PostWithAuthor>> {
        let order = match query.order {
            Some(order) => format!("p.updated_at {0}, p.id {0}", order.as_sql()),
            None => "p.id ASC".to_string(),
        };
        // SQLite treats a negative LIMIT as "no limit"
        let limit = query.take.map_or(-1, clamp_i64);
        let offset = query.skip.map_or(0, clamp_i64);

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT p.id, p.created_at, p.updated_at, p.title, p.content, p.published,
                   p.view_count, p.author_id, u.id, u.email, u.name
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.published = 1
              AND (?1 IS NULL OR instr(p.title, ?1) > 0 OR instr(p.content, ?1) > 0)
            ORDER BY {order}
            LIMIT ?2 OFFSET ?3
            "#
        ))?;

        let posts = stmt
            .query_map(params![query.search, limit, offset], |row| {
                Ok(PostWithAuthor {
                    post: post_from_row(row, 0)?,
                    author: user_from_row(row, 8)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(posts)
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Fixed-width RFC 3339 so text order matches time order
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn user_from_row(row: &Row, offset: usize) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(offset)?,
        email: row.get(offset + 1)?,
        name: row.get(offset + 2)?,
    })
}

fn post_from_row(row: &Row, offset: usize) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(offset)?,
        created_at: parse_timestamp(row, offset + 1)?,
        updated_at: parse_timestamp(row, offset + 2)?,
        title: row.get(offset + 3)?,
        content: row.get(offset + 4)?,
        published: row.get(offset + 5)?,
        view_count: row.get(offset + 6)?,
        author_id: row.get(offset + 7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SortOrder;
    use tempfile::TempDir;

    fn new_post(db: &BlogDb, author_id: i64, title: &str, content: Option<&str>) -> Post {
        db.create_post(NewPost {
            title: title.into(),
            content: content.map(String::from),
            author_id,
        })
        .unwrap()
    }

    fn published(db: &BlogDb, author_id: i64, title: &str, content: Option<&str>) -> Post {
        let post = new_post(db, author_id, title, content);
        db.toggle_published(post.id).unwrap()
    }

    #[test]
    fn test_open_creates_file_and_is_reopenable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("blog.db");

        {
            let db = BlogDb::open(&path).unwrap();
            db.create_user("a@x.com", Some("Alice")).unwrap();
        }

        let db = BlogDb::open(&path).unwrap();
        assert_eq!(db.list_users().unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let db = BlogDb::open_in_memory().unwrap();
        db.create_user("a@x.com", None).unwrap();

        let err = db.create_user("a@x.com", None).unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_create_post_defaults() {
        let db = BlogDb::open_in_memory().unwrap();
        let user = db.create_user("a@x.com", None).unwrap();

        let post = new_post(&db, user.id, "Hi", Some("body"));
        assert_eq!(post.author_id, user.id);
        assert_eq!(post.view_count, 0);
        assert!(!post.published);
        assert_eq!(post.created_at, post.updated_at);
        assert_eq!(db.find_post(post.id).unwrap(), Some(post));
    }

    #[test]
    fn test_create_post_requires_existing_author() {
        let db = BlogDb::open_in_memory().unwrap();

        let err = db
            .create_post(NewPost {
                title: "orphan".into(),
                content: None,
                author_id: 42,
            })
            .unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_increment_views_and_missing_post() {
        let db = BlogDb::open_in_memory().unwrap();
        let user = db.create_user("a@x.com", None).unwrap();
        let post = new_post(&db, user.id, "Hi", None);

        db.increment_views(post.id).unwrap();
        let post = db.increment_views(post.id).unwrap();
        assert_eq!(post.view_count, 2);
        assert!(post.updated_at >= post.created_at);

        assert!(matches!(db.increment_views(999), Err(Error::PostNotFound(999))));
    }

    #[test]
    fn test_toggle_published_twice_is_identity() {
        let db = BlogDb::open_in_memory().unwrap();
        let user = db.create_user("a@x.com", None).unwrap();
        let post = new_post(&db, user.id, "Hi", None);

        assert!(db.toggle_published(post.id).unwrap().published);
        assert!(!db.toggle_published(post.id).unwrap().published);
    }

    #[test]
    fn test_update_post_keeps_missing_fields() {
        let db = BlogDb::open_in_memory().unwrap();
        let user = db.create_user("a@x.com", None).unwrap();
        let post = new_post(&db, user.id, "Hi", Some("body"));

        let updated = db
            .update_post(
                post.id,
                PostUpdate {
                    title: Some("Hello".into()),
                    content: None,
                },
            )
            .unwrap();
        assert_eq!(updated.title, "Hello");
        assert_eq!(updated.content.as_deref(), Some("body"));
    }

    #[test]
    fn test_delete_post_returns_row() {
        let db = BlogDb::open_in_memory().unwrap();
        let user = db.create_user("a@x.com", None).unwrap();
        let post = new_post(&db, user.id, "Hi", None);

        assert_eq!(db.delete_post(post.id).unwrap().id, post.id);
        assert_eq!(db.find_post(post.id).unwrap(), None);
        assert!(matches!(db.delete_post(post.id), Err(Error::PostNotFound(_))));
    }

    #[test]
    fn test_drafts_excludes_published_and_other_authors() {
        let db = BlogDb::open_in_memory().unwrap();
        let alice = db.create_user("a@x.com", None).unwrap();
        let bob = db.create_user("b@x.com", None).unwrap();

        let draft = new_post(&db, alice.id, "draft", None);
        published(&db, alice.id, "live", None);
        new_post(&db, bob.id, "bob's draft", None);

        let drafts = db.drafts_by_author(alice.id).unwrap();
        assert_eq!(drafts, vec![draft]);
    }

    #[test]
    fn test_feed_filters_by_search_string() {
        let db = BlogDb::open_in_memory().unwrap();
        let user = db.create_user("a@x.com", None).unwrap();

        let in_title = published(&db, user.id, "foo bar", None);
        let in_content = published(&db, user.id, "other", Some("has foo inside"));
        published(&db, user.id, "nothing", Some("here"));
        new_post(&db, user.id, "foo draft", None);

        let query = FeedQuery {
            search: Some("foo".into()),
            ..FeedQuery::default()
        };
        let ids: Vec<i64> = db.feed(&query).unwrap().iter().map(|p| p.post.id).collect();
        assert_eq!(ids, vec![in_title.id, in_content.id]);

        let all = db.feed(&FeedQuery::default()).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|p| p.post.published));
        assert!(all.iter().all(|p| p.author == user));
    }

    #[test]
    fn test_feed_orders_by_updated_at() {
        let db = BlogDb::open_in_memory().unwrap();
        let user = db.create_user("a@x.com", None).unwrap();
        let first = published(&db, user.id, "first", None);
        let second = published(&db, user.id, "second", None);

        std::thread::sleep(std::time::Duration::from_millis(2));
        db.increment_views(first.id).unwrap();

        let desc = FeedQuery {
            order: Some(SortOrder::Desc),
            ..FeedQuery::default()
        };
        let got: Vec<i64> = db.feed(&desc).unwrap().iter().map(|p| p.post.id).collect();
        assert_eq!(got, vec![first.id, second.id]);

        let asc = FeedQuery {
            order: Some(SortOrder::Asc),
            ..FeedQuery::default()
        };
        let got: Vec<i64> = db.feed(&asc).unwrap().iter().map(|p| p.post.id).collect();
        assert_eq!(got, vec![second.id, first.id]);
    }

    #[test]
    fn test_feed_paginates_and_orders() {
        let db = BlogDb::open_in_memory().unwrap();
        let user = db.create_user("a@x.com", None).unwrap();
        let ids: Vec<i64> = (0..5)
            .map(|i| published(&db, user.id, &format!("post {i}"), None).id)
            .collect();

        let page = FeedQuery {
            skip: Some(1),
            take: Some(2),
            ..FeedQuery::default()
        };
        let got: Vec<i64> = db.feed(&page).unwrap().iter().map(|p| p.post.id).collect();
        assert_eq!(got, ids[1..3]);

        let desc = FeedQuery {
            order: Some(SortOrder::Desc),
            ..FeedQuery::default()
        };
        let got: Vec<i64> = db.feed(&desc).unwrap().iter().map(|p| p.post.id).collect();
        let mut expected = ids.clone();
        expected.reverse();
        assert_eq!(got, expected);

        let skip_only = FeedQuery {
            skip: Some(3),
            ..FeedQuery::default()
        };
        assert_eq!(db.feed(&skip_only).unwrap().len(), 2);
    }
}
