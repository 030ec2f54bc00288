//! Core types for the blog API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// An account that owns posts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Unique user identifier
    pub id: i64,
    /// Unique email address
    pub email: String,
    /// Display name
    pub name: Option<String>,
}

/// A blog post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Unique post identifier
    pub id: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last write
    pub updated_at: DateTime<Utc>,
    /// Post title
    pub title: String,
    /// Post body
    pub content: Option<String>,
    /// Whether the post appears in the feed
    pub published: bool,
    /// Number of recorded views
    pub view_count: i64,
    /// Owning user's identifier
    pub author_id: i64,
}

/// A post with its author embedded, as returned by the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PostWithAuthor {
    #[serde(flatten)]
    pub post: Post,
    pub author: User,
}

/// Fields required to create a post
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: Option<String>,
    pub author_id: i64,
}

/// Partial post update; `None` leaves the field untouched
#[derive(Debug, Clone)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Direction for ordering the feed by `updatedAt`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Parse `asc` or `desc`; anything else is `None`
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Validated feed query.
///
/// Defaults (all `None`): no text filter, no offset, no limit, and posts in
/// ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedQuery {
    /// Substring that must appear in the title or the content
    pub search: Option<String>,
    /// Number of matching posts to skip
    pub skip: Option<u64>,
    /// Maximum number of posts to return
    pub take: Option<u64>,
    /// Ordering by `updatedAt`
    pub order: Option<SortOrder>,
}

impl FeedQuery {
    /// Build a query from raw query-string values.
    ///
    /// Pagination values are read from their leading digits (`"5abc"` is 5);
    /// values without any are dropped, as is an `orderBy` other than
    /// `asc`/`desc`.
    pub fn from_raw(
        search: Option<String>,
        skip: Option<&str>,
        take: Option<&str>,
        order_by: Option<&str>,
    ) -> Self {
        let order = order_by.and_then(|raw| {
            let order = SortOrder::parse(raw);
            if order.is_none() {
                tracing::warn!(order_by = raw, "Ignoring unsupported feed ordering");
            }
            order
        });

        Self {
            search,
            skip: skip.and_then(parse_count),
            take: take.and_then(parse_count),
            order,
        }
    }
}

fn parse_count(raw: &str) -> Option<u64> {
    let raw = raw.trim_start();
    let end = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    raw[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_serializes_camel_case() {
        let now = Utc::now();
        let post = Post {
            id: 1,
            created_at: now,
            updated_at: now,
            title: "Hi".into(),
            content: Some("body".into()),
            published: false,
            view_count: 0,
            author_id: 1,
        };

        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["viewCount"], 0);
        assert_eq!(json["authorId"], 1);
        assert!(json.get("updatedAt").is_some());
        assert!(json.get("view_count").is_none());
    }

    #[test]
    fn test_post_with_author_flattens_post_fields() {
        let now = Utc::now();
        let item = PostWithAuthor {
            post: Post {
                id: 3,
                created_at: now,
                updated_at: now,
                title: "t".into(),
                content: None,
                published: true,
                view_count: 2,
                author_id: 9,
            },
            author: User {
                id: 9,
                email: "a@x.com".into(),
                name: None,
            },
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["author"]["email"], "a@x.com");
    }

    #[test]
    fn test_feed_query_parses_valid_values() {
        let query = FeedQuery::from_raw(Some("foo".into()), Some("2"), Some(" 5 "), Some("desc"));
        assert_eq!(
            query,
            FeedQuery {
                search: Some("foo".into()),
                skip: Some(2),
                take: Some(5),
                order: Some(SortOrder::Desc),
            }
        );
    }

    #[test]
    fn test_feed_query_drops_invalid_values() {
        let query = FeedQuery::from_raw(None, Some("abc"), Some("-3"), Some("sideways"));
        assert_eq!(query, FeedQuery::default());
    }

    #[test]
    fn test_feed_query_reads_leading_digits() {
        let query = FeedQuery::from_raw(None, Some("3rd"), Some("1abc"), None);
        assert_eq!(query.skip, Some(3));
        assert_eq!(query.take, Some(1));

        let query = FeedQuery::from_raw(None, Some(""), Some("x1"), None);
        assert_eq!(query.skip, None);
        assert_eq!(query.take, None);
    }

    #[test]
    fn test_sort_order_is_case_sensitive() {
        assert_eq!(SortOrder::parse("asc"), Some(SortOrder::Asc));
        assert_eq!(SortOrder::parse("ASC"), None);
    }
}
