//! RSS repositories for Gator.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::types::{Feed, FeedFollow, FeedWithOwner, NewFeed, NewPost, Post};
use crate::datetime::to_db_timestamp;
use crate::db::{parse_id, parse_timestamp};
use crate::{GatorError, Result};

const FEED_COLUMNS: &str = "id, name, url, user_id, last_fetched_at, created_at, updated_at";

/// Row type for feed from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedRow {
    id: String,
    name: String,
    url: String,
    user_id: String,
    last_fetched_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: parse_id(&row.id),
            name: row.name,
            url: row.url,
            user_id: parse_id(&row.user_id),
            last_fetched_at: row.last_fetched_at.as_deref().map(parse_timestamp),
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        }
    }
}

/// Row type for feed joined with its owner's name.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedWithOwnerRow {
    id: String,
    name: String,
    url: String,
    user_id: String,
    last_fetched_at: Option<String>,
    created_at: String,
    updated_at: String,
    owner_name: String,
}

impl From<FeedWithOwnerRow> for FeedWithOwner {
    fn from(row: FeedWithOwnerRow) -> Self {
        let feed = Feed::from(FeedRow {
            id: row.id,
            name: row.name,
            url: row.url,
            user_id: row.user_id,
            last_fetched_at: row.last_fetched_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        });
        FeedWithOwner {
            feed,
            owner_name: row.owner_name,
        }
    }
}

/// Row type for follow joined with feed and user names.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedFollowRow {
    id: String,
    user_id: String,
    feed_id: String,
    feed_name: String,
    user_name: String,
    created_at: String,
    updated_at: String,
}

impl From<FeedFollowRow> for FeedFollow {
    fn from(row: FeedFollowRow) -> Self {
        FeedFollow {
            id: parse_id(&row.id),
            user_id: parse_id(&row.user_id),
            feed_id: parse_id(&row.feed_id),
            feed_name: row.feed_name,
            user_name: row.user_name,
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        }
    }
}

/// Row type for post from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PostRow {
    id: String,
    title: String,
    url: String,
    description: String,
    published_at: String,
    feed_id: String,
    created_at: String,
    updated_at: String,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: parse_id(&row.id),
            title: row.title,
            url: row.url,
            description: row.description,
            published_at: parse_timestamp(&row.published_at),
            feed_id: parse_id(&row.feed_id),
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        }
    }
}

async fn insert_feed(conn: &mut SqliteConnection, feed: &NewFeed) -> Result<()> {
    let created_at = to_db_timestamp(&feed.created_at);
    sqlx::query(
        r#"
        INSERT INTO feeds (id, name, url, user_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(feed.id.to_string())
    .bind(&feed.name)
    .bind(&feed.url)
    .bind(feed.user_id.to_string())
    .bind(&created_at)
    .bind(&created_at)
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_follow(
    conn: &mut SqliteConnection,
    id: &Uuid,
    user_id: &Uuid,
    feed_id: &Uuid,
) -> Result<()> {
    let now = to_db_timestamp(&Utc::now());
    sqlx::query(
        r#"
        INSERT INTO feed_follows (id, user_id, feed_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(user_id.to_string())
    .bind(feed_id.to_string())
    .bind(&now)
    .bind(&now)
    .execute(conn)
    .await?;
    Ok(())
}

/// Repository for feed operations.
pub struct FeedRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FeedRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new feed.
    ///
    /// A URL that is already registered surfaces as
    /// [`GatorError::UniqueViolation`].
    pub async fn create(&self, feed: &NewFeed) -> Result<Feed> {
        insert_feed(&mut *self.pool.acquire().await?, feed).await?;

        self.get_by_id(&feed.id)
            .await?
            .ok_or_else(|| GatorError::NotFound("feed".into()))
    }

    /// Create a feed and a follow of it by its owner in one transaction.
    ///
    /// If either insert fails nothing is written.
    pub async fn create_followed(&self, feed: &NewFeed) -> Result<(Feed, FeedFollow)> {
        let follow_id = Uuid::new_v4();

        let mut tx = self.pool.begin().await?;
        insert_feed(&mut tx, feed).await?;
        insert_follow(&mut tx, &follow_id, &feed.user_id, &feed.id).await?;
        tx.commit().await?;

        let created = self
            .get_by_id(&feed.id)
            .await?
            .ok_or_else(|| GatorError::NotFound("feed".into()))?;
        let follow = FeedFollowRepository::new(self.pool)
            .get_by_id(&follow_id)
            .await?
            .ok_or_else(|| GatorError::NotFound("feed follow".into()))?;
        Ok((created, follow))
    }

    /// Get a feed by ID.
    pub async fn get_by_id(&self, id: &Uuid) -> Result<Option<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = ?");
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(id.to_string())
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Feed::from))
    }

    /// Get a feed by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let query = format!("SELECT {FEED_COLUMNS} FROM feeds WHERE url = ?");
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(url)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Feed::from))
    }

    /// List all feeds with their owner's name (ordered by creation).
    pub async fn list_with_owner(&self) -> Result<Vec<FeedWithOwner>> {
        let rows = sqlx::query_as::<_, FeedWithOwnerRow>(
            r#"
            SELECT f.id, f.name, f.url, f.user_id, f.last_fetched_at,
                   f.created_at, f.updated_at, u.name AS owner_name
            FROM feeds f
            JOIN users u ON u.id = f.user_id
            ORDER BY f.created_at ASC, f.id ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(FeedWithOwner::from).collect())
    }

    /// Get the feed most in need of a refresh.
    ///
    /// Never-fetched feeds come first, then the oldest `last_fetched_at`.
    /// Ties are broken by creation time and then ID, so repeated calls
    /// without intervening writes return the same feed.
    pub async fn next_to_fetch(&self) -> Result<Option<Feed>> {
        let query = format!(
            r#"
            SELECT {FEED_COLUMNS}
            FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST, created_at ASC, id ASC
            LIMIT 1
            "#
        );
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Feed::from))
    }

    /// Record a fetch of the feed at `at`.
    ///
    /// `last_fetched_at` only moves forward: an `at` older than the stored
    /// value leaves it unchanged.
    pub async fn mark_fetched(&self, id: &Uuid, at: DateTime<Utc>) -> Result<Feed> {
        let at = to_db_timestamp(&at);
        let now = to_db_timestamp(&Utc::now());
        let result = sqlx::query(
            r#"
            UPDATE feeds
            SET last_fetched_at = CASE
                    WHEN last_fetched_at IS NULL OR last_fetched_at < ?1 THEN ?1
                    ELSE last_fetched_at
                END,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(&at)
        .bind(&now)
        .bind(id.to_string())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(GatorError::NotFound("feed".into()));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| GatorError::NotFound("feed".into()))
    }
}

/// Repository for follow operations.
pub struct FeedFollowRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FeedFollowRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Follow a feed. Following twice is a [`GatorError::UniqueViolation`].
    pub async fn create(&self, user_id: &Uuid, feed_id: &Uuid) -> Result<FeedFollow> {
        let id = Uuid::new_v4();
        insert_follow(&mut *self.pool.acquire().await?, &id, user_id, feed_id).await?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| GatorError::NotFound("feed follow".into()))
    }

    /// Get a follow by ID, with feed and user names.
    pub async fn get_by_id(&self, id: &Uuid) -> Result<Option<FeedFollow>> {
        let row = sqlx::query_as::<_, FeedFollowRow>(
            r#"
            SELECT ff.id, ff.user_id, ff.feed_id, f.name AS feed_name, u.name AS user_name,
                   ff.created_at, ff.updated_at
            FROM feed_follows ff
            JOIN feeds f ON f.id = ff.feed_id
            JOIN users u ON u.id = ff.user_id
            WHERE ff.id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(FeedFollow::from))
    }

    /// Unfollow a feed. Returns true if a follow was removed.
    pub async fn delete(&self, user_id: &Uuid, feed_id: &Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = ? AND feed_id = ?")
            .bind(user_id.to_string())
            .bind(feed_id.to_string())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List a user's follows with feed and user names (oldest first).
    pub async fn list_for_user(&self, user_id: &Uuid) -> Result<Vec<FeedFollow>> {
        let rows = sqlx::query_as::<_, FeedFollowRow>(
            r#"
            SELECT ff.id, ff.user_id, ff.feed_id, f.name AS feed_name, u.name AS user_name,
                   ff.created_at, ff.updated_at
            FROM feed_follows ff
            JOIN feeds f ON f.id = ff.feed_id
            JOIN users u ON u.id = ff.user_id
            WHERE ff.user_id = ?
            ORDER BY ff.created_at ASC, f.name ASC
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(FeedFollow::from).collect())
    }
}

/// Repository for post operations.
pub struct PostRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PostRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a post.
    ///
    /// A URL that is already stored surfaces as
    /// [`GatorError::UniqueViolation`]; nothing is written.
    pub async fn create(&self, post: &NewPost) -> Result<Post> {
        let now = to_db_timestamp(&Utc::now());
        sqlx::query(
            r#"
            INSERT INTO posts (id, title, url, description, published_at, feed_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(post.id.to_string())
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(to_db_timestamp(&post.published_at))
        .bind(post.feed_id.to_string())
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        self.get_by_id(&post.id)
            .await?
            .ok_or_else(|| GatorError::NotFound("post".into()))
    }

    /// Get a post by ID.
    pub async fn get_by_id(&self, id: &Uuid) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, title, url, description, published_at, feed_id, created_at, updated_at
            FROM posts
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Post::from))
    }

    /// List posts from the feeds a user follows, newest first.
    pub async fn list_for_user(&self, user_id: &Uuid, limit: i64, offset: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT p.id, p.title, p.url, p.description, p.published_at, p.feed_id,
                   p.created_at, p.updated_at
            FROM posts p
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = ?
            ORDER BY p.published_at DESC, p.id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }
}
