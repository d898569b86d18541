//! Persistence interface for Gator.
//!
//! The ingestion pipeline and command handlers talk to storage only through
//! [`Store`], so either side can be exercised against an in-memory database
//! or a test double.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::{Database, NewUser, User, UserRepository};
use crate::rss::{
    Feed, FeedFollow, FeedFollowRepository, FeedRepository, FeedWithOwner, NewFeed, NewPost, Post,
    PostRepository,
};
use crate::{GatorError, Result};

/// Unified storage interface.
#[async_trait]
pub trait Store: Send + Sync {
    /// The feed with the oldest `last_fetched_at`, never-fetched feeds first.
    async fn get_next_feed_to_fetch(&self) -> Result<Option<Feed>>;

    /// Advance a feed's `last_fetched_at` to `at` (never moves it back).
    async fn mark_feed_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<Feed>;

    /// Store a post. A known URL yields [`GatorError::UniqueViolation`].
    async fn create_post(&self, post: NewPost) -> Result<Post>;

    /// Look up a user by name; a missing user is [`GatorError::NotFound`].
    async fn get_user(&self, name: &str) -> Result<User>;

    /// Look up a user by ID.
    async fn get_user_by_id(&self, id: Uuid) -> Result<User>;

    /// Register a user. A taken name yields [`GatorError::UniqueViolation`].
    async fn create_user(&self, user: NewUser) -> Result<User>;

    /// All users, ordered by name.
    async fn get_users(&self) -> Result<Vec<User>>;

    /// Delete every user, cascading to feeds, follows and posts.
    async fn delete_all_users(&self) -> Result<u64>;

    /// Register a feed.
    async fn create_feed(&self, feed: NewFeed) -> Result<Feed>;

    /// Register a feed and follow it as its owner, atomically.
    async fn create_feed_with_follow(&self, feed: NewFeed) -> Result<(Feed, FeedFollow)>;

    /// All feeds with their owner's name.
    async fn get_feeds(&self) -> Result<Vec<FeedWithOwner>>;

    /// Look up a feed by URL; a missing feed is [`GatorError::NotFound`].
    async fn get_feed_by_url(&self, url: &str) -> Result<Feed>;

    /// Follow a feed.
    async fn create_follow(&self, user_id: Uuid, feed_id: Uuid) -> Result<FeedFollow>;

    /// Unfollow a feed; returns whether a follow existed.
    async fn delete_follow(&self, user_id: Uuid, feed_id: Uuid) -> Result<bool>;

    /// A user's follows with feed and user names.
    async fn get_follows_for_user(&self, user_id: Uuid) -> Result<Vec<FeedFollow>>;

    /// Posts from the feeds a user follows, newest first.
    async fn get_posts_for_user(&self, user_id: Uuid, limit: i64, offset: i64)
        -> Result<Vec<Post>>;
}

/// [`Store`] backed by SQLite.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Wrap an open database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_next_feed_to_fetch(&self) -> Result<Option<Feed>> {
        FeedRepository::new(self.db.pool()).next_to_fetch().await
    }

    async fn mark_feed_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<Feed> {
        FeedRepository::new(self.db.pool())
            .mark_fetched(&feed_id, at)
            .await
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        PostRepository::new(self.db.pool()).create(&post).await
    }

    async fn get_user(&self, name: &str) -> Result<User> {
        UserRepository::new(self.db.pool())
            .get_by_name(name)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("user {name:?}")))
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<User> {
        UserRepository::new(self.db.pool())
            .get_by_id(&id)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("user {id}")))
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        UserRepository::new(self.db.pool()).create(&user).await
    }

    async fn get_users(&self) -> Result<Vec<User>> {
        UserRepository::new(self.db.pool()).list_all().await
    }

    async fn delete_all_users(&self) -> Result<u64> {
        UserRepository::new(self.db.pool()).delete_all().await
    }

    async fn create_feed(&self, feed: NewFeed) -> Result<Feed> {
        FeedRepository::new(self.db.pool()).create(&feed).await
    }

    async fn create_feed_with_follow(&self, feed: NewFeed) -> Result<(Feed, FeedFollow)> {
        FeedRepository::new(self.db.pool())
            .create_followed(&feed)
            .await
    }

    async fn get_feeds(&self) -> Result<Vec<FeedWithOwner>> {
        FeedRepository::new(self.db.pool()).list_with_owner().await
    }

    async fn get_feed_by_url(&self, url: &str) -> Result<Feed> {
        FeedRepository::new(self.db.pool())
            .get_by_url(url)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("feed {url:?}")))
    }

    async fn create_follow(&self, user_id: Uuid, feed_id: Uuid) -> Result<FeedFollow> {
        FeedFollowRepository::new(self.db.pool())
            .create(&user_id, &feed_id)
            .await
    }

    async fn delete_follow(&self, user_id: Uuid, feed_id: Uuid) -> Result<bool> {
        FeedFollowRepository::new(self.db.pool())
            .delete(&user_id, &feed_id)
            .await
    }

    async fn get_follows_for_user(&self, user_id: Uuid) -> Result<Vec<FeedFollow>> {
        FeedFollowRepository::new(self.db.pool())
            .list_for_user(&user_id)
            .await
    }

    async fn get_posts_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        PostRepository::new(self.db.pool())
            .list_for_user(&user_id, limit, offset)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_store() -> SqliteStore {
        SqliteStore::new(Database::open_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let store = setup_store().await;
        let err = store.get_user("ghost").await.unwrap_err();
        assert!(matches!(err, GatorError::NotFound(_)));
        assert!(err.to_string().contains("ghost"));
    }

    #[tokio::test]
    async fn test_user_round_trip() {
        let store = setup_store().await;
        let created = store.create_user(NewUser::new("alice")).await.unwrap();

        assert_eq!(store.get_user("alice").await.unwrap(), created);
        assert_eq!(store.get_user_by_id(created.id).await.unwrap(), created);
        assert_eq!(store.get_users().await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn test_get_feed_by_url_not_found() {
        let store = setup_store().await;
        let err = store
            .get_feed_by_url("https://missing.example/rss")
            .await
            .unwrap_err();
        assert!(matches!(err, GatorError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_store_is_object_safe() {
        let store: std::sync::Arc<dyn Store> = std::sync::Arc::new(setup_store().await);
        assert!(store.get_next_feed_to_fetch().await.unwrap().is_none());
        assert_eq!(store.delete_all_users().await.unwrap(), 0);
    }
}
