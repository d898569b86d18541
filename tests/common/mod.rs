//! Test helpers for integration tests.
//!
//! Provides an in-memory store, a call-counting store wrapper, and helpers
//! for serving RSS documents from a mock HTTP server.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gator::rss::FeedWithOwner;
use gator::{
    Command, Config, Database, Feed, FeedFollow, NewFeed, NewPost, NewUser, Post, Result, Session,
    SqliteStore, State, Store, User,
};

/// Open a fresh in-memory store.
pub async fn setup_store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::new(Database::open_in_memory().await.unwrap()))
}

/// Handler state over `store` with an anonymous, unpersisted session.
pub fn state_with(store: Arc<dyn Store>) -> State {
    State::new(store, Session::in_memory("sqlite::memory:"), Config::default())
}

/// Build a command from string slices.
pub fn cmd(name: &str, args: &[&str]) -> Command {
    Command::new(name, args.iter().copied())
}

/// Render an RSS 2.0 document from `(title, link, pub_date)` triples.
pub fn rss_document(items: &[(&str, &str, &str)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <link>http://example.com/</link>
    <description>Test description</description>
"#,
    );
    for (title, link, pub_date) in items {
        xml.push_str("    <item>\n");
        xml.push_str(&format!("      <title>{title}</title>\n"));
        xml.push_str(&format!("      <link>{link}</link>\n"));
        if !pub_date.is_empty() {
            xml.push_str(&format!("      <pubDate>{pub_date}</pubDate>\n"));
        }
        xml.push_str("    </item>\n");
    }
    xml.push_str("  </channel>\n</rss>\n");
    xml
}

/// Serve `body` as an RSS document at `route` and return its full URL.
pub async fn serve_feed(server: &MockServer, route: &str, body: String) -> String {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(body),
        )
        .mount(server)
        .await;
    format!("{}{}", server.uri(), route)
}

/// Store wrapper that counts every call before delegating.
pub struct CountingStore {
    inner: Arc<dyn Store>,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<dyn Store>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of store calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for CountingStore {
    async fn get_next_feed_to_fetch(&self) -> Result<Option<Feed>> {
        self.hit();
        self.inner.get_next_feed_to_fetch().await
    }

    async fn mark_feed_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<Feed> {
        self.hit();
        self.inner.mark_feed_fetched(feed_id, at).await
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        self.hit();
        self.inner.create_post(post).await
    }

    async fn get_user(&self, name: &str) -> Result<User> {
        self.hit();
        self.inner.get_user(name).await
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<User> {
        self.hit();
        self.inner.get_user_by_id(id).await
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        self.hit();
        self.inner.create_user(user).await
    }

    async fn get_users(&self) -> Result<Vec<User>> {
        self.hit();
        self.inner.get_users().await
    }

    async fn delete_all_users(&self) -> Result<u64> {
        self.hit();
        self.inner.delete_all_users().await
    }

    async fn create_feed(&self, feed: NewFeed) -> Result<Feed> {
        self.hit();
        self.inner.create_feed(feed).await
    }

    async fn create_feed_with_follow(&self, feed: NewFeed) -> Result<(Feed, FeedFollow)> {
        self.hit();
        self.inner.create_feed_with_follow(feed).await
    }

    async fn get_feeds(&self) -> Result<Vec<FeedWithOwner>> {
        self.hit();
        self.inner.get_feeds().await
    }

    async fn get_feed_by_url(&self, url: &str) -> Result<Feed> {
        self.hit();
        self.inner.get_feed_by_url(url).await
    }

    async fn create_follow(&self, user_id: Uuid, feed_id: Uuid) -> Result<FeedFollow> {
        self.hit();
        self.inner.create_follow(user_id, feed_id).await
    }

    async fn delete_follow(&self, user_id: Uuid, feed_id: Uuid) -> Result<bool> {
        self.hit();
        self.inner.delete_follow(user_id, feed_id).await
    }

    async fn get_follows_for_user(&self, user_id: Uuid) -> Result<Vec<FeedFollow>> {
        self.hit();
        self.inner.get_follows_for_user(user_id).await
    }

    async fn get_posts_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        self.hit();
        self.inner.get_posts_for_user(user_id, limit, offset).await
    }
}
