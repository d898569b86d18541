//! RSS types for Gator.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Maximum feed size in bytes (5MB).
pub const MAX_FEED_SIZE: u64 = 5 * 1024 * 1024;

/// A followable RSS source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    /// Feed ID.
    pub id: Uuid,
    /// Display name chosen by the user who added it.
    pub name: String,
    /// Feed URL (unique).
    pub url: String,
    /// Owner (the user who added the feed).
    pub user_id: Uuid,
    /// Last time the feed was fetched; `None` if never.
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// When the feed was created.
    pub created_at: DateTime<Utc>,
    /// When the feed was last updated.
    pub updated_at: DateTime<Utc>,
}

/// New feed for creation.
#[derive(Debug, Clone)]
pub struct NewFeed {
    /// Pre-generated feed ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Feed URL.
    pub url: String,
    /// Owner.
    pub user_id: Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl NewFeed {
    /// Create a new feed owned by `user_id`.
    pub fn new(name: impl Into<String>, url: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            url: url.into(),
            user_id,
            created_at: Utc::now(),
        }
    }
}

/// A feed with its owner's name, for listings.
#[derive(Debug, Clone)]
pub struct FeedWithOwner {
    /// The feed.
    pub feed: Feed,
    /// Name of the owning user.
    pub owner_name: String,
}

/// A user's subscription to a feed.
#[derive(Debug, Clone)]
pub struct FeedFollow {
    /// Follow ID.
    pub id: Uuid,
    /// Following user.
    pub user_id: Uuid,
    /// Followed feed.
    pub feed_id: Uuid,
    /// Name of the followed feed.
    pub feed_name: String,
    /// Name of the following user.
    pub user_name: String,
    /// When the follow was created.
    pub created_at: DateTime<Utc>,
    /// When the follow was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A single ingested item.
#[derive(Debug, Clone)]
pub struct Post {
    /// Post ID.
    pub id: Uuid,
    /// Item title.
    pub title: String,
    /// Link to the original article (globally unique).
    pub url: String,
    /// Item description.
    pub description: String,
    /// Publish date, resolved at ingestion.
    pub published_at: DateTime<Utc>,
    /// Feed the post came from.
    pub feed_id: Uuid,
    /// When the post was stored.
    pub created_at: DateTime<Utc>,
    /// When the post was last updated.
    pub updated_at: DateTime<Utc>,
}

/// New post for creation.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Pre-generated post ID.
    pub id: Uuid,
    /// Item title.
    pub title: String,
    /// Link to the original article.
    pub url: String,
    /// Item description.
    pub description: String,
    /// Publish date.
    pub published_at: DateTime<Utc>,
    /// Feed the post belongs to.
    pub feed_id: Uuid,
}

impl NewPost {
    /// Create a new post; `published_at` defaults to now.
    pub fn new(feed_id: Uuid, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            url: url.into(),
            description: String::new(),
            published_at: Utc::now(),
            feed_id,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the published date.
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = published_at;
        self
    }
}

/// Parsed feed document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedDocument {
    /// Channel metadata.
    pub channel: Channel,
    /// Items in document order.
    pub items: Vec<FeedItem>,
}

/// Channel metadata of a feed document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Channel {
    /// Channel title.
    pub title: String,
    /// Site URL.
    pub link: String,
    /// Channel description.
    pub description: String,
}

/// One item of a feed document. Missing fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    /// Item title.
    pub title: String,
    /// Link to the original article.
    pub link: String,
    /// Item description.
    pub description: String,
    /// Raw `pubDate`, unparsed.
    pub pub_date: String,
}

impl FeedItem {
    /// Create an item with the given title and link.
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            ..Default::default()
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the raw publish date.
    pub fn with_pub_date(mut self, pub_date: impl Into<String>) -> Self {
        self.pub_date = pub_date.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_feed() {
        let owner = Uuid::new_v4();
        let feed = NewFeed::new("TechBlog", "https://example.com/rss", owner);
        assert_eq!(feed.name, "TechBlog");
        assert_eq!(feed.url, "https://example.com/rss");
        assert_eq!(feed.user_id, owner);
    }

    #[test]
    fn test_new_post_defaults() {
        let feed_id = Uuid::new_v4();
        let before = Utc::now();
        let post = NewPost::new(feed_id, "Hello", "https://example.com/1");
        assert_eq!(post.feed_id, feed_id);
        assert!(post.description.is_empty());
        assert!(post.published_at >= before);
    }

    #[test]
    fn test_new_post_with_fields() {
        let at = Utc::now() - chrono::Duration::days(3);
        let post = NewPost::new(Uuid::new_v4(), "Hello", "https://example.com/1")
            .with_description("Summary")
            .with_published_at(at);
        assert_eq!(post.description, "Summary");
        assert_eq!(post.published_at, at);
    }

    #[test]
    fn test_feed_item_builder() {
        let item = FeedItem::new("Title", "https://example.com/a")
            .with_description("Desc")
            .with_pub_date("Mon, 02 Jan 2006 15:04:05 MST");
        assert_eq!(item.title, "Title");
        assert_eq!(item.link, "https://example.com/a");
        assert_eq!(item.description, "Desc");
        assert_eq!(item.pub_date, "Mon, 02 Jan 2006 15:04:05 MST");
    }
}
