//! Feed ingestion for Gator.
//!
//! One call to [`IngestionEngine::run_once`] is one tick: pick the feed most
//! in need of a refresh, mark it fetched, fetch it and store its new posts.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::datetime::resolve_published_at;
use crate::error::Result;
use crate::rss::fetcher::FeedSource;
use crate::rss::types::NewPost;
use crate::store::Store;

/// Outcome of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickReport {
    /// No feeds are registered.
    Idle,
    /// A feed was fetched and its items processed.
    Ingested {
        /// Feed that was fetched.
        feed_id: Uuid,
        /// Feed name, for logging.
        feed_name: String,
        /// Posts newly stored.
        created: usize,
        /// Items skipped because their URL was already stored.
        duplicates: usize,
        /// Items that failed to store for any other reason.
        failed: usize,
    },
}

/// Fetches feeds and turns their items into posts.
#[derive(Clone)]
pub struct IngestionEngine {
    store: Arc<dyn Store>,
    fetcher: Arc<dyn FeedSource>,
}

impl IngestionEngine {
    /// Create an engine over the given store and feed source.
    pub fn new(store: Arc<dyn Store>, fetcher: Arc<dyn FeedSource>) -> Self {
        Self { store, fetcher }
    }

    /// Run a single tick.
    ///
    /// The feed is marked fetched before the request goes out, so a fetch
    /// that fails (or is cancelled) still rotates the feed to the back of
    /// the queue. Per-item store errors never abort the tick.
    pub async fn run_once(&self) -> Result<TickReport> {
        let feed = match self.store.get_next_feed_to_fetch().await? {
            Some(feed) => feed,
            None => {
                debug!("No feeds to fetch");
                return Ok(TickReport::Idle);
            }
        };

        self.store.mark_feed_fetched(feed.id, Utc::now()).await?;

        info!("Fetching feed {} ({})", feed.name, feed.url);
        let document = self.fetcher.fetch(&feed.url).await?;

        let mut created = 0;
        let mut duplicates = 0;
        let mut failed = 0;

        for item in document.items {
            let published_at = resolve_published_at(&item.pub_date, Utc::now());
            let post = NewPost::new(feed.id, item.title, item.link)
                .with_description(item.description)
                .with_published_at(published_at);
            let url = post.url.clone();

            match self.store.create_post(post).await {
                Ok(_) => created += 1,
                Err(e) if e.is_unique_violation() => {
                    debug!("Skipping known post {}", url);
                    duplicates += 1;
                }
                Err(e) => {
                    warn!("Failed to store post {} from feed {}: {}", url, feed.name, e);
                    failed += 1;
                }
            }
        }

        if created > 0 {
            info!("Feed {} updated: {} new post(s)", feed.name, created);
        } else {
            debug!("Feed {} updated: no new posts", feed.name);
        }

        Ok(TickReport::Ingested {
            feed_id: feed.id,
            feed_name: feed.name,
            created,
            duplicates,
            failed,
        })
    }
}
