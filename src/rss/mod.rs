//! RSS aggregation for Gator.
//!
//! This module provides feed fetching, ingestion of feed items into posts,
//! the background scheduler, and the feed/follow/post repositories.

pub mod fetcher;
pub mod ingest;
pub mod repository;
pub mod scheduler;
pub mod types;

pub use fetcher::{parse_feed, FeedFetcher, FeedSource};
pub use ingest::{IngestionEngine, TickReport};
pub use repository::{FeedFollowRepository, FeedRepository, PostRepository};
pub use scheduler::{parse_interval, spawn_scheduler, Scheduler, SchedulerHandle};
pub use types::{
    Channel, Feed, FeedDocument, FeedFollow, FeedItem, FeedWithOwner, NewFeed, NewPost, Post,
    MAX_FEED_SIZE,
};
