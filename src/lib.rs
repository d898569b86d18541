//! Gator - command-line RSS blog aggregator
//!
//! Users register, follow RSS feeds, and a background scheduler polls the
//! feeds and stores new posts, de-duplicated by URL.

pub mod command;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod logging;
pub mod rss;
pub mod session;
pub mod store;

pub use command::{logged_in, Command, CommandRegistry, Handler, State};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{GatorError, Result};
pub use crate::rss::{
    Feed, FeedDocument, FeedFetcher, FeedFollow, FeedItem, FeedSource, IngestionEngine, NewFeed,
    NewPost, Post, Scheduler, SchedulerHandle, TickReport,
};
pub use session::{Session, SessionState};
pub use store::{SqliteStore, Store};
