//! Built-in command handlers.
//!
//! Each handler prints its result to stdout and returns errors to the
//! caller; `main` turns them into a message and a non-zero exit code.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::info;

use super::{Command, State};
use crate::datetime::format_utc_datetime;
use crate::db::{NewUser, User};
use crate::rss::{parse_interval, spawn_scheduler, FeedFetcher, IngestionEngine, NewFeed, Scheduler};
use crate::{GatorError, Result};

/// Posts shown by `browse` when no limit is given.
pub const DEFAULT_BROWSE_LIMIT: i64 = 2;

/// `login <name>`: switch the session to an existing user.
pub fn login<'a>(state: &'a mut State, cmd: &'a Command) -> BoxFuture<'a, Result<()>> {
    async move {
        let name = cmd.arg(0, "login <name>")?;
        let user = state.store.get_user(name).await?;
        state.session.set_user(&user.name)?;
        println!("Logged in as {}", user.name);
        Ok(())
    }
    .boxed()
}

/// `register <name>`: create a user and log in as them.
pub fn register<'a>(state: &'a mut State, cmd: &'a Command) -> BoxFuture<'a, Result<()>> {
    async move {
        let name = cmd.arg(0, "register <name>")?;
        let user = match state.store.create_user(NewUser::new(name)).await {
            Ok(user) => user,
            Err(e) if e.is_unique_violation() => {
                return Err(GatorError::UniqueViolation(format!("user {name:?}")));
            }
            Err(e) => return Err(e),
        };
        state.session.set_user(&user.name)?;

        info!("Registered user {} ({})", user.name, user.id);
        println!("User {} created", user.name);
        print_user(&user);
        Ok(())
    }
    .boxed()
}

/// `reset`: delete every user and, by cascade, everything else.
pub fn reset<'a>(state: &'a mut State, _cmd: &'a Command) -> BoxFuture<'a, Result<()>> {
    async move {
        let removed = state.store.delete_all_users().await?;
        info!("Reset removed {} user(s)", removed);
        println!("Database reset: {} user(s) removed", removed);
        Ok(())
    }
    .boxed()
}

/// `users`: list users, marking the logged-in one.
pub fn users<'a>(state: &'a mut State, _cmd: &'a Command) -> BoxFuture<'a, Result<()>> {
    async move {
        let users = state.store.get_users().await?;
        let current = state.session.current_user();
        for user in &users {
            if Some(user.name.as_str()) == current {
                println!("* {} (current)", user.name);
            } else {
                println!("* {}", user.name);
            }
        }
        Ok(())
    }
    .boxed()
}

/// `agg <interval>`: collect feeds on a fixed cadence until Ctrl-C.
pub fn agg<'a>(state: &'a mut State, cmd: &'a Command) -> BoxFuture<'a, Result<()>> {
    async move {
        let raw = cmd.arg(0, "agg <time_between_reqs>")?;
        let interval = parse_interval(raw)?;

        let fetcher = Arc::new(FeedFetcher::new(&state.config.http)?);
        let engine = IngestionEngine::new(Arc::clone(&state.store), fetcher);

        println!("Collecting feeds every {}", raw);
        let handle = spawn_scheduler(Scheduler::new(engine, interval)?);

        let signal = tokio::signal::ctrl_c().await;
        info!("Stopping feed collection");
        handle.stop().await;
        signal?;
        Ok(())
    }
    .boxed()
}

/// `addfeed <name> <url>`: register a feed and follow it.
pub fn addfeed<'a>(
    state: &'a mut State,
    cmd: &'a Command,
    user: User,
) -> BoxFuture<'a, Result<()>> {
    async move {
        const USAGE: &str = "addfeed <name> <url>";
        let name = cmd.arg(0, USAGE)?;
        let url = cmd.arg(1, USAGE)?;

        let new_feed = NewFeed::new(name, url, user.id);
        let (feed, follow) = match state.store.create_feed_with_follow(new_feed).await {
            Ok(created) => created,
            Err(e) if e.is_unique_violation() => {
                return Err(GatorError::UniqueViolation(format!("feed {url:?}")));
            }
            Err(e) => return Err(e),
        };

        info!("User {} added feed {} ({})", user.name, feed.name, feed.url);
        println!("Feed created:");
        println!("  ID:    {}", feed.id);
        println!("  Name:  {}", feed.name);
        println!("  URL:   {}", feed.url);
        println!("{} now follows {}", follow.user_name, follow.feed_name);
        Ok(())
    }
    .boxed()
}

/// `feeds`: list every feed with its owner.
pub fn feeds<'a>(state: &'a mut State, _cmd: &'a Command) -> BoxFuture<'a, Result<()>> {
    async move {
        let feeds = state.store.get_feeds().await?;
        if feeds.is_empty() {
            println!("No feeds registered.");
        }
        for entry in &feeds {
            println!("* {}", entry.feed.name);
            println!("  URL:   {}", entry.feed.url);
            println!("  Owner: {}", entry.owner_name);
        }
        Ok(())
    }
    .boxed()
}

/// `follow <url>`: follow an existing feed.
pub fn follow<'a>(state: &'a mut State, cmd: &'a Command, user: User) -> BoxFuture<'a, Result<()>> {
    async move {
        let url = cmd.arg(0, "follow <url>")?;
        let feed = state.store.get_feed_by_url(url).await?;
        let follow = match state.store.create_follow(user.id, feed.id).await {
            Ok(follow) => follow,
            Err(e) if e.is_unique_violation() => {
                return Err(GatorError::UniqueViolation(format!(
                    "follow of {:?} by {}",
                    feed.name, user.name
                )));
            }
            Err(e) => return Err(e),
        };

        println!("{} now follows {}", follow.user_name, follow.feed_name);
        Ok(())
    }
    .boxed()
}

/// `following`: list the feeds the user follows.
pub fn following<'a>(
    state: &'a mut State,
    _cmd: &'a Command,
    user: User,
) -> BoxFuture<'a, Result<()>> {
    async move {
        let follows = state.store.get_follows_for_user(user.id).await?;
        if follows.is_empty() {
            println!("{} is not following any feeds.", user.name);
        }
        for follow in &follows {
            println!("* {}", follow.feed_name);
        }
        Ok(())
    }
    .boxed()
}

/// `unfollow <url>`: stop following a feed.
pub fn unfollow<'a>(
    state: &'a mut State,
    cmd: &'a Command,
    user: User,
) -> BoxFuture<'a, Result<()>> {
    async move {
        let url = cmd.arg(0, "unfollow <url>")?;
        let feed = state.store.get_feed_by_url(url).await?;
        if !state.store.delete_follow(user.id, feed.id).await? {
            return Err(GatorError::NotFound(format!(
                "follow of {:?} by {}",
                feed.name, user.name
            )));
        }

        println!("{} unfollowed {}", user.name, feed.name);
        Ok(())
    }
    .boxed()
}

/// `browse [limit] [page]`: newest posts from followed feeds.
pub fn browse<'a>(state: &'a mut State, cmd: &'a Command, user: User) -> BoxFuture<'a, Result<()>> {
    async move {
        let (limit, offset) = browse_window(cmd)?;
        let posts = state
            .store
            .get_posts_for_user(user.id, limit, offset)
            .await?;

        if posts.is_empty() {
            println!("No posts found.");
        }
        let display = &state.config.display;
        for post in &posts {
            let date = format_utc_datetime(&post.published_at, &display.timezone, &display.date_format);
            println!("{}  {}", date, post.title);
            println!("    {}", post.url);
            if !post.description.is_empty() {
                println!("    {}", post.description);
            }
        }
        Ok(())
    }
    .boxed()
}

/// Resolve `[limit] [page]` into a SQL limit and offset.
///
/// Page numbers start at 1.
pub fn browse_window(cmd: &Command) -> Result<(i64, i64)> {
    let limit = positive_arg(cmd, 0)?.unwrap_or(DEFAULT_BROWSE_LIMIT);
    let page = positive_arg(cmd, 1)?.unwrap_or(1);
    let offset = (page - 1)
        .checked_mul(limit)
        .ok_or_else(|| GatorError::Usage("browse [limit] [page]: page out of range".to_string()))?;
    Ok((limit, offset))
}

fn positive_arg(cmd: &Command, index: usize) -> Result<Option<i64>> {
    match cmd.args.get(index) {
        None => Ok(None),
        Some(raw) => match raw.parse::<i64>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(GatorError::Usage(format!(
                "browse [limit] [page]: expected a positive number, got {raw:?}"
            ))),
        },
    }
}

fn print_user(user: &User) {
    println!("  ID:      {}", user.id);
    println!("  Name:    {}", user.name);
    println!("  Created: {}", user.created_at.to_rfc3339());
}
