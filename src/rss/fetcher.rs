//! RSS feed fetcher.
//!
//! Retrieves one RSS 2.0 document over HTTP and parses it into a
//! [`FeedDocument`]. There is no in-process retry: the scheduler's next tick
//! is the retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::HttpConfig;
use crate::error::{GatorError, Result};
use crate::rss::types::{Channel, FeedDocument, FeedItem, MAX_FEED_SIZE};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Longest entity reference, including the leading `&`.
const MAX_ENTITY_LEN: usize = 10;

/// Something that can turn a feed URL into a parsed document.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and parse the feed at `url`.
    async fn fetch(&self, url: &str) -> Result<FeedDocument>;
}

/// HTTP feed fetcher.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    /// Create a fetcher from the HTTP settings.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| GatorError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Fetch and parse a feed from the given URL.
    ///
    /// Network failures, non-2xx statuses and oversized bodies are
    /// [`GatorError::Transport`]; malformed XML is [`GatorError::Parse`].
    pub async fn fetch(&self, url: &str) -> Result<FeedDocument> {
        debug!("Fetching feed {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatorError::Transport(format!("failed to fetch feed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatorError::Transport(format!("HTTP error: {}", status)));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > MAX_FEED_SIZE {
                return Err(GatorError::Transport(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    content_length, MAX_FEED_SIZE
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatorError::Transport(format!("failed to read response: {}", e)))?;

        if bytes.len() as u64 > MAX_FEED_SIZE {
            return Err(GatorError::Transport(format!(
                "feed too large: {} bytes (max {} bytes)",
                bytes.len(),
                MAX_FEED_SIZE
            )));
        }

        parse_feed(&bytes)
    }
}

#[async_trait]
impl FeedSource for FeedFetcher {
    async fn fetch(&self, url: &str) -> Result<FeedDocument> {
        FeedFetcher::fetch(self, url).await
    }
}

/// Parse RSS 2.0 bytes into a [`FeedDocument`].
///
/// Item order is preserved. Missing text fields become empty strings and
/// `pubDate` is kept raw.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedDocument> {
    let channel = ::rss::Channel::read_from(bytes)
        .map_err(|e| GatorError::Parse(format!("failed to parse feed: {}", e)))?;

    let items = channel
        .items()
        .iter()
        .map(|item| FeedItem {
            title: unescape_html(item.title().unwrap_or_default()),
            link: item.link().unwrap_or_default().trim().to_string(),
            description: unescape_html(item.description().unwrap_or_default()),
            pub_date: item.pub_date().unwrap_or_default().to_string(),
        })
        .collect();

    Ok(FeedDocument {
        channel: Channel {
            title: unescape_html(channel.title()),
            link: channel.link().trim().to_string(),
            description: unescape_html(channel.description()),
        },
        items,
    })
}

/// Decode HTML entities left over after XML parsing.
///
/// Many feeds escape their markup twice, so `&amp;amp;` arrives here as
/// `&amp;`. Unknown entities are kept verbatim.
fn unescape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        result.push_str(&rest[..start]);
        let tail = &rest[start..];

        let decoded = entity_end(tail)
            .filter(|&end| end > 1)
            .and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                result.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                result.push('&');
                rest = &tail[1..];
            }
        }
    }
    result.push_str(rest);

    result
}

/// Position of the `;` closing the entity at the start of `tail`, looking
/// no further than [`MAX_ENTITY_LEN`] bytes.
fn entity_end(tail: &str) -> Option<usize> {
    tail.bytes()
        .take(MAX_ENTITY_LEN + 1)
        .position(|b| b == b';')
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => parse_numeric_entity(entity).and_then(char::from_u32),
    }
}

/// Parse a numeric HTML entity (e.g., "#123" or "#x7B").
fn parse_numeric_entity(entity: &str) -> Option<u32> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse().ok()
    } else {
        None
    }
}
