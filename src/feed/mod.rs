//! News feed access
//!
//! Fetches the raw feed through the injected `UrlFetcher` and decodes it
//! into `NewsItem`s. Malformed records are dropped one by one; only a
//! payload that is not a record list at all fails the fetch.

pub mod categories;

use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{BubblaError, Result};
use crate::http_client::UrlFetcher;
use crate::metrics::{self, FeedTimer};
use crate::schemas::{FeedRecord, NewsItem, NewsSource};

pub use categories::*;

/// Result of decoding one payload
#[derive(Debug, Clone, Default)]
pub struct DecodedFeed {
    pub items: Vec<NewsItem>,
    /// Records dropped for failing validation or repeating an id
    pub dropped: usize,
}

/// Payload as text. Invalid UTF-8 is replaced rather than rejected.
fn payload_text(bytes: &[u8]) -> std::borrow::Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes)
}

/// Decodes a feed payload, keeping source order
pub fn decode_feed(bytes: &[u8]) -> Result<DecodedFeed> {
    let root: Value = serde_json::from_str(&payload_text(bytes))?;

    let records = match root {
        Value::Array(records) => records,
        Value::Object(mut map) => match map.remove("news") {
            Some(Value::Array(records)) => records,
            _ => {
                return Err(BubblaError::DecodeError(
                    "expected a list of news records".to_string(),
                ))
            }
        },
        _ => {
            return Err(BubblaError::DecodeError(
                "expected a list of news records".to_string(),
            ))
        }
    };

    let mut decoded = DecodedFeed::default();
    let mut ids = HashSet::new();

    for (index, record) in records.into_iter().enumerate() {
        let item = serde_json::from_value::<FeedRecord>(record)
            .map_err(BubblaError::from)
            .and_then(NewsItem::try_from);

        match item {
            Ok(item) if ids.insert(item.id.clone()) => decoded.items.push(item),
            Ok(item) => {
                debug!(index, id = %item.id, "Dropping record with repeated id");
                decoded.dropped += 1;
            }
            Err(e) => {
                debug!(index, error = %e, "Dropping malformed record");
                decoded.dropped += 1;
            }
        }
    }

    Ok(decoded)
}

/// Fetches and decodes the feed of one news source
pub struct NewsFeedService {
    url_fetcher: Arc<dyn UrlFetcher>,
    feed_base_url: String,
}

impl NewsFeedService {
    pub fn new(url_fetcher: Arc<dyn UrlFetcher>, feed_base_url: impl Into<String>) -> Self {
        Self {
            url_fetcher,
            feed_base_url: feed_base_url.into(),
        }
    }

    pub fn feed_base_url(&self) -> &str {
        &self.feed_base_url
    }

    /// Fetches all items of `source`. Transport failures are returned as is.
    #[instrument(skip_all, fields(source = %source))]
    pub async fn fetch_news(&self, source: NewsSource) -> Result<Vec<NewsItem>> {
        let _timer = FeedTimer::new(source.as_str());
        let url = source.feed_url(&self.feed_base_url)?;

        let bytes = match self.url_fetcher.fetch(&url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                metrics::record_feed_fetch(source.as_str(), false);
                return Err(e);
            }
        };

        let decoded = match decode_feed(&bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(error = %e, bytes = bytes.len(), "Feed payload could not be decoded");
                metrics::record_feed_fetch(source.as_str(), false);
                return Err(e);
            }
        };

        metrics::record_feed_fetch(source.as_str(), true);
        metrics::record_feed_records(
            source.as_str(),
            decoded.items.len() as u64,
            decoded.dropped as u64,
        );
        info!(
            items = decoded.items.len(),
            dropped = decoded.dropped,
            "Fetched news feed"
        );

        Ok(decoded.items)
    }

    /// Items of one category, or the whole feed for the latest sentinel
    pub async fn news_for_category(
        &self,
        source: NewsSource,
        category: Option<&str>,
    ) -> Result<Vec<NewsItem>> {
        let items = self.fetch_news(source).await?;
        Ok(filter_by_category(items, category))
    }
}
