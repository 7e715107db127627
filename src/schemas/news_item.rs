//! NewsItem Schema
//!
//! A single article from the news feed, plus the wire record it is decoded from.
//! Field names of `FeedRecord` are fixed by the feed provider.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::hash::{Hash, Hasher};
use url::Url;
use validator::Validate;

use crate::error::BubblaError;
use crate::searchable_list::Searchable;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub title: String,
    pub url: Url,
    pub publication_date: DateTime<Utc>,
    pub category: String,
    /// Unique within one feed snapshot
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook_url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soundcloud_url: Option<Url>,
    /// Host of `url` without a leading "www."
    pub domain: String,
    #[serde(default)]
    pub is_read: bool,
}

impl NewsItem {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        title: String,
        url: Url,
        publication_date: DateTime<Utc>,
        category: String,
        id: String,
        image_url: Option<Url>,
        facebook_url: Option<Url>,
        twitter_url: Option<Url>,
        soundcloud_url: Option<Url>,
    ) -> Self {
        let domain = domain_of(&url);
        Self {
            title,
            url,
            publication_date,
            category,
            id,
            image_url,
            facebook_url,
            twitter_url,
            soundcloud_url,
            domain,
            is_read: false,
        }
    }

    pub fn mark_read(&mut self) {
        self.is_read = true;
    }

    pub fn mark_unread(&mut self) {
        self.is_read = false;
    }
}

/// Items are identified by their feed id alone
impl PartialEq for NewsItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NewsItem {}

impl Hash for NewsItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Searchable for NewsItem {
    fn text_to_be_searched(&self) -> Cow<'_, str> {
        Cow::Owned(format!("{} {} {}", self.title, self.category, self.domain))
    }
}

/// Host component of `url`, stripped of a leading "www."
pub fn domain_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

/// Publication date as sent by the feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawDate {
    Unix(i64),
    Text(String),
}

impl RawDate {
    pub fn parse(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Unix(secs) => Utc.timestamp_opt(*secs, 0).single(),
            Self::Text(text) => {
                let text = text.trim();
                if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                    return Some(dt.with_timezone(&Utc));
                }
                NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|naive| naive.and_utc())
            }
        }
    }
}

/// One record of the feed payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FeedRecord {
    #[validate(required, length(min = 1))]
    pub title: Option<String>,
    #[validate(required, url)]
    pub url: Option<String>,
    #[validate(required)]
    pub publication_date: Option<RawDate>,
    #[validate(required, length(min = 1))]
    pub category: Option<String>,
    #[validate(required, length(min = 1))]
    pub id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub facebook_url: Option<String>,
    #[serde(default)]
    pub twitter_url: Option<String>,
    #[serde(default)]
    pub soundcloud_url: Option<String>,
}

/// Empty, missing or unparsable optional links become `None`
fn optional_url(value: Option<String>) -> Option<Url> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .and_then(|s| Url::parse(&s).ok())
}

impl TryFrom<FeedRecord> for NewsItem {
    type Error = BubblaError;

    fn try_from(record: FeedRecord) -> Result<Self, Self::Error> {
        record
            .validate()
            .map_err(|e| BubblaError::DecodeError(e.to_string()))?;

        let missing = |field: &str| BubblaError::DecodeError(format!("missing field {}", field));

        let raw_url = record.url.ok_or_else(|| missing("url"))?;
        let url = Url::parse(raw_url.trim())
            .map_err(|e| BubblaError::DecodeError(format!("url {}: {}", raw_url, e)))?;
        let publication_date = record
            .publication_date
            .as_ref()
            .and_then(RawDate::parse)
            .ok_or_else(|| missing("publicationDate"))?;

        Ok(NewsItem::new(
            record.title.ok_or_else(|| missing("title"))?,
            url,
            publication_date,
            record.category.ok_or_else(|| missing("category"))?,
            record.id.ok_or_else(|| missing("id"))?,
            optional_url(record.image_url),
            optional_url(record.facebook_url),
            optional_url(record.twitter_url),
            optional_url(record.soundcloud_url),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str) -> NewsItem {
        NewsItem::new(
            String::new(),
            Url::parse(url).unwrap(),
            Utc::now(),
            "Världen".to_string(),
            "0".to_string(),
            None,
            None,
            None,
            None,
        )
    }

    #[test]
    fn test_read_toggle_and_domain() {
        let mut news = item("http://google.com");
        assert!(!news.is_read);
        news.mark_read();
        assert!(news.is_read);
        news.mark_unread();
        assert!(!news.is_read);
        assert_eq!(news.domain, "google.com");
    }

    #[test]
    fn test_domain_strips_www_only() {
        assert_eq!(item("https://www.expressen.se/nyheter/").domain, "expressen.se");
        assert_eq!(item("https://news.bbc.co.uk/a").domain, "news.bbc.co.uk");
    }

    #[test]
    fn test_equality_keys_on_id() {
        let a = item("https://a.se/1");
        let mut b = item("https://b.se/2");
        assert_eq!(a, b);
        b.id = "1".to_string();
        assert_ne!(a, b);
    }

    #[test]
    fn test_record_conversion() {
        let json = r#"{
            "title": "Bråk i riksdagen",
            "url": "https://www.svt.se/nyheter/inrikes/1",
            "publicationDate": "2018-05-02 10:30:00",
            "category": "Politik",
            "id": "232347bubbla",
            "imageUrl": "",
            "twitterUrl": "https://twitter.com/bubbla/status/1"
        }"#;
        let record: FeedRecord = serde_json::from_str(json).unwrap();
        let news = NewsItem::try_from(record).unwrap();
        assert_eq!(news.title, "Bråk i riksdagen");
        assert_eq!(news.domain, "svt.se");
        assert_eq!(news.image_url, None);
        assert!(news.facebook_url.is_none());
        assert_eq!(
            news.twitter_url.unwrap().as_str(),
            "https://twitter.com/bubbla/status/1"
        );
        assert_eq!(news.publication_date.to_rfc3339(), "2018-05-02T10:30:00+00:00");
    }

    #[test]
    fn test_record_missing_required_field() {
        let json = r#"{
            "title": "Utan länk",
            "publicationDate": 1525257000,
            "category": "Politik",
            "id": "1"
        }"#;
        let record: FeedRecord = serde_json::from_str(json).unwrap();
        assert!(NewsItem::try_from(record).is_err());
    }

    #[test]
    fn test_record_empty_title_rejected() {
        let json = r#"{
            "title": "",
            "url": "https://a.se",
            "publicationDate": "2018-05-02T10:30:00Z",
            "category": "Politik",
            "id": "1"
        }"#;
        let record: FeedRecord = serde_json::from_str(json).unwrap();
        assert!(NewsItem::try_from(record).is_err());
    }

    #[test]
    fn test_raw_date_formats() {
        assert!(RawDate::Unix(1525257000).parse().is_some());
        assert!(RawDate::Text("2018-05-02T10:30:00+02:00".into()).parse().is_some());
        assert!(RawDate::Text("igår".into()).parse().is_none());
    }
}
