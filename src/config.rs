//! Configuration for the news core

use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{BubblaError, Result};
use crate::schemas::NewsSource;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Feed
    #[serde(default = "default_news_source")]
    pub news_source: String,
    #[serde(default = "default_feed_base_url")]
    pub feed_base_url: String,

    // HTTP transport
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,

    // Push notifications
    pub sns_platform_application_arn: Option<String>,
    pub aws_region: Option<String>,

    // Topic preferences
    #[serde(default = "default_preferences_path")]
    pub preferences_path: PathBuf,
}

fn default_news_source() -> String {
    "bubbla".to_string()
}

fn default_feed_base_url() -> String {
    "https://bubb.la/api/v2/news".to_string()
}

fn default_max_concurrent_requests() -> usize {
    10
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_preferences_path() -> PathBuf {
    PathBuf::from("./data/topic_preferences.json")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            news_source: default_news_source(),
            feed_base_url: default_feed_base_url(),
            max_concurrent_requests: default_max_concurrent_requests(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            max_retries: 0,
            sns_platform_application_arn: None,
            aws_region: None,
            preferences_path: default_preferences_path(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        self.news_source()?;
        let url = url::Url::parse(&self.feed_base_url)
            .map_err(|e| BubblaError::InvalidUrl(format!("{}: {}", self.feed_base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BubblaError::InvalidConfig(format!(
                "feed_base_url must be http(s), got {}",
                url.scheme()
            )));
        }
        if self.max_concurrent_requests == 0 {
            return Err(BubblaError::InvalidConfig(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn news_source(&self) -> Result<NewsSource> {
        self.news_source.parse()
    }

    /// Checks if the SNS notification service is configured
    pub fn has_sns(&self) -> bool {
        self.sns_platform_application_arn.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.news_source().unwrap(), NewsSource::Bubbla);
        assert_eq!(config.max_concurrent_requests, 10);
        assert_eq!(config.max_retries, 0);
        assert!(!config.has_sns());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            news_source: "reuters".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            feed_base_url: "ftp://bubb.la/news".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
