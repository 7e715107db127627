//! News sources served by the feed backend

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BubblaError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NewsSource {
    Bubbla,
    Cornucopia,
}

impl NewsSource {
    pub const ALL: [NewsSource; 2] = [NewsSource::Bubbla, NewsSource::Cornucopia];

    /// Identifier used in feed queries and topic names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bubbla => "bubbla",
            Self::Cornucopia => "cornucopia",
        }
    }

    /// Builds the feed URL for this source under `base_url`
    pub fn feed_url(&self, base_url: &str) -> Result<url::Url, BubblaError> {
        let mut url = url::Url::parse(base_url)
            .map_err(|e| BubblaError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        url.query_pairs_mut().append_pair("source", self.as_str());
        Ok(url)
    }
}

impl fmt::Display for NewsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NewsSource {
    type Err = BubblaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bubbla" => Ok(Self::Bubbla),
            "cornucopia" => Ok(Self::Cornucopia),
            other => Err(BubblaError::InvalidConfig(format!(
                "unknown news source: {}",
                other
            ))),
        }
    }
}
