//! Push-notification topics
//!
//! A topic wraps the provider-assigned ARN, e.g.
//! `arn:aws:sns:eu-central-1:312328711982:bubbla_afrika`. The resource
//! segment after the last `:` carries `<newsSource>_<name>`.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Topic {
    topic_arn: String,
}

impl Topic {
    pub fn new(topic_arn: impl Into<String>) -> Self {
        Self {
            topic_arn: topic_arn.into(),
        }
    }

    pub fn topic_arn(&self) -> &str {
        &self.topic_arn
    }

    /// `(news_source, name)` when the resource segment is `<source>_<name>`
    fn parts(&self) -> Option<(&str, &str)> {
        let resource = self.topic_arn.rsplit(':').next()?;
        let (source, name) = resource.rsplit_once('_')?;
        if source.is_empty() || name.is_empty() {
            return None;
        }
        Some((source, name))
    }

    /// Topic name, or the raw ARN when it has no `<source>_<name>` segment
    pub fn name(&self) -> &str {
        self.parts().map(|(_, name)| name).unwrap_or(&self.topic_arn)
    }

    /// News source the topic belongs to, or the raw ARN when unrecognized
    pub fn news_source(&self) -> &str {
        self.parts()
            .map(|(source, _)| source)
            .unwrap_or(&self.topic_arn)
    }

    /// Whether the ARN carries a recognizable `<source>_<name>` segment
    pub fn is_recognized(&self) -> bool {
        self.parts().is_some()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.topic_arn)
    }
}

impl From<&str> for Topic {
    fn from(topic_arn: &str) -> Self {
        Self::new(topic_arn)
    }
}

impl From<String> for Topic {
    fn from(topic_arn: String) -> Self {
        Self::new(topic_arn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_parts() {
        let topic = Topic::new("arn:aws:sns:eu-central-1:312328711982:bubbla_afrika");
        assert_eq!(topic.name(), "afrika");
        assert_eq!(topic.news_source(), "bubbla");
        assert!(topic.is_recognized());
    }

    #[test]
    fn test_unrecognized_topic_passes_through() {
        let raw = "arn:aws:sns:eu-central-1:312328711982:ehm";
        let topic = Topic::new(raw);
        assert_eq!(topic.name(), raw);
        assert_eq!(topic.news_source(), raw);
        assert!(!topic.is_recognized());
    }

    #[test]
    fn test_last_underscore_wins() {
        let topic = Topic::new("arn:aws:sns:eu-central-1:1:bubbla_latin_amerika");
        assert_eq!(topic.name(), "amerika");
        assert_eq!(topic.news_source(), "bubbla_latin");
    }

    #[test]
    fn test_equality_on_arn() {
        assert_eq!(Topic::from("a:b_c"), Topic::new("a:b_c".to_string()));
        assert_ne!(Topic::from("a:b_c"), Topic::from("a:b_d"));
    }
}
