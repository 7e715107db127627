//! In-memory notification service
//!
//! Used for dry runs and tests. Records every call and can be told to fail
//! specific operations.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use super::NotificationService;
use crate::error::{BubblaError, Result};
use crate::schemas::Topic;

/// A call received by the fake, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationCall {
    ListTopics,
    CreateEndpoint(String),
    Subscribe { endpoint_arn: String, topic_arn: String },
    Unsubscribe(String),
}

#[derive(Debug, Default)]
pub struct InMemoryNotificationService {
    topics: Vec<Topic>,
    calls: Mutex<Vec<NotificationCall>>,
    next_id: AtomicU64,
    fail_list_topics: bool,
    fail_create_endpoint: bool,
    failing_topics: HashSet<String>,
    failing_subscriptions: HashSet<String>,
}

impl InMemoryNotificationService {
    pub fn new(topics: Vec<Topic>) -> Self {
        Self {
            topics,
            ..Default::default()
        }
    }

    pub fn with_topic_arns<I, S>(topic_arns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(topic_arns.into_iter().map(Topic::new).collect())
    }

    pub fn failing_list_topics(mut self) -> Self {
        self.fail_list_topics = true;
        self
    }

    pub fn failing_create_endpoint(mut self) -> Self {
        self.fail_create_endpoint = true;
        self
    }

    /// Subscribing to this topic will fail
    pub fn failing_subscribe_to(mut self, topic_arn: impl Into<String>) -> Self {
        self.failing_topics.insert(topic_arn.into());
        self
    }

    /// Unsubscribing this subscription will fail
    pub fn failing_unsubscribe(mut self, subscription_arn: impl Into<String>) -> Self {
        self.failing_subscriptions.insert(subscription_arn.into());
        self
    }

    pub fn calls(&self) -> Vec<NotificationCall> {
        self.calls.lock().clone()
    }

    pub fn subscribe_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                NotificationCall::Subscribe { topic_arn, .. } => Some(topic_arn.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn unsubscribe_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                NotificationCall::Unsubscribe(arn) => Some(arn.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: NotificationCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl NotificationService for InMemoryNotificationService {
    async fn list_topics(&self) -> Result<Vec<Topic>> {
        self.record(NotificationCall::ListTopics);
        if self.fail_list_topics {
            return Err(BubblaError::notification("list_topics", "service unavailable"));
        }
        Ok(self.topics.clone())
    }

    async fn create_endpoint(&self, device_token: &str) -> Result<String> {
        self.record(NotificationCall::CreateEndpoint(device_token.to_string()));
        if self.fail_create_endpoint {
            return Err(BubblaError::notification("create_endpoint", "invalid token"));
        }
        Ok(format!("endpoint/{}", device_token))
    }

    async fn subscribe(&self, endpoint_arn: &str, topic: &Topic) -> Result<String> {
        self.record(NotificationCall::Subscribe {
            endpoint_arn: endpoint_arn.to_string(),
            topic_arn: topic.topic_arn().to_string(),
        });
        if self.failing_topics.contains(topic.topic_arn()) {
            return Err(BubblaError::notification("subscribe", "topic rejected endpoint"));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(format!("{}:sub-{}", topic.topic_arn(), id))
    }

    async fn unsubscribe(&self, subscription_arn: &str) -> Result<bool> {
        self.record(NotificationCall::Unsubscribe(subscription_arn.to_string()));
        if self.failing_subscriptions.contains(subscription_arn) {
            return Err(BubblaError::notification("unsubscribe", "subscription not found"));
        }
        Ok(true)
    }
}
