//! Push-notification collaborators
//!
//! The reconciler talks to the remote service through `NotificationService`
//! and records desired and actual state through `TopicPreferences`. Each
//! has a network- or file-backed implementation and an in-memory one.

pub mod memory;
pub mod preferences;
pub mod sns;

use async_trait::async_trait;

use crate::error::Result;
use crate::schemas::Topic;

/// Remote topic/endpoint operations
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// All topics the device may subscribe to
    async fn list_topics(&self) -> Result<Vec<Topic>>;

    /// Registers a device token and returns its endpoint ARN
    async fn create_endpoint(&self, device_token: &str) -> Result<String>;

    /// Subscribes an endpoint to a topic and returns the subscription ARN
    async fn subscribe(&self, endpoint_arn: &str, topic: &Topic) -> Result<String>;

    /// Removes a subscription; `Ok(false)` means the service declined
    async fn unsubscribe(&self, subscription_arn: &str) -> Result<bool>;
}

/// Lowercase hex form of a raw APNs device token
pub fn device_token_hex(token: &[u8]) -> String {
    token.iter().map(|b| format!("{:02x}", b)).collect()
}

pub use memory::InMemoryNotificationService;
pub use preferences::{FileTopicPreferences, InMemoryTopicPreferences, TopicPreferences};
pub use sns::SnsNotificationService;
