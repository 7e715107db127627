//! Amazon SNS notification service
//!
//! Devices are registered as platform endpoints under one platform
//! application; topics are listed and filtered to the selected news source.

use async_trait::async_trait;
use aws_sdk_sns::error::DisplayErrorContext;
use aws_sdk_sns::Client as SnsClient;
use tracing::{debug, info, instrument};

use super::NotificationService;
use crate::error::{BubblaError, Result};
use crate::schemas::{NewsSource, Topic};

pub struct SnsNotificationService {
    client: SnsClient,
    platform_application_arn: String,
    news_source: NewsSource,
}

impl SnsNotificationService {
    pub fn new(
        client: SnsClient,
        platform_application_arn: impl Into<String>,
        news_source: NewsSource,
    ) -> Self {
        Self {
            client,
            platform_application_arn: platform_application_arn.into(),
            news_source,
        }
    }

    /// Builds a client from the default AWS credential chain
    pub async fn from_env(
        region: Option<&str>,
        platform_application_arn: impl Into<String>,
        news_source: NewsSource,
    ) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let sdk_config = loader.load().await;
        info!(
            region = ?sdk_config.region(),
            news_source = %news_source,
            "Initialized SNS notification service"
        );
        Self::new(
            SnsClient::new(&sdk_config),
            platform_application_arn,
            news_source,
        )
    }

    /// Topics of other news sources, or without a source segment, are skipped
    fn belongs_to_source(&self, topic: &Topic) -> bool {
        topic.is_recognized() && topic.news_source() == self.news_source.as_str()
    }
}

#[async_trait]
impl NotificationService for SnsNotificationService {
    #[instrument(skip(self))]
    async fn list_topics(&self) -> Result<Vec<Topic>> {
        let mut topics = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_topics()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| BubblaError::notification("list_topics", DisplayErrorContext(&e)))?;

            topics.extend(
                output
                    .topics()
                    .iter()
                    .filter_map(|t| t.topic_arn())
                    .map(Topic::new)
                    .filter(|t| self.belongs_to_source(t)),
            );

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(count = topics.len(), "Listed SNS topics");
        Ok(topics)
    }

    async fn create_endpoint(&self, device_token: &str) -> Result<String> {
        let output = self
            .client
            .create_platform_endpoint()
            .platform_application_arn(&self.platform_application_arn)
            .token(device_token)
            .send()
            .await
            .map_err(|e| BubblaError::notification("create_endpoint", DisplayErrorContext(&e)))?;

        output
            .endpoint_arn()
            .map(str::to_string)
            .ok_or_else(|| BubblaError::notification("create_endpoint", "no endpoint ARN returned"))
    }

    async fn subscribe(&self, endpoint_arn: &str, topic: &Topic) -> Result<String> {
        let output = self
            .client
            .subscribe()
            .topic_arn(topic.topic_arn())
            .protocol("application")
            .endpoint(endpoint_arn)
            .return_subscription_arn(true)
            .send()
            .await
            .map_err(|e| BubblaError::notification("subscribe", DisplayErrorContext(&e)))?;

        output
            .subscription_arn()
            .map(str::to_string)
            .ok_or_else(|| BubblaError::notification("subscribe", "no subscription ARN returned"))
    }

    async fn unsubscribe(&self, subscription_arn: &str) -> Result<bool> {
        self.client
            .unsubscribe()
            .subscription_arn(subscription_arn)
            .send()
            .await
            .map_err(|e| BubblaError::notification("unsubscribe", DisplayErrorContext(&e)))?;
        Ok(true)
    }
}
