//! API facade used by the presentation layer
//!
//! Holds the selected news source and the injected collaborators. Built
//! once by the composition root and passed to whoever needs it.

use std::sync::Arc;

use crate::error::Result;
use crate::feed::{self, NewsFeedService};
use crate::http_client::UrlFetcher;
use crate::notifications::{NotificationService, TopicPreferences};
use crate::reconciler::{NotificationReconciler, ReconciliationReport};
use crate::schemas::{CategoryGroup, NewsItem, NewsSource, NewsSourceDistribution};

pub struct BubblaApi {
    news_source: NewsSource,
    feed: NewsFeedService,
    reconciler: NotificationReconciler,
}

impl BubblaApi {
    pub fn new(
        news_source: NewsSource,
        feed_base_url: impl Into<String>,
        url_fetcher: Arc<dyn UrlFetcher>,
        notification_service: Arc<dyn NotificationService>,
    ) -> Self {
        Self {
            news_source,
            feed: NewsFeedService::new(url_fetcher, feed_base_url),
            reconciler: NotificationReconciler::new(notification_service),
        }
    }

    pub fn news_source(&self) -> NewsSource {
        self.news_source
    }

    pub fn notification_service(&self) -> &Arc<dyn NotificationService> {
        self.reconciler.service()
    }

    /// Whole feed of the selected source
    pub async fn news(&self) -> Result<Vec<NewsItem>> {
        self.feed.fetch_news(self.news_source).await
    }

    /// Feed items of `category`; `None` or the latest sentinel returns all
    pub async fn news_for_category(&self, category: Option<&str>) -> Result<Vec<NewsItem>> {
        self.feed.news_for_category(self.news_source, category).await
    }

    /// Registers the device and reconciles its topic subscriptions
    pub async fn register_device(
        &self,
        device_token: &str,
        preferences: &dyn TopicPreferences,
    ) -> Result<ReconciliationReport> {
        self.reconciler
            .register_device(device_token, preferences)
            .await
    }

    pub fn news_source_distribution_from_news_items(
        &self,
        items: &[NewsItem],
    ) -> Vec<NewsSourceDistribution> {
        feed::news_source_distribution_from_news_items(items)
    }

    pub fn categories_with_types_from_news_items(&self, items: &[NewsItem]) -> Vec<CategoryGroup> {
        feed::categories_with_types_from_news_items(items)
    }
}
