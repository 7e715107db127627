//! Push-topic reconciliation
//!
//! Converges the subscriptions held for a device to the user's exclusion
//! choices. Reconciliation runs only when a device registers.
//!
//! Per topic:
//! - included and not subscribed: subscribe, then store the subscription ARN
//! - excluded and subscribed: unsubscribe, then clear the stored ARN
//! - otherwise nothing is sent
//!
//! Topic calls run concurrently and are joined before the report is returned.
//! A failing topic never stops its siblings.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::{BubblaError, Result};
use crate::metrics::{self, ACTION_SUBSCRIBE, ACTION_UNSUBSCRIBE};
use crate::notifications::{NotificationService, TopicPreferences};
use crate::schemas::Topic;

/// Remote call needed for one topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    Subscribe,
    Unsubscribe { subscription_arn: String },
    None,
}

impl PlannedAction {
    pub fn plan(excluded: bool, subscription_arn: Option<String>) -> Self {
        match (excluded, subscription_arn) {
            (false, None) => Self::Subscribe,
            (true, Some(subscription_arn)) => Self::Unsubscribe { subscription_arn },
            _ => Self::None,
        }
    }
}

#[derive(Debug)]
pub enum TopicOutcome {
    Subscribed { subscription_arn: String },
    Unsubscribed,
    Unchanged,
    Failed {
        action: &'static str,
        error: BubblaError,
    },
}

#[derive(Debug)]
pub struct TopicResult {
    pub topic: Topic,
    pub outcome: TopicOutcome,
}

/// Per-topic results of one registration, in topic-list order
#[derive(Debug)]
pub struct ReconciliationReport {
    pub endpoint_arn: String,
    pub results: Vec<TopicResult>,
}

impl ReconciliationReport {
    pub fn failures(&self) -> impl Iterator<Item = &TopicResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, TopicOutcome::Failed { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn subscribed(&self) -> usize {
        self.count(|o| matches!(o, TopicOutcome::Subscribed { .. }))
    }

    pub fn unsubscribed(&self) -> usize {
        self.count(|o| matches!(o, TopicOutcome::Unsubscribed))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, TopicOutcome::Unchanged))
    }

    fn count(&self, pred: impl Fn(&TopicOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

pub struct NotificationReconciler {
    service: Arc<dyn NotificationService>,
}

impl NotificationReconciler {
    pub fn new(service: Arc<dyn NotificationService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<dyn NotificationService> {
        &self.service
    }

    /// Registers `device_token` and reconciles every listed topic.
    ///
    /// Fails without touching `preferences` if the endpoint cannot be
    /// created or the topics cannot be listed.
    #[instrument(skip(self, device_token, preferences))]
    pub async fn register_device(
        &self,
        device_token: &str,
        preferences: &dyn TopicPreferences,
    ) -> Result<ReconciliationReport> {
        let endpoint_arn = self.service.create_endpoint(device_token).await?;
        let topics = self.service.list_topics().await?;

        info!(topics = topics.len(), "Reconciling topic subscriptions");

        let results = join_all(
            topics
                .into_iter()
                .map(|topic| self.reconcile_topic(&endpoint_arn, topic, preferences)),
        )
        .await;

        let report = ReconciliationReport {
            endpoint_arn,
            results,
        };
        info!(
            subscribed = report.subscribed(),
            unsubscribed = report.unsubscribed(),
            unchanged = report.unchanged(),
            failed = report.failures().count(),
            "Reconciliation finished"
        );
        Ok(report)
    }

    async fn reconcile_topic(
        &self,
        endpoint_arn: &str,
        topic: Topic,
        preferences: &dyn TopicPreferences,
    ) -> TopicResult {
        let action = PlannedAction::plan(
            preferences.exclude_topic(&topic),
            preferences.subscription_arn_for_topic(&topic),
        );

        let outcome = match action {
            PlannedAction::None => TopicOutcome::Unchanged,
            PlannedAction::Subscribe => match self.service.subscribe(endpoint_arn, &topic).await {
                Ok(subscription_arn) => {
                    metrics::record_reconcile_call(ACTION_SUBSCRIBE, true);
                    preferences.set_subscription_arn(&topic, Some(subscription_arn.clone()));
                    TopicOutcome::Subscribed { subscription_arn }
                }
                Err(error) => {
                    metrics::record_reconcile_call(ACTION_SUBSCRIBE, false);
                    warn!(topic = %topic, error = %error, "Subscribe failed");
                    TopicOutcome::Failed {
                        action: ACTION_SUBSCRIBE,
                        error,
                    }
                }
            },
            PlannedAction::Unsubscribe { subscription_arn } => {
                let result = match self.service.unsubscribe(&subscription_arn).await {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(BubblaError::notification(
                        "unsubscribe",
                        format!("service declined to remove {}", subscription_arn),
                    )),
                    Err(error) => Err(error),
                };
                match result {
                    Ok(()) => {
                        metrics::record_reconcile_call(ACTION_UNSUBSCRIBE, true);
                        preferences.set_subscription_arn(&topic, None);
                        TopicOutcome::Unsubscribed
                    }
                    Err(error) => {
                        metrics::record_reconcile_call(ACTION_UNSUBSCRIBE, false);
                        warn!(topic = %topic, error = %error, "Unsubscribe failed");
                        TopicOutcome::Failed {
                            action: ACTION_UNSUBSCRIBE,
                            error,
                        }
                    }
                }
            }
        };

        TopicResult { topic, outcome }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::memory::InMemoryNotificationService;
    use crate::notifications::InMemoryTopicPreferences;

    const AFRIKA: &str = "arn:aws:sns:eu-central-1:312328711982:bubbla_afrika";
    const EUROPA: &str = "arn:aws:sns:eu-central-1:312328711982:bubbla_europa";
    const NORDAMERIKA: &str = "arn:aws:sns:eu-central-1:312328711982:bubbla_nordamerika";

    fn service() -> InMemoryNotificationService {
        InMemoryNotificationService::with_topic_arns([AFRIKA, EUROPA, NORDAMERIKA])
    }

    #[test]
    fn test_plan() {
        assert_eq!(PlannedAction::plan(false, None), PlannedAction::Subscribe);
        assert_eq!(
            PlannedAction::plan(true, Some("s1".to_string())),
            PlannedAction::Unsubscribe {
                subscription_arn: "s1".to_string()
            }
        );
        assert_eq!(PlannedAction::plan(false, Some("s1".to_string())), PlannedAction::None);
        assert_eq!(PlannedAction::plan(true, None), PlannedAction::None);
    }

    #[tokio::test]
    async fn test_subscribes_all_included_topics() {
        let service = Arc::new(service());
        let reconciler = NotificationReconciler::new(service.clone());
        let prefs = InMemoryTopicPreferences::new();

        let report = reconciler.register_device("deviceToken", &prefs).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.subscribed(), 3);
        assert_eq!(report.endpoint_arn, "endpoint/deviceToken");

        for arn in [AFRIKA, EUROPA, NORDAMERIKA] {
            let stored = prefs.subscription_arn_for_topic(&Topic::new(arn)).unwrap();
            assert!(stored.starts_with(arn));
        }
    }

    #[tokio::test]
    async fn test_excluding_everything_leaves_no_subscriptions() {
        let service = Arc::new(service());
        let reconciler = NotificationReconciler::new(service.clone());
        let prefs = InMemoryTopicPreferences::new();
        for arn in [AFRIKA, EUROPA, NORDAMERIKA] {
            prefs.make_topic(&Topic::new(arn), true);
        }

        let report = reconciler.register_device("deviceToken", &prefs).await.unwrap();
        assert_eq!(report.unchanged(), 3);
        assert!(service.subscribe_calls().is_empty());
        assert!(service.unsubscribe_calls().is_empty());
        for arn in [AFRIKA, EUROPA, NORDAMERIKA] {
            assert_eq!(prefs.subscription_arn_for_topic(&Topic::new(arn)), None);
        }
    }

    #[tokio::test]
    async fn test_converges_mixed_state() {
        let service = Arc::new(service());
        let reconciler = NotificationReconciler::new(service.clone());
        let prefs = InMemoryTopicPreferences::new();

        // Excluded but still subscribed
        prefs.make_topic(&Topic::new(AFRIKA), true);
        prefs.set_subscription_arn(&Topic::new(AFRIKA), Some("s1".to_string()));
        // Already converged
        prefs.set_subscription_arn(&Topic::new(NORDAMERIKA), Some("s3".to_string()));

        let report = reconciler.register_device("deviceToken", &prefs).await.unwrap();
        assert!(report.is_success());

        assert_eq!(service.unsubscribe_calls(), vec!["s1".to_string()]);
        assert_eq!(service.subscribe_calls(), vec![EUROPA.to_string()]);
        assert_eq!(prefs.subscription_arn_for_topic(&Topic::new(AFRIKA)), None);
        assert_eq!(
            prefs.subscription_arn_for_topic(&Topic::new(EUROPA)).as_deref(),
            Some(format!("{}:sub-1", EUROPA).as_str())
        );
        assert_eq!(
            prefs.subscription_arn_for_topic(&Topic::new(NORDAMERIKA)).as_deref(),
            Some("s3")
        );

        for arn in [AFRIKA, EUROPA, NORDAMERIKA] {
            let topic = Topic::new(arn);
            assert_eq!(
                prefs.subscription_arn_for_topic(&topic).is_some(),
                !prefs.exclude_topic(&topic)
            );
        }
    }

    #[tokio::test]
    async fn test_failures_are_reported_per_topic() {
        let service = Arc::new(service().failing_subscribe_to(EUROPA).failing_unsubscribe("s1"));
        let reconciler = NotificationReconciler::new(service.clone());
        let prefs = InMemoryTopicPreferences::new();
        prefs.make_topic(&Topic::new(AFRIKA), true);
        prefs.set_subscription_arn(&Topic::new(AFRIKA), Some("s1".to_string()));

        let report = reconciler.register_device("deviceToken", &prefs).await.unwrap();
        assert!(!report.is_success());
        assert_eq!(report.failures().count(), 2);
        assert_eq!(report.subscribed(), 1);

        // Failed calls leave stored state untouched
        assert_eq!(
            prefs.subscription_arn_for_topic(&Topic::new(AFRIKA)).as_deref(),
            Some("s1")
        );
        assert_eq!(prefs.subscription_arn_for_topic(&Topic::new(EUROPA)), None);
        assert!(prefs.subscription_arn_for_topic(&Topic::new(NORDAMERIKA)).is_some());
    }

    /// Holds every subscribe call until all topics have called in
    struct GatedService {
        topics: Vec<Topic>,
        gate: tokio::sync::Barrier,
    }

    #[async_trait::async_trait]
    impl NotificationService for GatedService {
        async fn list_topics(&self) -> Result<Vec<Topic>> {
            Ok(self.topics.clone())
        }

        async fn create_endpoint(&self, device_token: &str) -> Result<String> {
            Ok(format!("endpoint/{}", device_token))
        }

        async fn subscribe(&self, _endpoint_arn: &str, topic: &Topic) -> Result<String> {
            self.gate.wait().await;
            Ok(format!("{}:gated", topic))
        }

        async fn unsubscribe(&self, _subscription_arn: &str) -> Result<bool> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_topic_calls_run_concurrently() {
        let topics: Vec<Topic> = [AFRIKA, EUROPA, NORDAMERIKA]
            .into_iter()
            .map(Topic::new)
            .collect();
        let service = Arc::new(GatedService {
            gate: tokio::sync::Barrier::new(topics.len()),
            topics,
        });
        let reconciler = NotificationReconciler::new(service);
        let prefs = InMemoryTopicPreferences::new();

        // Sequential calls would wait on the gate forever
        let report = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            reconciler.register_device("deviceToken", &prefs),
        )
        .await
        .expect("topic calls did not run concurrently")
        .unwrap();

        assert_eq!(report.subscribed(), 3);
        for arn in [AFRIKA, EUROPA, NORDAMERIKA] {
            assert_eq!(
                prefs.subscription_arn_for_topic(&Topic::new(arn)),
                Some(format!("{}:gated", arn))
            );
        }
    }

    #[tokio::test]
    async fn test_endpoint_failure_fails_fast() {
        let service = Arc::new(service().failing_create_endpoint());
        let reconciler = NotificationReconciler::new(service.clone());
        let prefs = InMemoryTopicPreferences::new();

        assert!(reconciler.register_device("bad", &prefs).await.is_err());
        assert_eq!(service.calls().len(), 1);
        assert!(prefs.snapshot().subscription_arns.is_empty());
    }

    #[tokio::test]
    async fn test_list_failure_fails_without_mutation() {
        let service = Arc::new(service().failing_list_topics());
        let reconciler = NotificationReconciler::new(service.clone());
        let prefs = InMemoryTopicPreferences::new();

        assert!(reconciler.register_device("deviceToken", &prefs).await.is_err());
        assert!(service.subscribe_calls().is_empty());
        assert!(prefs.snapshot().subscription_arns.is_empty());
    }
}
