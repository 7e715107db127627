//! Topic preference stores
//!
//! Per topic, the store keeps whether the user excluded it and the ARN of
//! the subscription currently held for it. Implementations lock internally,
//! so overlapping reconciliation completions write one at a time.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::schemas::Topic;

pub trait TopicPreferences: Send + Sync {
    /// Whether the user opted out of `topic`; unknown topics are included
    fn exclude_topic(&self, topic: &Topic) -> bool;

    fn make_topic(&self, topic: &Topic, excluded: bool);

    /// ARN of the subscription held for `topic`, if subscribed
    fn subscription_arn_for_topic(&self, topic: &Topic) -> Option<String>;

    /// Records or clears (`None`) the subscription held for `topic`
    fn set_subscription_arn(&self, topic: &Topic, subscription_arn: Option<String>);
}

/// Serialized preference state, keyed by topic ARN
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceState {
    #[serde(default)]
    pub excluded: HashMap<String, bool>,
    #[serde(default)]
    pub subscription_arns: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PreferenceState {
    fn exclude_topic(&self, topic: &Topic) -> bool {
        self.excluded
            .get(topic.topic_arn())
            .copied()
            .unwrap_or(false)
    }

    fn make_topic(&mut self, topic: &Topic, excluded: bool) {
        self.excluded.insert(topic.topic_arn().to_string(), excluded);
        self.updated_at = Some(Utc::now());
    }

    fn subscription_arn_for_topic(&self, topic: &Topic) -> Option<String> {
        self.subscription_arns.get(topic.topic_arn()).cloned()
    }

    fn set_subscription_arn(&mut self, topic: &Topic, subscription_arn: Option<String>) {
        match subscription_arn {
            Some(arn) => {
                self.subscription_arns
                    .insert(topic.topic_arn().to_string(), arn);
            }
            None => {
                self.subscription_arns.remove(topic.topic_arn());
            }
        }
        self.updated_at = Some(Utc::now());
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryTopicPreferences {
    state: RwLock<PreferenceState>,
}

impl InMemoryTopicPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PreferenceState {
        self.state.read().clone()
    }
}

impl TopicPreferences for InMemoryTopicPreferences {
    fn exclude_topic(&self, topic: &Topic) -> bool {
        self.state.read().exclude_topic(topic)
    }

    fn make_topic(&self, topic: &Topic, excluded: bool) {
        self.state.write().make_topic(topic, excluded);
    }

    fn subscription_arn_for_topic(&self, topic: &Topic) -> Option<String> {
        self.state.read().subscription_arn_for_topic(topic)
    }

    fn set_subscription_arn(&self, topic: &Topic, subscription_arn: Option<String>) {
        self.state.write().set_subscription_arn(topic, subscription_arn);
    }
}

/// Store persisted as a JSON file. Writes stay in memory until `save`.
#[derive(Debug)]
pub struct FileTopicPreferences {
    file_path: PathBuf,
    state: RwLock<PreferenceState>,
    /// Bumped on every write while the state lock is held
    revision: AtomicU64,
    saved_revision: AtomicU64,
}

impl FileTopicPreferences {
    /// Opens the store at `file_path`, starting empty if the file is
    /// missing or unreadable
    pub async fn open(file_path: &Path) -> Result<Self> {
        if let Some(dir) = file_path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).await?;
            }
        }

        let state = if file_path.exists() {
            match Self::load_from_file(file_path).await {
                Ok(state) => {
                    info!(
                        path = %file_path.display(),
                        topics = state.excluded.len(),
                        subscriptions = state.subscription_arns.len(),
                        "Loaded topic preferences"
                    );
                    state
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load topic preferences, starting fresh");
                    PreferenceState::default()
                }
            }
        } else {
            info!("No topic preferences yet, starting fresh");
            PreferenceState::default()
        };

        Ok(Self {
            file_path: file_path.to_path_buf(),
            state: RwLock::new(state),
            revision: AtomicU64::new(0),
            saved_revision: AtomicU64::new(0),
        })
    }

    async fn load_from_file(path: &Path) -> Result<PreferenceState> {
        let contents = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn is_dirty(&self) -> bool {
        self.revision.load(Ordering::SeqCst) != self.saved_revision.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> PreferenceState {
        self.state.read().clone()
    }

    /// Writes the state if it changed since the last save. Writes made
    /// while the file is being written stay pending for the next save.
    pub async fn save(&self) -> Result<()> {
        if !self.is_dirty() {
            return Ok(());
        }
        let (json, revision) = self.serialize()?;
        self.write_file(&json).await?;
        self.mark_saved(revision);
        debug!(path = %self.file_path.display(), revision, "Topic preferences saved");
        Ok(())
    }

    /// JSON of the current state and the revision it reflects
    fn serialize(&self) -> Result<(String, u64)> {
        let state = self.state.read();
        let revision = self.revision.load(Ordering::SeqCst);
        Ok((serde_json::to_string_pretty(&*state)?, revision))
    }

    async fn write_file(&self, json: &str) -> Result<()> {
        // Write to temp file first, then rename
        let temp_path = self.file_path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, &self.file_path).await?;
        Ok(())
    }

    fn mark_saved(&self, revision: u64) {
        self.saved_revision.fetch_max(revision, Ordering::SeqCst);
    }
}

impl TopicPreferences for FileTopicPreferences {
    fn exclude_topic(&self, topic: &Topic) -> bool {
        self.state.read().exclude_topic(topic)
    }

    fn make_topic(&self, topic: &Topic, excluded: bool) {
        let mut state = self.state.write();
        state.make_topic(topic, excluded);
        self.revision.fetch_add(1, Ordering::SeqCst);
    }

    fn subscription_arn_for_topic(&self, topic: &Topic) -> Option<String> {
        self.state.read().subscription_arn_for_topic(topic)
    }

    fn set_subscription_arn(&self, topic: &Topic, subscription_arn: Option<String>) {
        let mut state = self.state.write();
        state.set_subscription_arn(topic, subscription_arn);
        self.revision.fetch_add(1, Ordering::SeqCst);
    }
}
