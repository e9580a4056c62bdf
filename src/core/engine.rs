use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::EngineSettings;
use crate::core::gate::MessagingGate;
use crate::core::moderation::ModerationService;
use crate::core::recorder::InteractionRecorder;
use crate::core::retry::RetryPolicy;
use crate::core::unmatch::UnmatchHandler;
use crate::error::EngineError;
use crate::services::{MessageStore, NotificationDispatcher, RelationshipStore, UserDirectory};

/// Input limits enforced before any write
#[derive(Debug, Clone, Copy)]
pub struct EngineLimits {
    pub max_message_len: usize,
    pub max_reason_len: usize,
    pub max_page_size: u32,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_message_len: 2000,
            max_reason_len: 500,
            max_page_size: 100,
        }
    }
}

impl From<&EngineSettings> for EngineLimits {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            max_message_len: settings.max_message_len,
            max_reason_len: settings.max_reason_len,
            max_page_size: settings.max_page_size,
        }
    }
}

/// Fail `NotFound` unless the directory knows the user
pub(crate) async fn ensure_user(
    directory: &dyn UserDirectory,
    retry: &RetryPolicy,
    user_id: &str,
    label: &str,
) -> Result<(), EngineError> {
    if retry.bounded("user lookup", directory.exists(user_id)).await? {
        Ok(())
    } else {
        Err(EngineError::NotFound(format!("{} not found", label)))
    }
}

/// The interaction and match engine: one handle over every component,
/// all sharing the same stores and collaborators.
#[derive(Clone)]
pub struct Engine {
    pub recorder: InteractionRecorder,
    pub unmatcher: UnmatchHandler,
    pub gate: MessagingGate,
    pub moderation: ModerationService,
    relationships: Arc<dyn RelationshipStore>,
    retry: RetryPolicy,
}

impl Engine {
    pub fn new(
        relationships: Arc<dyn RelationshipStore>,
        messages: Arc<dyn MessageStore>,
        directory: Arc<dyn UserDirectory>,
        notifier: Arc<dyn NotificationDispatcher>,
        retry: RetryPolicy,
        limits: EngineLimits,
    ) -> Self {
        Self {
            recorder: InteractionRecorder::new(
                relationships.clone(),
                directory.clone(),
                notifier.clone(),
                retry,
            ),
            unmatcher: UnmatchHandler::new(relationships.clone(), retry),
            gate: MessagingGate::new(
                relationships.clone(),
                messages,
                directory.clone(),
                notifier,
                retry,
                limits,
            ),
            moderation: ModerationService::new(relationships.clone(), directory, retry, limits),
            relationships,
            retry,
        }
    }

    /// Partners the user currently has a match with
    pub async fn list_matches(&self, user_id: &str) -> Result<Vec<String>, EngineError> {
        self.retry
            .bounded("list matches", self.relationships.matched_partners(user_id))
            .await
    }

    /// Users candidate discovery must never surface to `user_id`: the user,
    /// everyone they blocked and everyone they already signalled, including
    /// pairs that were later unmatched.
    pub async fn discovery_exclusions(&self, user_id: &str) -> Result<BTreeSet<String>, EngineError> {
        let blocked = self
            .retry
            .bounded("list blocked", self.relationships.blocked_users(user_id))
            .await?;
        let interacted = self
            .retry
            .bounded("list interacted", self.relationships.interacted_targets(user_id))
            .await?;

        let mut excluded: BTreeSet<String> = blocked.into_iter().chain(interacted).collect();
        excluded.insert(user_id.to_string());
        Ok(excluded)
    }

    pub async fn health_check(&self) -> bool {
        match self
            .retry
            .bounded("health check", self.relationships.health_check())
            .await
        {
            Ok(healthy) => healthy,
            Err(e) => {
                tracing::error!("Store health check failed: {}", e);
                false
            }
        }
    }
}
