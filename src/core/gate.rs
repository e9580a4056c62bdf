use std::sync::Arc;
use tracing::debug;

use crate::core::engine::{ensure_user, EngineLimits};
use crate::core::retry::RetryPolicy;
use crate::error::EngineError;
use crate::models::{ConversationSummary, Message, Notification, Page};
use crate::services::{
    spawn_dispatch, MessageStore, NotificationDispatcher, RelationshipStore, UserDirectory,
};

const NOT_MATCHED: &str = "You can only send messages to users you have matched with";

/// Authorizes message traffic on the current match state of a pair
#[derive(Clone)]
pub struct MessagingGate {
    relationships: Arc<dyn RelationshipStore>,
    messages: Arc<dyn MessageStore>,
    directory: Arc<dyn UserDirectory>,
    notifier: Arc<dyn NotificationDispatcher>,
    retry: RetryPolicy,
    limits: EngineLimits,
}

impl MessagingGate {
    pub fn new(
        relationships: Arc<dyn RelationshipStore>,
        messages: Arc<dyn MessageStore>,
        directory: Arc<dyn UserDirectory>,
        notifier: Arc<dyn NotificationDispatcher>,
        retry: RetryPolicy,
        limits: EngineLimits,
    ) -> Self {
        Self {
            relationships,
            messages,
            directory,
            notifier,
            retry,
            limits,
        }
    }

    /// True iff a matched row exists in either direction
    pub async fn can_message(&self, user_a: &str, user_b: &str) -> Result<bool, EngineError> {
        self.retry
            .bounded("match lookup", self.relationships.is_matched(user_a, user_b))
            .await
    }

    async fn require_match(&self, user_a: &str, user_b: &str) -> Result<(), EngineError> {
        if self.can_message(user_a, user_b).await? {
            Ok(())
        } else {
            Err(EngineError::Forbidden(NOT_MATCHED.to_string()))
        }
    }

    pub async fn send_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
    ) -> Result<Message, EngineError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(EngineError::ValidationError(
                "Message content is required".to_string(),
            ));
        }
        if content.chars().count() > self.limits.max_message_len {
            return Err(EngineError::ValidationError(format!(
                "Message content must be at most {} characters",
                self.limits.max_message_len
            )));
        }

        ensure_user(self.directory.as_ref(), &self.retry, sender_id, "Sender").await?;
        ensure_user(self.directory.as_ref(), &self.retry, receiver_id, "Receiver").await?;
        self.require_match(sender_id, receiver_id).await?;

        let message = Message::new(sender_id, receiver_id, content);
        self.retry
            .bounded("insert message", self.messages.insert_message(&message))
            .await?;

        debug!("Message {} sent from {} to {}", message.id, sender_id, receiver_id);

        spawn_dispatch(
            self.notifier.clone(),
            vec![Notification::message(receiver_id, sender_id, content)],
        );

        Ok(message)
    }

    /// Newest-first page of the thread between the caller and `other_id`.
    ///
    /// Messages the other party sent to the caller are marked read before the
    /// page is fetched.
    pub async fn get_conversation(
        &self,
        caller_id: &str,
        other_id: &str,
        page: Page,
    ) -> Result<Vec<Message>, EngineError> {
        self.require_match(caller_id, other_id).await?;

        let page = Page::new(page.page, page.limit.min(self.limits.max_page_size));

        let marked = self
            .retry
            .bounded("mark read", self.messages.mark_read(other_id, caller_id))
            .await?;
        if marked > 0 {
            debug!("Marked {} messages from {} to {} as read", marked, other_id, caller_id);
        }

        self.retry
            .bounded("fetch conversation", self.messages.conversation(caller_id, other_id, page))
            .await
    }

    pub async fn list_conversations(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConversationSummary>, EngineError> {
        self.retry
            .bounded("list conversations", self.messages.conversations(user_id))
            .await
    }
}
