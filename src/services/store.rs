use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ConversationSummary, Interaction, Message, Page, Report};

/// Errors raised by the relationship and message stores
#[derive(Debug, Error)]
pub enum StoreError {
    /// Serialization failure or deadlock; the unit of work may be retried
    #[error("Write contention: {0}")]
    Contention(String),

    #[error("Unique constraint violated: {0}")]
    Duplicate(String),

    #[error("Storage call timed out: {0}")]
    Timeout(String),

    #[error("SQLx error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Contention(_) | StoreError::Timeout(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            match db.code().as_deref() {
                // serialization_failure, deadlock_detected
                Some("40001") | Some("40P01") => {
                    return StoreError::Contention(db.message().to_string())
                }
                // unique_violation
                Some("23505") => return StoreError::Duplicate(db.message().to_string()),
                _ => {}
            }
        }

        if matches!(err, sqlx::Error::PoolTimedOut) {
            return StoreError::Timeout("timed out acquiring a connection".to_string());
        }

        StoreError::Database(err)
    }
}

/// One atomic, isolated unit of work against the relationship store.
///
/// Writes become visible only after `commit`. Dropping the unit without
/// committing rolls every write back, so a cancelled caller never leaves a
/// half-applied state behind.
#[async_trait]
pub trait RelationshipTx: Send {
    /// Read the (actor, target) row, locking it for the rest of the unit
    async fn find_interaction(
        &mut self,
        actor_id: &str,
        target_id: &str,
    ) -> Result<Option<Interaction>, StoreError>;

    /// Insert a new row; a second row for the same ordered pair fails `Duplicate`
    async fn insert_interaction(&mut self, interaction: &Interaction) -> Result<(), StoreError>;

    /// Flip a liked row to matched. Returns false when no liked row exists.
    async fn mark_matched(&mut self, actor_id: &str, target_id: &str) -> Result<bool, StoreError>;

    /// Flip a matched row to unmatched. Returns false when nothing was matched.
    async fn clear_match(&mut self, actor_id: &str, target_id: &str) -> Result<bool, StoreError>;

    /// Returns false when the target was already blocked
    async fn add_block(&mut self, user_id: &str, target_id: &str) -> Result<bool, StoreError>;

    /// Returns false when the target was not blocked
    async fn remove_block(&mut self, user_id: &str, target_id: &str) -> Result<bool, StoreError>;

    async fn insert_report(&mut self, report: &Report) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Durable storage for interactions, block lists and reports
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn RelationshipTx>, StoreError>;

    /// True iff a matched row exists in either direction between the pair
    async fn is_matched(&self, user_a: &str, user_b: &str) -> Result<bool, StoreError>;

    /// Every target the user has signalled, whatever the current state
    async fn interacted_targets(&self, user_id: &str) -> Result<Vec<String>, StoreError>;

    async fn matched_partners(&self, user_id: &str) -> Result<Vec<String>, StoreError>;

    async fn blocked_users(&self, user_id: &str) -> Result<Vec<String>, StoreError>;

    async fn is_blocked(&self, user_id: &str, target_id: &str) -> Result<bool, StoreError>;

    async fn reports_for(&self, target_id: &str) -> Result<Vec<Report>, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}

/// Message persistence, gated by the engine but owned separately
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert_message(&self, message: &Message) -> Result<(), StoreError>;

    /// Marks unread messages from `sender_id` to `receiver_id` as read
    async fn mark_read(&self, sender_id: &str, receiver_id: &str) -> Result<u64, StoreError>;

    /// Messages exchanged between the pair, newest first
    async fn conversation(
        &self,
        user_a: &str,
        user_b: &str,
        page: Page,
    ) -> Result<Vec<Message>, StoreError>;

    /// One summary per conversation partner, most recent conversation first
    async fn conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StoreError::Contention("40001".into()).is_transient());
        assert!(StoreError::Timeout("slow".into()).is_transient());
        assert!(!StoreError::Duplicate("pk".into()).is_transient());
        assert!(!StoreError::from(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Timeout(_)));
    }
}
