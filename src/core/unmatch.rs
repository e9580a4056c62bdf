use std::sync::Arc;
use tracing::{debug, info};

use crate::core::retry::RetryPolicy;
use crate::error::EngineError;
use crate::services::RelationshipStore;

/// Dissolves a match between two users
#[derive(Clone)]
pub struct UnmatchHandler {
    store: Arc<dyn RelationshipStore>,
    retry: RetryPolicy,
}

impl UnmatchHandler {
    pub fn new(store: Arc<dyn RelationshipStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Move both directional rows from matched to unmatched in one unit.
    ///
    /// Idempotent: pairs that were never matched, or are already unmatched,
    /// are left untouched and the call still succeeds. Either side may call.
    pub async fn unmatch(&self, caller_id: &str, other_id: &str) -> Result<bool, EngineError> {
        let cleared = self
            .retry
            .run("unmatch", move || self.unmatch_once(caller_id, other_id))
            .await?;

        if cleared {
            info!("Users {} and {} unmatched", caller_id, other_id);
        } else {
            debug!("No match between {} and {} to clear", caller_id, other_id);
        }

        Ok(cleared)
    }

    async fn unmatch_once(&self, caller_id: &str, other_id: &str) -> Result<bool, EngineError> {
        let mut tx = self.store.begin().await?;
        let forward = tx.clear_match(caller_id, other_id).await?;
        let reverse = tx.clear_match(other_id, caller_id).await?;
        tx.commit().await?;
        Ok(forward || reverse)
    }
}
