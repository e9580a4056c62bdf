use std::sync::Arc;
use tracing::info;

use crate::core::engine::{ensure_user, EngineLimits};
use crate::core::retry::RetryPolicy;
use crate::error::EngineError;
use crate::models::Report;
use crate::services::{RelationshipStore, UserDirectory};

/// Block list mutation and append-only reports.
///
/// Neither touches interaction or match state.
#[derive(Clone)]
pub struct ModerationService {
    store: Arc<dyn RelationshipStore>,
    directory: Arc<dyn UserDirectory>,
    retry: RetryPolicy,
    limits: EngineLimits,
}

impl ModerationService {
    pub fn new(
        store: Arc<dyn RelationshipStore>,
        directory: Arc<dyn UserDirectory>,
        retry: RetryPolicy,
        limits: EngineLimits,
    ) -> Self {
        Self {
            store,
            directory,
            retry,
            limits,
        }
    }

    pub async fn block(&self, user_id: &str, target_id: &str) -> Result<(), EngineError> {
        if user_id == target_id {
            return Err(EngineError::InvalidOperation(
                "You cannot block yourself".to_string(),
            ));
        }
        ensure_user(self.directory.as_ref(), &self.retry, target_id, "Target user").await?;

        let added = self
            .retry
            .run("block", move || async move {
                let mut tx = self.store.begin().await?;
                let added = tx.add_block(user_id, target_id).await?;
                tx.commit().await?;
                Ok::<_, EngineError>(added)
            })
            .await?;

        if !added {
            return Err(EngineError::Conflict("User is already blocked".to_string()));
        }

        info!("User {} blocked {}", user_id, target_id);
        Ok(())
    }

    pub async fn unblock(&self, user_id: &str, target_id: &str) -> Result<(), EngineError> {
        if user_id == target_id {
            return Err(EngineError::InvalidOperation(
                "You cannot unblock yourself".to_string(),
            ));
        }
        ensure_user(self.directory.as_ref(), &self.retry, target_id, "Target user").await?;

        let removed = self
            .retry
            .run("unblock", move || async move {
                let mut tx = self.store.begin().await?;
                let removed = tx.remove_block(user_id, target_id).await?;
                tx.commit().await?;
                Ok::<_, EngineError>(removed)
            })
            .await?;

        if !removed {
            return Err(EngineError::InvalidOperation("User is not blocked".to_string()));
        }

        info!("User {} unblocked {}", user_id, target_id);
        Ok(())
    }

    pub async fn report(
        &self,
        reporter_id: &str,
        target_id: &str,
        reason: &str,
    ) -> Result<Report, EngineError> {
        if reporter_id == target_id {
            return Err(EngineError::InvalidOperation(
                "You cannot report yourself".to_string(),
            ));
        }

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EngineError::ValidationError("Reason is required".to_string()));
        }
        if reason.chars().count() > self.limits.max_reason_len {
            return Err(EngineError::ValidationError(format!(
                "Reason must be at most {} characters",
                self.limits.max_reason_len
            )));
        }

        ensure_user(self.directory.as_ref(), &self.retry, target_id, "Target user").await?;

        let report = Report::new(reporter_id, target_id, reason);
        let submitted = &report;
        self.retry
            .run("report", move || async move {
                let mut tx = self.store.begin().await?;
                tx.insert_report(submitted).await?;
                tx.commit().await?;
                Ok::<_, EngineError>(())
            })
            .await?;

        info!("User {} reported {} ({})", reporter_id, target_id, report.id);
        Ok(report)
    }

    pub async fn blocked_users(&self, user_id: &str) -> Result<Vec<String>, EngineError> {
        self.retry
            .bounded("list blocked", self.store.blocked_users(user_id))
            .await
    }

    pub async fn reports_for(&self, target_id: &str) -> Result<Vec<Report>, EngineError> {
        self.retry
            .bounded("list reports", self.store.reports_for(target_id))
            .await
    }
}
