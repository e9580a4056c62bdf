use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::models::Notification;
use crate::services::appwrite::{AppwriteClient, AppwriteError};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification delivery failed: {0}")]
    Appwrite(#[from] AppwriteError),

    #[error("Notification sink closed")]
    Closed,
}

/// Fire-and-forget sink for match, like and message events
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotifyError>;
}

#[async_trait]
impl NotificationDispatcher for AppwriteClient {
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotifyError> {
        Ok(self.create_notification(notification).await?)
    }
}

/// Dispatcher that drops every event
pub struct NoopNotifier;

#[async_trait]
impl NotificationDispatcher for NoopNotifier {
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::trace!("Dropping {:?} notification for {}", notification.kind, notification.user_id);
        Ok(())
    }
}

/// Deliver notifications on a background task.
///
/// Called only after the originating unit of work has committed; delivery
/// failures are logged and never reach the caller.
pub fn spawn_dispatch(dispatcher: Arc<dyn NotificationDispatcher>, notifications: Vec<Notification>) {
    if notifications.is_empty() {
        return;
    }

    tokio::spawn(async move {
        for notification in notifications {
            if let Err(e) = dispatcher.dispatch(&notification).await {
                tracing::warn!(
                    "Failed to deliver {:?} notification to {}: {}",
                    notification.kind,
                    notification.user_id,
                    e
                );
            }
        }
    });
}
