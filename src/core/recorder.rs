use std::sync::Arc;
use tracing::{debug, info};

use crate::core::detector::{initial_state, is_mutual};
use crate::core::engine::ensure_user;
use crate::core::retry::RetryPolicy;
use crate::error::EngineError;
use crate::models::{Interaction, InteractionOutcome, Notification, Signal};
use crate::services::{spawn_dispatch, NotificationDispatcher, RelationshipStore, UserDirectory};

/// Records like/dislike signals and detects mutual matches.
///
/// The existence check, the insert and the reverse-row update run in one
/// serializable unit of work, so two users liking each other at the same
/// instant always end with both rows matched.
#[derive(Clone)]
pub struct InteractionRecorder {
    store: Arc<dyn RelationshipStore>,
    directory: Arc<dyn UserDirectory>,
    notifier: Arc<dyn NotificationDispatcher>,
    retry: RetryPolicy,
}

impl InteractionRecorder {
    pub fn new(
        store: Arc<dyn RelationshipStore>,
        directory: Arc<dyn UserDirectory>,
        notifier: Arc<dyn NotificationDispatcher>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            directory,
            notifier,
            retry,
        }
    }

    pub async fn like(&self, actor_id: &str, target_id: &str) -> Result<InteractionOutcome, EngineError> {
        self.record(actor_id, target_id, Signal::Like).await
    }

    pub async fn dislike(&self, actor_id: &str, target_id: &str) -> Result<InteractionOutcome, EngineError> {
        self.record(actor_id, target_id, Signal::Dislike).await
    }

    /// Record the actor's one and only signal about the target
    pub async fn record(
        &self,
        actor_id: &str,
        target_id: &str,
        signal: Signal,
    ) -> Result<InteractionOutcome, EngineError> {
        if actor_id == target_id {
            return Err(EngineError::InvalidOperation(
                "You cannot interact with yourself".to_string(),
            ));
        }

        ensure_user(self.directory.as_ref(), &self.retry, target_id, "Target user").await?;

        let outcome = self
            .retry
            .run("record_interaction", move || self.record_once(actor_id, target_id, signal))
            .await?;

        if outcome.matched {
            info!("New match between {} and {}", actor_id, target_id);
        } else {
            debug!("Recorded {:?} from {} to {}", signal, actor_id, target_id);
        }

        spawn_dispatch(self.notifier.clone(), notifications_for(actor_id, target_id, outcome));

        Ok(outcome)
    }

    async fn record_once(
        &self,
        actor_id: &str,
        target_id: &str,
        signal: Signal,
    ) -> Result<InteractionOutcome, EngineError> {
        let mut tx = self.store.begin().await?;

        if tx.find_interaction(actor_id, target_id).await?.is_some() {
            return Err(EngineError::Conflict(
                "You have already interacted with this user".to_string(),
            ));
        }

        let reverse = tx.find_interaction(target_id, actor_id).await?;
        let mutual = is_mutual(signal, reverse.as_ref());

        if mutual && !tx.mark_matched(target_id, actor_id).await? {
            // The reverse row changed under us; let the retry re-read it
            return Err(EngineError::Transient(format!(
                "reverse interaction {} -> {} changed during match",
                target_id, actor_id
            )));
        }

        let interaction = Interaction::new(actor_id, target_id, initial_state(signal, mutual));
        tx.insert_interaction(&interaction).await.map_err(|e| match EngineError::from(e) {
            EngineError::Conflict(_) => EngineError::Conflict(
                "You have already interacted with this user".to_string(),
            ),
            other => other,
        })?;

        tx.commit().await?;

        Ok(InteractionOutcome {
            liked: signal.is_like(),
            matched: mutual,
        })
    }
}

/// Match: both users hear about it. Like without match: only the target.
fn notifications_for(actor_id: &str, target_id: &str, outcome: InteractionOutcome) -> Vec<Notification> {
    match (outcome.liked, outcome.matched) {
        (_, true) => vec![
            Notification::matched(actor_id, target_id),
            Notification::matched(target_id, actor_id),
        ],
        (true, false) => vec![Notification::liked(target_id, actor_id)],
        (false, false) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InteractionState, NotificationKind};
    use crate::services::{MemoryStore, NoopNotifier};

    async fn recorder() -> (InteractionRecorder, MemoryStore) {
        let store = MemoryStore::new();
        store.add_users(["1", "2", "3", "4"]).await;
        let recorder = InteractionRecorder::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(NoopNotifier),
            RetryPolicy::default(),
        );
        (recorder, store)
    }

    #[tokio::test]
    async fn test_mutual_like_matches_both_rows() {
        let (recorder, store) = recorder().await;

        let first = recorder.like("1", "2").await.unwrap();
        assert_eq!(first, InteractionOutcome { liked: true, matched: false });

        let second = recorder.like("2", "1").await.unwrap();
        assert_eq!(second, InteractionOutcome { liked: true, matched: true });

        assert_eq!(store.get_interaction("1", "2").await.unwrap().state, InteractionState::Matched);
        assert_eq!(store.get_interaction("2", "1").await.unwrap().state, InteractionState::Matched);
    }

    #[tokio::test]
    async fn test_like_then_dislike_never_matches() {
        let (recorder, store) = recorder().await;

        recorder.like("1", "2").await.unwrap();
        let outcome = recorder.dislike("2", "1").await.unwrap();
        assert_eq!(outcome, InteractionOutcome { liked: false, matched: false });

        assert_eq!(store.get_interaction("1", "2").await.unwrap().state, InteractionState::Liked);
        assert_eq!(store.get_interaction("2", "1").await.unwrap().state, InteractionState::Disliked);
    }

    #[tokio::test]
    async fn test_like_against_unmatched_reverse_stays_pending() {
        let (recorder, store) = recorder().await;

        let mut tx = store.begin().await.unwrap();
        tx.insert_interaction(&Interaction::new("2", "1", InteractionState::Unmatched))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let outcome = recorder.like("1", "2").await.unwrap();
        assert_eq!(outcome, InteractionOutcome { liked: true, matched: false });

        assert_eq!(store.get_interaction("1", "2").await.unwrap().state, InteractionState::Liked);
        assert_eq!(store.get_interaction("2", "1").await.unwrap().state, InteractionState::Unmatched);
    }

    #[tokio::test]
    async fn test_second_signal_for_pair_conflicts() {
        let (recorder, _) = recorder().await;

        recorder.dislike("3", "4").await.unwrap();
        let err = recorder.like("3", "4").await.unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_self_interaction_rejected() {
        let (recorder, store) = recorder().await;

        let err = recorder.like("1", "1").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidOperation(_)));
        assert_eq!(store.interaction_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_target_not_found() {
        let (recorder, store) = recorder().await;

        let err = recorder.like("1", "99").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        assert_eq!(store.interaction_count().await, 0);
    }

    #[test]
    fn test_notification_fan_out() {
        let matched = notifications_for("1", "2", InteractionOutcome { liked: true, matched: true });
        assert_eq!(matched.len(), 2);
        assert!(matched.iter().all(|n| n.kind == NotificationKind::Match));

        let liked = notifications_for("1", "2", InteractionOutcome { liked: true, matched: false });
        assert_eq!(liked.len(), 1);
        assert_eq!(liked[0].user_id, "2");
        assert_eq!(liked[0].kind, NotificationKind::Like);

        assert!(notifications_for("1", "2", InteractionOutcome { liked: false, matched: false }).is_empty());
    }
}
