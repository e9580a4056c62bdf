// Integration tests for Lume Match

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lume_match::core::{Engine, EngineLimits, RetryPolicy};
use lume_match::models::{InteractionOutcome, InteractionState, Notification, NotificationKind, Page};
use lume_match::services::{
    MemoryStore, NoopNotifier, NotificationDispatcher, NotifyError, RelationshipStore,
};
use lume_match::EngineError;
use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};

async fn setup(users: &[&str]) -> (Engine, MemoryStore) {
    let store = MemoryStore::new();
    store.add_users(users.iter().copied()).await;
    let engine = Engine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(NoopNotifier),
        RetryPolicy::default(),
        EngineLimits::default(),
    );
    (engine, store)
}

#[tokio::test]
async fn test_like_match_message_unmatch_flow() {
    let (engine, _) = setup(&["1", "2"]).await;

    let first = assert_ok!(engine.recorder.like("1", "2").await);
    assert_eq!(first, InteractionOutcome { liked: true, matched: false });

    let second = assert_ok!(engine.recorder.like("2", "1").await);
    assert_eq!(second, InteractionOutcome { liked: true, matched: true });

    let message = assert_ok!(engine.gate.send_message("1", "2", "hi").await);
    assert_eq!(message.sender_id, "1");

    assert_ok!(engine.unmatcher.unmatch("1", "2").await);

    let err = assert_err!(engine.gate.send_message("1", "2", "hi").await);
    assert!(matches!(err, EngineError::Forbidden(_)));
    let err = assert_err!(engine.gate.get_conversation("2", "1", Page::new(1, 20)).await);
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn test_dislike_then_repeat_conflicts() {
    let (engine, store) = setup(&["3", "4"]).await;

    let outcome = assert_ok!(engine.recorder.dislike("3", "4").await);
    assert_eq!(outcome, InteractionOutcome { liked: false, matched: false });

    let err = assert_err!(engine.recorder.like("3", "4").await);
    assert!(matches!(err, EngineError::Conflict(_)));

    let row = store.get_interaction("3", "4").await.unwrap();
    assert_eq!(row.state, InteractionState::Disliked);
    assert_eq!(store.interaction_count().await, 1);
}

#[tokio::test]
async fn test_match_is_symmetric() {
    let (engine, store) = setup(&["a", "b"]).await;

    engine.recorder.like("a", "b").await.unwrap();
    engine.recorder.like("b", "a").await.unwrap();

    let forward = store.get_interaction("a", "b").await.unwrap();
    let reverse = store.get_interaction("b", "a").await.unwrap();
    assert!(forward.matched());
    assert!(reverse.matched());
    assert!(engine.gate.can_message("a", "b").await.unwrap());
    assert!(engine.gate.can_message("b", "a").await.unwrap());
}

#[tokio::test]
async fn test_no_self_targeting() {
    let (engine, store) = setup(&["1"]).await;

    assert!(matches!(
        assert_err!(engine.recorder.like("1", "1").await),
        EngineError::InvalidOperation(_)
    ));
    assert!(matches!(
        assert_err!(engine.moderation.block("1", "1").await),
        EngineError::InvalidOperation(_)
    ));
    assert!(matches!(
        assert_err!(engine.moderation.report("1", "1", "spam").await),
        EngineError::InvalidOperation(_)
    ));
    assert_eq!(store.interaction_count().await, 0);
}

#[tokio::test]
async fn test_one_sided_like_cannot_message() {
    let (engine, _) = setup(&["1", "2"]).await;

    engine.recorder.like("1", "2").await.unwrap();
    let err = assert_err!(engine.gate.send_message("1", "2", "hi").await);
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn test_unmatch_twice_is_same_state() {
    let (engine, store) = setup(&["1", "2"]).await;

    engine.recorder.like("1", "2").await.unwrap();
    engine.recorder.like("2", "1").await.unwrap();

    assert_ok!(engine.unmatcher.unmatch("2", "1").await);
    assert_ok!(engine.unmatcher.unmatch("2", "1").await);

    assert_eq!(store.get_interaction("1", "2").await.unwrap().state, InteractionState::Unmatched);
    assert_eq!(store.get_interaction("2", "1").await.unwrap().state, InteractionState::Unmatched);
    assert!(!engine.gate.can_message("1", "2").await.unwrap());

    // History stays, so neither user sees the other as a new candidate
    assert!(engine.discovery_exclusions("1").await.unwrap().contains("2"));
    assert!(engine.discovery_exclusions("2").await.unwrap().contains("1"));

    // And the pair cannot be re-liked into a fresh match
    let err = assert_err!(engine.recorder.like("1", "2").await);
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn test_report_and_block_are_independent() {
    let (engine, store) = setup(&["1", "2"]).await;

    engine.recorder.like("1", "2").await.unwrap();
    engine.recorder.like("2", "1").await.unwrap();
    engine.gate.send_message("1", "2", "hi").await.unwrap();

    assert_ok!(engine.moderation.report("2", "1", "rude").await);
    assert!(store.is_matched("1", "2").await.unwrap());
    assert!(!store.is_blocked("2", "1").await.unwrap());

    assert_ok!(engine.moderation.block("2", "1").await);
    let thread = engine.gate.get_conversation("2", "1", Page::new(1, 20)).await.unwrap();
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0].content, "hi");
}

#[tokio::test]
async fn test_discovery_exclusions() {
    let (engine, _) = setup(&["1", "2", "3", "4", "5"]).await;

    engine.recorder.like("1", "2").await.unwrap();
    engine.recorder.dislike("1", "3").await.unwrap();
    engine.moderation.block("1", "4").await.unwrap();
    // Being liked by someone does not exclude them
    engine.recorder.like("5", "1").await.unwrap();

    let excluded = engine.discovery_exclusions("1").await.unwrap();
    let expected: BTreeSet<String> = ["1", "2", "3", "4"].iter().map(|s| s.to_string()).collect();
    assert_eq!(excluded, expected);
}

#[tokio::test]
async fn test_conversation_overview() {
    let (engine, _) = setup(&["1", "2", "3"]).await;

    for other in ["2", "3"] {
        engine.recorder.like("1", other).await.unwrap();
        engine.recorder.like(other, "1").await.unwrap();
    }

    engine.gate.send_message("2", "1", "from two").await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    engine.gate.send_message("3", "1", "from three").await.unwrap();

    let conversations = engine.gate.list_conversations("1").await.unwrap();
    assert_eq!(conversations.len(), 2);
    assert_eq!(conversations[0].partner_id, "3");
    assert_eq!(conversations[0].unread_count, 1);

    engine.gate.get_conversation("1", "3", Page::new(1, 20)).await.unwrap();
    let conversations = engine.gate.list_conversations("1").await.unwrap();
    assert_eq!(conversations[0].unread_count, 0);
    assert_eq!(conversations[1].unread_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_simultaneous_mutual_likes_both_match() {
    for round in 0..25 {
        let a = format!("a{}", round);
        let b = format!("b{}", round);
        let (engine, store) = setup(&[a.as_str(), b.as_str()]).await;

        let left = {
            let (engine, a, b) = (engine.clone(), a.clone(), b.clone());
            tokio::spawn(async move { engine.recorder.like(&a, &b).await })
        };
        let right = {
            let (engine, a, b) = (engine.clone(), a.clone(), b.clone());
            tokio::spawn(async move { engine.recorder.like(&b, &a).await })
        };

        let left = left.await.unwrap().unwrap();
        let right = right.await.unwrap().unwrap();

        // Exactly one side observes the completed match
        assert!(left.matched ^ right.matched);
        assert_eq!(store.get_interaction(&a, &b).await.unwrap().state, InteractionState::Matched);
        assert_eq!(store.get_interaction(&b, &a).await.unwrap().state, InteractionState::Matched);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_signals_record_at_most_once() {
    let (engine, store) = setup(&["1", "2"]).await;

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move {
                if i % 2 == 0 {
                    engine.recorder.like("1", "2").await
                } else {
                    engine.recorder.dislike("1", "2").await
                }
            })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(e) => assert!(matches!(e, EngineError::Conflict(_))),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(store.interaction_count().await, 1);
}

struct ChannelNotifier(mpsc::UnboundedSender<Notification>);

#[async_trait]
impl NotificationDispatcher for ChannelNotifier {
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.0.send(notification.clone()).map_err(|_| NotifyError::Closed)
    }
}

struct FailingNotifier;

#[async_trait]
impl NotificationDispatcher for FailingNotifier {
    async fn dispatch(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Closed)
    }
}

#[tokio::test]
async fn test_match_notifies_both_users() {
    let store = MemoryStore::new();
    store.add_users(["1", "2"]).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = Engine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(ChannelNotifier(tx)),
        RetryPolicy::default(),
        EngineLimits::default(),
    );

    engine.recorder.like("1", "2").await.unwrap();
    let like = rx.recv().await.unwrap();
    assert_eq!(like.kind, NotificationKind::Like);
    assert_eq!(like.user_id, "2");

    engine.recorder.like("2", "1").await.unwrap();
    let mut notified = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
    notified.sort_by(|a, b| a.user_id.cmp(&b.user_id));
    assert!(notified.iter().all(|n| n.kind == NotificationKind::Match));
    assert_eq!(notified[0].user_id, "1");
    assert_eq!(notified[1].user_id, "2");
}

#[tokio::test]
async fn test_notification_failure_keeps_the_write() {
    let store = MemoryStore::new();
    store.add_users(["1", "2"]).await;
    let engine = Engine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(FailingNotifier),
        RetryPolicy::default(),
        EngineLimits::default(),
    );

    assert_ok!(engine.recorder.like("1", "2").await);
    assert_ok!(engine.recorder.like("2", "1").await);
    assert!(store.is_matched("1", "2").await.unwrap());
}
