use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::core::detector::pair_matched;
use crate::models::{ConversationSummary, Interaction, InteractionState, Message, Page, Report};
use crate::services::directory::{DirectoryError, UserDirectory};
use crate::services::store::{MessageStore, RelationshipStore, RelationshipTx, StoreError};

type PairKey = (String, String);

fn key(actor_id: &str, target_id: &str) -> PairKey {
    (actor_id.to_string(), target_id.to_string())
}

#[derive(Debug, Default)]
struct Relationships {
    interactions: HashMap<PairKey, Interaction>,
    blocks: HashMap<String, HashSet<String>>,
    reports: Vec<Report>,
}

/// Inverse of one write applied inside a unit of work
enum Undo {
    RemoveInteraction(PairKey),
    RestoreInteraction(Interaction),
    RemoveBlock(String, String),
    RestoreBlock(String, String),
    PopReport,
}

/// In-process store used by tests, benches and `memory://` deployments.
///
/// A unit of work owns the single state lock for its whole lifetime, which
/// makes every unit serializable. Writes are applied in place and journaled;
/// a unit dropped before `commit` replays the journal backwards.
#[derive(Clone, Default)]
pub struct MemoryStore {
    relationships: Arc<Mutex<Relationships>>,
    messages: Arc<Mutex<Vec<Message>>>,
    users: Arc<RwLock<HashSet<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register users with the in-memory directory
    pub async fn add_users<I, S>(&self, user_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut users = self.users.write().await;
        users.extend(user_ids.into_iter().map(Into::into));
    }

    /// Raw row lookup, outside any unit of work
    pub async fn get_interaction(&self, actor_id: &str, target_id: &str) -> Option<Interaction> {
        let state = self.relationships.lock().await;
        state.interactions.get(&key(actor_id, target_id)).cloned()
    }

    pub async fn interaction_count(&self) -> usize {
        self.relationships.lock().await.interactions.len()
    }
}

pub struct MemoryTx {
    state: OwnedMutexGuard<Relationships>,
    undo: Vec<Undo>,
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if self.undo.is_empty() {
            return;
        }

        tracing::debug!("Rolling back {} uncommitted writes", self.undo.len());

        let state = &mut *self.state;
        while let Some(entry) = self.undo.pop() {
            match entry {
                Undo::RemoveInteraction(pair) => {
                    state.interactions.remove(&pair);
                }
                Undo::RestoreInteraction(previous) => {
                    state
                        .interactions
                        .insert(key(&previous.actor_id, &previous.target_id), previous);
                }
                Undo::RemoveBlock(user_id, target_id) => {
                    if let Some(set) = state.blocks.get_mut(&user_id) {
                        set.remove(&target_id);
                    }
                }
                Undo::RestoreBlock(user_id, target_id) => {
                    state.blocks.entry(user_id).or_default().insert(target_id);
                }
                Undo::PopReport => {
                    state.reports.pop();
                }
            }
        }
    }
}

impl MemoryTx {
    fn transition(
        &mut self,
        actor_id: &str,
        target_id: &str,
        from: InteractionState,
        to: InteractionState,
    ) -> bool {
        match self.state.interactions.get_mut(&key(actor_id, target_id)) {
            Some(row) if row.state == from => {
                let previous = row.clone();
                row.state = to;
                self.undo.push(Undo::RestoreInteraction(previous));
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl RelationshipTx for MemoryTx {
    async fn find_interaction(
        &mut self,
        actor_id: &str,
        target_id: &str,
    ) -> Result<Option<Interaction>, StoreError> {
        Ok(self.state.interactions.get(&key(actor_id, target_id)).cloned())
    }

    async fn insert_interaction(&mut self, interaction: &Interaction) -> Result<(), StoreError> {
        let pair = key(&interaction.actor_id, &interaction.target_id);
        if self.state.interactions.contains_key(&pair) {
            return Err(StoreError::Duplicate(format!(
                "interaction {} -> {} already exists",
                interaction.actor_id, interaction.target_id
            )));
        }

        self.state.interactions.insert(pair.clone(), interaction.clone());
        self.undo.push(Undo::RemoveInteraction(pair));
        Ok(())
    }

    async fn mark_matched(&mut self, actor_id: &str, target_id: &str) -> Result<bool, StoreError> {
        Ok(self.transition(actor_id, target_id, InteractionState::Liked, InteractionState::Matched))
    }

    async fn clear_match(&mut self, actor_id: &str, target_id: &str) -> Result<bool, StoreError> {
        Ok(self.transition(actor_id, target_id, InteractionState::Matched, InteractionState::Unmatched))
    }

    async fn add_block(&mut self, user_id: &str, target_id: &str) -> Result<bool, StoreError> {
        let inserted = self
            .state
            .blocks
            .entry(user_id.to_string())
            .or_default()
            .insert(target_id.to_string());

        if inserted {
            self.undo.push(Undo::RemoveBlock(user_id.to_string(), target_id.to_string()));
        }
        Ok(inserted)
    }

    async fn remove_block(&mut self, user_id: &str, target_id: &str) -> Result<bool, StoreError> {
        let removed = self
            .state
            .blocks
            .get_mut(user_id)
            .map_or(false, |set| set.remove(target_id));

        if removed {
            self.undo.push(Undo::RestoreBlock(user_id.to_string(), target_id.to_string()));
        }
        Ok(removed)
    }

    async fn insert_report(&mut self, report: &Report) -> Result<(), StoreError> {
        self.state.reports.push(report.clone());
        self.undo.push(Undo::PopReport);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut unit = self;
        unit.undo.clear();
        Ok(())
    }
}

#[async_trait]
impl RelationshipStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn RelationshipTx>, StoreError> {
        let state = self.relationships.clone().lock_owned().await;
        Ok(Box::new(MemoryTx {
            state,
            undo: Vec::new(),
        }))
    }

    async fn is_matched(&self, user_a: &str, user_b: &str) -> Result<bool, StoreError> {
        let state = self.relationships.lock().await;
        Ok(pair_matched(
            state.interactions.get(&key(user_a, user_b)),
            state.interactions.get(&key(user_b, user_a)),
        ))
    }

    async fn interacted_targets(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let state = self.relationships.lock().await;
        let mut targets: Vec<String> = state
            .interactions
            .values()
            .filter(|row| row.actor_id == user_id)
            .map(|row| row.target_id.clone())
            .collect();
        targets.sort();
        Ok(targets)
    }

    async fn matched_partners(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let state = self.relationships.lock().await;
        let mut partners: Vec<String> = state
            .interactions
            .values()
            .filter(|row| row.actor_id == user_id && row.matched())
            .map(|row| row.target_id.clone())
            .collect();
        partners.sort();
        Ok(partners)
    }

    async fn blocked_users(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let state = self.relationships.lock().await;
        let mut blocked: Vec<String> = state
            .blocks
            .get(user_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        blocked.sort();
        Ok(blocked)
    }

    async fn is_blocked(&self, user_id: &str, target_id: &str) -> Result<bool, StoreError> {
        let state = self.relationships.lock().await;
        Ok(state
            .blocks
            .get(user_id)
            .map_or(false, |set| set.contains(target_id)))
    }

    async fn reports_for(&self, target_id: &str) -> Result<Vec<Report>, StoreError> {
        let state = self.relationships.lock().await;
        Ok(state
            .reports
            .iter()
            .filter(|report| report.target_id == target_id)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}

fn in_thread(message: &Message, user_a: &str, user_b: &str) -> bool {
    (message.sender_id == user_a && message.receiver_id == user_b)
        || (message.sender_id == user_b && message.receiver_id == user_a)
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert_message(&self, message: &Message) -> Result<(), StoreError> {
        self.messages.lock().await.push(message.clone());
        Ok(())
    }

    async fn mark_read(&self, sender_id: &str, receiver_id: &str) -> Result<u64, StoreError> {
        let mut messages = self.messages.lock().await;
        let mut updated = 0;
        for message in messages
            .iter_mut()
            .filter(|m| m.sender_id == sender_id && m.receiver_id == receiver_id && !m.read)
        {
            message.read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn conversation(
        &self,
        user_a: &str,
        user_b: &str,
        page: Page,
    ) -> Result<Vec<Message>, StoreError> {
        let messages = self.messages.lock().await;

        // Reverse insertion order first so equal timestamps keep newest-first
        let mut thread: Vec<Message> = messages
            .iter()
            .rev()
            .filter(|m| in_thread(m, user_a, user_b))
            .cloned()
            .collect();
        thread.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(thread
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>, StoreError> {
        let messages = self.messages.lock().await;
        let mut summaries: HashMap<String, ConversationSummary> = HashMap::new();

        for message in messages
            .iter()
            .filter(|m| m.sender_id == user_id || m.receiver_id == user_id)
        {
            let partner_id = if message.sender_id == user_id {
                message.receiver_id.clone()
            } else {
                message.sender_id.clone()
            };
            let unread = (message.receiver_id == user_id && !message.read) as i64;

            summaries
                .entry(partner_id.clone())
                .and_modify(|summary| {
                    if message.created_at >= summary.last_message.created_at {
                        summary.last_message = message.clone();
                    }
                    summary.unread_count += unread;
                })
                .or_insert_with(|| ConversationSummary {
                    partner_id,
                    last_message: message.clone(),
                    unread_count: unread,
                });
        }

        let mut summaries: Vec<ConversationSummary> = summaries.into_values().collect();
        summaries.sort_by(|a, b| b.last_message.created_at.cmp(&a.last_message.created_at));
        Ok(summaries)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn exists(&self, user_id: &str) -> Result<bool, DirectoryError> {
        Ok(self.users.read().await.contains(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dropped_unit_rolls_back_every_write() {
        let store = MemoryStore::new();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_interaction(&Interaction::new("1", "2", InteractionState::Liked))
                .await
                .unwrap();
            tx.add_block("1", "3").await.unwrap();
            tx.insert_report(&Report::new("1", "4", "spam")).await.unwrap();
            // dropped without commit
        }

        assert!(store.get_interaction("1", "2").await.is_none());
        assert!(!store.is_blocked("1", "3").await.unwrap());
        assert!(store.reports_for("4").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_restores_previous_state() {
        let store = MemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.insert_interaction(&Interaction::new("1", "2", InteractionState::Liked))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            assert!(tx.mark_matched("1", "2").await.unwrap());
        }

        let row = store.get_interaction("1", "2").await.unwrap();
        assert_eq!(row.state, InteractionState::Liked);
    }

    #[tokio::test]
    async fn test_insert_same_pair_twice_is_duplicate() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_interaction(&Interaction::new("1", "2", InteractionState::Liked))
            .await
            .unwrap();
        let err = tx
            .insert_interaction(&Interaction::new("1", "2", InteractionState::Disliked))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_state_transitions_only_apply_from_expected_state() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_interaction(&Interaction::new("1", "2", InteractionState::Disliked))
            .await
            .unwrap();

        assert!(!tx.mark_matched("1", "2").await.unwrap());
        assert!(!tx.clear_match("1", "2").await.unwrap());
        assert!(!tx.clear_match("9", "8").await.unwrap());
        tx.commit().await.unwrap();

        assert_eq!(
            store.get_interaction("1", "2").await.unwrap().state,
            InteractionState::Disliked
        );
    }

    #[tokio::test]
    async fn test_block_set_membership() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        assert!(tx.add_block("1", "2").await.unwrap());
        assert!(!tx.add_block("1", "2").await.unwrap());
        assert!(tx.add_block("1", "3").await.unwrap());
        assert!(tx.remove_block("1", "3").await.unwrap());
        assert!(!tx.remove_block("1", "3").await.unwrap());
        tx.commit().await.unwrap();

        assert_eq!(store.blocked_users("1").await.unwrap(), vec!["2".to_string()]);
        assert!(store.blocked_users("2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conversation_summaries() {
        let store = MemoryStore::new();
        store.insert_message(&Message::new("1", "2", "hi")).await.unwrap();
        store.insert_message(&Message::new("2", "1", "hello")).await.unwrap();
        store.insert_message(&Message::new("3", "1", "hey")).await.unwrap();

        let summaries = store.conversations("1").await.unwrap();
        assert_eq!(summaries.len(), 2);

        let with_two = summaries.iter().find(|s| s.partner_id == "2").unwrap();
        assert_eq!(with_two.last_message.content, "hello");
        assert_eq!(with_two.unread_count, 1);

        assert_eq!(store.mark_read("2", "1").await.unwrap(), 1);
        let summaries = store.conversations("1").await.unwrap();
        let with_two = summaries.iter().find(|s| s.partner_id == "2").unwrap();
        assert_eq!(with_two.unread_count, 0);
    }

    #[tokio::test]
    async fn test_directory_lookup() {
        let store = MemoryStore::new();
        store.add_users(["1", "2"]).await;
        assert!(store.exists("1").await.unwrap());
        assert!(!store.exists("3").await.unwrap());
    }
}
