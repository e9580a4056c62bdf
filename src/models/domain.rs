use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A one-directional preference signal sent by an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Like,
    Dislike,
}

impl Signal {
    pub fn is_like(self) -> bool {
        matches!(self, Signal::Like)
    }
}

/// Persisted state of one ordered (actor, target) pair.
///
/// A pair with no row is the implicit "no interaction" state. `Unmatched` keeps
/// the original like on record so discovery still treats the pair as evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "interaction_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InteractionState {
    Liked,
    Disliked,
    Matched,
    Unmatched,
}

impl InteractionState {
    /// A pending like that a reverse like can still turn into a match
    pub fn awaiting_match(self) -> bool {
        matches!(self, InteractionState::Liked)
    }

    pub fn matched(self) -> bool {
        matches!(self, InteractionState::Matched)
    }
}

/// Directed interaction record, unique per (actor_id, target_id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Interaction {
    #[serde(rename = "actorId")]
    pub actor_id: String,
    #[serde(rename = "targetId")]
    pub target_id: String,
    pub state: InteractionState,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Interaction {
    pub fn new(actor_id: &str, target_id: &str, state: InteractionState) -> Self {
        Self {
            actor_id: actor_id.to_string(),
            target_id: target_id.to_string(),
            state,
            created_at: Utc::now(),
        }
    }

    pub fn awaiting_match(&self) -> bool {
        self.state.awaiting_match()
    }

    pub fn matched(&self) -> bool {
        self.state.matched()
    }
}

/// What the actor learns about their own signal after recording it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionOutcome {
    pub liked: bool,
    pub matched: bool,
}

/// Append-only moderation report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Report {
    pub id: Uuid,
    #[serde(rename = "reporterId")]
    pub reporter_id: String,
    #[serde(rename = "targetId")]
    pub target_id: String,
    pub reason: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn new(reporter_id: &str, target_id: &str, reason: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            reporter_id: reporter_id.to_string(),
            target_id: target_id.to_string(),
            reason: reason.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// A chat message between two matched users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    #[serde(rename = "senderId")]
    pub sender_id: String,
    #[serde(rename = "receiverId")]
    pub receiver_id: String,
    pub content: String,
    pub read: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(sender_id: &str, receiver_id: &str, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            content: content.to_string(),
            read: false,
            created_at: Utc::now(),
        }
    }
}

/// One row of a user's conversation overview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    #[serde(rename = "partnerId")]
    pub partner_id: String,
    #[serde(rename = "lastMessage")]
    pub last_message: Message,
    #[serde(rename = "unreadCount")]
    pub unread_count: i64,
}

/// 1-based page of a message thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Match,
    Like,
    Message,
}

/// Event handed to the notification dispatcher after a commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "fromUserId")]
    pub from_user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Longest message preview carried in a message notification
const PREVIEW_CHARS: usize = 50;

impl Notification {
    pub fn matched(user_id: &str, partner_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            from_user_id: partner_id.to_string(),
            kind: NotificationKind::Match,
            title: "New Match!".to_string(),
            message: "You have a new match! Start chatting now.".to_string(),
            data: serde_json::json!({ "matchedUserId": partner_id, "action": "view_match" }),
            created_at: Utc::now(),
        }
    }

    pub fn liked(target_id: &str, liker_id: &str) -> Self {
        Self {
            user_id: target_id.to_string(),
            from_user_id: liker_id.to_string(),
            kind: NotificationKind::Like,
            title: "Someone Liked You!".to_string(),
            message: "Someone liked your profile".to_string(),
            data: serde_json::json!({ "likerId": liker_id, "action": "view_profile" }),
            created_at: Utc::now(),
        }
    }

    pub fn message(receiver_id: &str, sender_id: &str, content: &str) -> Self {
        let mut preview: String = content.chars().take(PREVIEW_CHARS).collect();
        if content.chars().count() > PREVIEW_CHARS {
            preview.push_str("...");
        }

        Self {
            user_id: receiver_id.to_string(),
            from_user_id: sender_id.to_string(),
            kind: NotificationKind::Message,
            title: "New Message".to_string(),
            message: "You have a new message".to_string(),
            data: serde_json::json!({
                "senderId": sender_id,
                "messagePreview": preview,
                "action": "view_chat",
            }),
            created_at: Utc::now(),
        }
    }
}
