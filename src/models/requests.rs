use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to send a message to a matched user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "receiver_id", rename = "receiverId")]
    pub receiver_id: String,
    /// Upper bound is enforced by the engine's configured limits
    #[validate(length(min = 1))]
    pub content: String,
}

/// Request body for reporting a user.
///
/// The reason is checked by the engine, after the self-report check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    pub reason: String,
}

/// Pagination query for a message thread.
///
/// A missing `limit` falls back to the configured page size; oversized
/// limits are capped by the engine rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConversationQuery {
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u32,
    #[validate(range(min = 1))]
    pub limit: Option<u32>,
}

fn default_page() -> u32 {
    1
}
