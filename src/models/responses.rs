use serde::{Deserialize, Serialize};
use crate::models::domain::{InteractionOutcome, Report};

/// Response for like / dislike endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionResponse {
    pub success: bool,
    pub liked: bool,
    pub matched: bool,
}

impl From<InteractionOutcome> for InteractionResponse {
    fn from(outcome: InteractionOutcome) -> Self {
        Self {
            success: true,
            liked: outcome.liked,
            matched: outcome.matched,
        }
    }
}

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
    pub message: String,
}

impl AckResponse {
    pub fn new(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
        }
    }
}

/// Response for the report endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResponse {
    pub success: bool,
    pub message: String,
    pub report: Report,
}

/// List of user IDs related to the caller (matches, blocks, exclusions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "userIds")]
    pub user_ids: Vec<String>,
    pub count: usize,
}

impl UserListResponse {
    pub fn new(user_id: &str, user_ids: Vec<String>) -> Self {
        Self {
            user_id: user_id.to_string(),
            count: user_ids.len(),
            user_ids,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
