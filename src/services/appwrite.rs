use crate::models::Notification;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with Appwrite
#[derive(Debug, Error)]
pub enum AppwriteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Unauthorized: invalid API key or token")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl AppwriteError {
    /// Network failures and unexpected statuses are worth retrying by the caller
    pub fn is_transient(&self) -> bool {
        matches!(self, AppwriteError::RequestError(_) | AppwriteError::ApiError(_))
    }
}

/// Appwrite API client
///
/// Used for the two collaborators the engine does not own:
/// - existence lookups against the user profile collection
/// - writing notification documents for match, like and message events
pub struct AppwriteClient {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: AppwriteCollections,
}

/// Collection IDs in Appwrite
#[derive(Debug, Clone)]
pub struct AppwriteCollections {
    pub user_profiles: String,
    pub notifications: String,
}

impl AppwriteClient {
    /// Create a new Appwrite client
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: AppwriteCollections,
        timeout: Duration,
    ) -> Result<Self, AppwriteError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            client,
            collections,
        })
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            collection
        )
    }

    /// Check whether a profile document exists for the given user ID
    pub async fn user_exists(&self, user_id: &str) -> Result<bool, AppwriteError> {
        let quoted = serde_json::to_string(user_id)
            .map_err(|e| AppwriteError::InvalidResponse(e.to_string()))?;
        let queries = vec![
            format!("equal(\"userId\", [{}])", quoted),
            "limit(1)".to_string(),
        ];
        let queries_json = serde_json::to_string(&queries)
            .map_err(|e| AppwriteError::InvalidResponse(e.to_string()))?;

        let url = format!(
            "{}?query={}",
            self.documents_url(&self.collections.user_profiles),
            urlencoding::encode(&queries_json)
        );

        tracing::debug!("Checking profile existence for user: {}", user_id);

        let response = self
            .client
            .get(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AppwriteError::Unauthorized);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(AppwriteError::ApiError(format!(
                "Failed to look up profile: {}",
                status
            )));
        }

        let json: Value = response.json().await?;

        let documents = json
            .get("documents")
            .and_then(|d| d.as_array())
            .ok_or_else(|| AppwriteError::InvalidResponse("Missing documents array".into()))?;

        Ok(!documents.is_empty())
    }

    /// Write a notification document for the recipient
    pub async fn create_notification(&self, notification: &Notification) -> Result<(), AppwriteError> {
        let payload = serde_json::json!({
            "documentId": uuid::Uuid::new_v4().to_string(),
            "data": {
                "userId": notification.user_id,
                "fromUserId": notification.from_user_id,
                "type": notification.kind,
                "title": notification.title,
                "message": notification.message,
                "data": notification.data.to_string(),
                "read": false,
                "createdAt": notification.created_at,
            },
        });

        let response = self
            .client
            .post(self.documents_url(&self.collections.notifications))
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppwriteError::ApiError(format!(
                "Failed to create notification: {}",
                response.status()
            )));
        }

        tracing::debug!(
            "Created {:?} notification for {} from {}",
            notification.kind,
            notification.user_id,
            notification.from_user_id
        );

        Ok(())
    }
}
