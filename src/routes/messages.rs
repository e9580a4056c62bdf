use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::error::EngineError;
use crate::models::{ConversationQuery, Page, SendMessageRequest};
use crate::routes::{validation_failed, AppState, CallerId};

/// Configure messaging routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/messages", web::post().to(send_message))
        .route("/messages/{user_id}", web::get().to(get_conversation))
        .route("/conversations", web::get().to(list_conversations));
}

/// POST /api/v1/messages
///
/// Request body:
/// ```json
/// { "receiverId": "string", "content": "string" }
/// ```
async fn send_message(
    state: web::Data<AppState>,
    caller: CallerId,
    req: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, EngineError> {
    if let Err(errors) = req.validate() {
        return Ok(validation_failed(errors));
    }

    let message = state
        .engine
        .gate
        .send_message(caller.as_str(), &req.receiver_id, &req.content)
        .await?;

    Ok(HttpResponse::Created().json(message))
}

/// GET /api/v1/messages/{user_id}?page=1&limit=20
async fn get_conversation(
    state: web::Data<AppState>,
    caller: CallerId,
    path: web::Path<String>,
    query: web::Query<ConversationQuery>,
) -> Result<HttpResponse, EngineError> {
    if let Err(errors) = query.validate() {
        return Ok(validation_failed(errors));
    }

    let page = Page::new(query.page, query.limit.unwrap_or(state.page_size));
    let messages = state
        .engine
        .gate
        .get_conversation(caller.as_str(), &path, page)
        .await?;

    Ok(HttpResponse::Ok().json(messages))
}

/// GET /api/v1/conversations
async fn list_conversations(
    state: web::Data<AppState>,
    caller: CallerId,
) -> Result<HttpResponse, EngineError> {
    let conversations = state.engine.gate.list_conversations(caller.as_str()).await?;
    Ok(HttpResponse::Ok().json(conversations))
}
