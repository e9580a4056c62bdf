use actix_web::{web, HttpResponse};

use crate::error::EngineError;
use crate::models::{AckResponse, InteractionResponse, Signal, UserListResponse};
use crate::routes::{AppState, CallerId};

/// Configure like / dislike / unmatch routes and match listings
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/like/{target_id}", web::post().to(like))
        .route("/dislike/{target_id}", web::post().to(dislike))
        .route("/unmatch/{user_id}", web::post().to(unmatch))
        .route("/matches", web::get().to(list_matches))
        .route("/exclusions", web::get().to(exclusions));
}

async fn record(
    state: &AppState,
    caller: &CallerId,
    target_id: &str,
    signal: Signal,
) -> Result<HttpResponse, EngineError> {
    let outcome = state
        .engine
        .recorder
        .record(caller.as_str(), target_id, signal)
        .await?;

    Ok(HttpResponse::Ok().json(InteractionResponse::from(outcome)))
}

/// POST /api/v1/like/{target_id}
async fn like(
    state: web::Data<AppState>,
    caller: CallerId,
    path: web::Path<String>,
) -> Result<HttpResponse, EngineError> {
    record(&state, &caller, &path, Signal::Like).await
}

/// POST /api/v1/dislike/{target_id}
async fn dislike(
    state: web::Data<AppState>,
    caller: CallerId,
    path: web::Path<String>,
) -> Result<HttpResponse, EngineError> {
    record(&state, &caller, &path, Signal::Dislike).await
}

/// POST /api/v1/unmatch/{user_id}
async fn unmatch(
    state: web::Data<AppState>,
    caller: CallerId,
    path: web::Path<String>,
) -> Result<HttpResponse, EngineError> {
    state.engine.unmatcher.unmatch(caller.as_str(), &path).await?;
    Ok(HttpResponse::Ok().json(AckResponse::new("Unmatched successfully")))
}

/// GET /api/v1/matches
async fn list_matches(
    state: web::Data<AppState>,
    caller: CallerId,
) -> Result<HttpResponse, EngineError> {
    let partners = state.engine.list_matches(caller.as_str()).await?;
    Ok(HttpResponse::Ok().json(UserListResponse::new(caller.as_str(), partners)))
}

/// GET /api/v1/exclusions
///
/// Users candidate discovery must skip for the caller.
async fn exclusions(
    state: web::Data<AppState>,
    caller: CallerId,
) -> Result<HttpResponse, EngineError> {
    let excluded = state.engine.discovery_exclusions(caller.as_str()).await?;
    Ok(HttpResponse::Ok().json(UserListResponse::new(
        caller.as_str(),
        excluded.into_iter().collect(),
    )))
}
