use actix_web::{web, HttpResponse};

use crate::error::EngineError;
use crate::models::{AckResponse, ReportRequest, ReportResponse, UserListResponse};
use crate::routes::{AppState, CallerId};

/// Configure block and report routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/block/{target_id}", web::post().to(block))
        .route("/block/{target_id}", web::delete().to(unblock))
        .route("/blocks", web::get().to(list_blocked))
        .route("/report/{target_id}", web::post().to(report));
}

/// POST /api/v1/block/{target_id}
async fn block(
    state: web::Data<AppState>,
    caller: CallerId,
    path: web::Path<String>,
) -> Result<HttpResponse, EngineError> {
    state.engine.moderation.block(caller.as_str(), &path).await?;
    Ok(HttpResponse::Ok().json(AckResponse::new("User blocked successfully")))
}

/// DELETE /api/v1/block/{target_id}
async fn unblock(
    state: web::Data<AppState>,
    caller: CallerId,
    path: web::Path<String>,
) -> Result<HttpResponse, EngineError> {
    state.engine.moderation.unblock(caller.as_str(), &path).await?;
    Ok(HttpResponse::Ok().json(AckResponse::new("User unblocked successfully")))
}

/// GET /api/v1/blocks
async fn list_blocked(
    state: web::Data<AppState>,
    caller: CallerId,
) -> Result<HttpResponse, EngineError> {
    let blocked = state.engine.moderation.blocked_users(caller.as_str()).await?;
    Ok(HttpResponse::Ok().json(UserListResponse::new(caller.as_str(), blocked)))
}

/// POST /api/v1/report/{target_id}
///
/// Request body:
/// ```json
/// { "reason": "string" }
/// ```
///
/// Self-reports fail before the reason is looked at.
async fn report(
    state: web::Data<AppState>,
    caller: CallerId,
    path: web::Path<String>,
    req: web::Json<ReportRequest>,
) -> Result<HttpResponse, EngineError> {
    let report = state
        .engine
        .moderation
        .report(caller.as_str(), &path, &req.reason)
        .await?;

    Ok(HttpResponse::Created().json(ReportResponse {
        success: true,
        message: "User reported successfully".to_string(),
        report,
    }))
}
