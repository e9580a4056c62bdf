// Route exports
pub mod interactions;
pub mod messages;
pub mod moderation;

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::{error, web, FromRequest, HttpRequest, HttpResponse, Responder};
use std::future::{ready, Ready};
use validator::ValidationErrors;

use crate::core::Engine;
use crate::models::{ErrorResponse, HealthResponse};

/// Header the identity gateway sets on every authenticated request
pub const CALLER_HEADER: &str = "X-User-Id";

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    /// Page size for conversation reads without an explicit limit
    pub page_size: u32,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .configure(interactions::configure)
            .configure(moderation::configure)
            .configure(messages::configure),
    );
}

/// Authenticated caller, trusted as given by the upstream gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

impl CallerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequest for CallerId {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let caller = req
            .headers()
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        ready(match caller {
            Some(id) => Ok(CallerId(id.to_string())),
            None => Err(error_response(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                format!("Missing {} header", CALLER_HEADER),
            )),
        })
    }
}

fn error_response(status: StatusCode, code: &str, message: String) -> actix_web::Error {
    let response = HttpResponse::build(status).json(ErrorResponse {
        error: code.to_string(),
        message: message.clone(),
        status_code: status.as_u16(),
    });
    error::InternalError::from_response(message, response).into()
}

/// 400 in the engine's error shape for request bodies that fail validation
pub(crate) fn validation_failed(errors: ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "validation_error".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    error_response(
        StatusCode::BAD_REQUEST,
        "invalid_json",
        format!("Invalid JSON: {}", err),
    )
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    error_response(
        StatusCode::BAD_REQUEST,
        "invalid_query",
        format!("Invalid query: {}", err),
    )
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let status = if state.engine.health_check().await {
        "healthy"
    } else {
        "degraded"
    };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}
