// Route exports
pub mod activity;
pub mod favorites;

use crate::core::{CoordinatorContext, CoordinatorError, UiEvent};
use crate::models::{ErrorResponse, Session, ToggleErrorResponse};
use crate::services::{AuthError, StoreError, TokenVerifier};
use actix_web::{dev::Payload, http::StatusCode, web, FromRequest, HttpRequest, HttpResponse};
use std::future::{ready, Ready};
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub context: CoordinatorContext,
    pub verifier: Arc<TokenVerifier>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(favorites::configure)
            .configure(activity::configure),
    );
}

/// Authentication failure rendered as an `ErrorResponse`
#[derive(Debug)]
pub struct Unauthorized(AuthError);

impl std::fmt::Display for Unauthorized {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl actix_web::ResponseError for Unauthorized {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Unauthorized().json(ErrorResponse {
            error: "unauthorized".to_string(),
            message: self.0.to_string(),
            status_code: 401,
            retryable: false,
        })
    }
}

/// Sessions are taken from the `Authorization: Bearer` header
impl FromRequest for Session {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>() else {
            tracing::error!("AppState missing from app data");
            return ready(Err(actix_web::error::ErrorInternalServerError(
                "application state not configured",
            )));
        };

        let header = req
            .headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        ready(state.verifier.verify_header(header).map_err(|e| {
            tracing::info!("Rejected request to {}: {}", req.path(), e);
            Unauthorized(e).into()
        }))
    }
}

fn error_status(err: &CoordinatorError) -> StatusCode {
    match err {
        CoordinatorError::SelfFavorite | CoordinatorError::SelfBlock => StatusCode::BAD_REQUEST,
        CoordinatorError::Blocked(_) => StatusCode::FORBIDDEN,
        CoordinatorError::ToggleInFlight(_) => StatusCode::CONFLICT,
        CoordinatorError::Store(e) if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
        CoordinatorError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        CoordinatorError::Store(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_body(err: &CoordinatorError, status: StatusCode) -> ErrorResponse {
    ErrorResponse {
        error: err.code().to_string(),
        message: err.to_string(),
        status_code: status.as_u16(),
        retryable: err.is_retryable(),
    }
}

/// Map a coordinator error onto an HTTP response
pub fn error_response(err: &CoordinatorError) -> HttpResponse {
    let status = error_status(err);
    HttpResponse::build(status).json(error_body(err, status))
}

/// Like [`error_response`], also shipping the UI events collected so far
pub fn error_response_with_events(err: &CoordinatorError, events: Vec<UiEvent>) -> HttpResponse {
    let status = error_status(err);
    HttpResponse::build(status).json(ToggleErrorResponse {
        error: error_body(err, status),
        events,
    })
}

/// Reject a request body that fails validation
pub fn validation_response(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
        retryable: false,
    })
}
