use crate::core::{Badge, CollectingSink, NoopSink};
use crate::models::{
    FavoriteStatusResponse, FavoritesResponse, HealthResponse, ListQuery, PulseResponse, Session,
    TargetRequest, ToggleResponse,
};
use crate::routes::{error_response, error_response_with_events, validation_response, AppState};
use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

/// Configure favorite and pulse routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/favorites", web::get().to(list_favorites))
        .route("/favorites/toggle", web::post().to(toggle_favorite))
        .route("/favorites/{target_user_id}", web::get().to(favorite_status))
        .route("/pulse", web::get().to(load_pulse));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = match state.context.store.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            tracing::warn!("Store health check failed: {}", e);
            false
        }
    };

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Toggle favorite endpoint
///
/// POST /api/v1/favorites/toggle
///
/// Request body:
/// ```json
/// { "targetUserId": "string" }
/// ```
async fn toggle_favorite(
    state: web::Data<AppState>,
    session: Session,
    req: web::Json<TargetRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_response(errors);
    }

    let sink = Arc::new(CollectingSink::new());
    let coordinator = state.context.coordinator(session, sink.clone());

    match coordinator.toggle_favorite(&req.target_user_id).await {
        Ok(outcome) => HttpResponse::Ok().json(ToggleResponse {
            target_user_id: outcome.target_id,
            favorited: outcome.state.is_favorited(),
            mutual_match: outcome.mutual_match.is_some(),
            pulse_count: outcome.mutual_match.map(|m| m.pulse_count),
            events: sink.events(),
        }),
        Err(e) => error_response_with_events(&e, sink.events()),
    }
}

/// Initial favorite state for one card
///
/// GET /api/v1/favorites/{targetUserId}
async fn favorite_status(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
) -> impl Responder {
    let target_user_id = path.into_inner();
    let coordinator = state.context.coordinator(session, Arc::new(NoopSink));

    match coordinator.is_favorite(&target_user_id).await {
        Ok(favorited) => HttpResponse::Ok().json(FavoriteStatusResponse {
            target_user_id,
            favorited,
        }),
        Err(e) => error_response(&e),
    }
}

/// The caller's favorites, newest first
///
/// GET /api/v1/favorites?limit=25
async fn list_favorites(
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<ListQuery>,
) -> impl Responder {
    let coordinator = state.context.coordinator(session, Arc::new(NoopSink));

    match coordinator.list_favorites(query.capped()).await {
        Ok(favorites) => HttpResponse::Ok().json(FavoritesResponse {
            count: favorites.len(),
            favorites,
        }),
        Err(e) => error_response(&e),
    }
}

/// Pulse count and badge
///
/// GET /api/v1/pulse
async fn load_pulse(state: web::Data<AppState>, session: Session) -> impl Responder {
    let sink = Arc::new(CollectingSink::new());
    let coordinator = state.context.coordinator(session, sink.clone());

    match coordinator.load_pulse_count().await {
        Ok(count) => {
            let badge: Option<Badge> = sink.board().pulse().cloned();
            HttpResponse::Ok().json(PulseResponse {
                count,
                html: badge.as_ref().map(Badge::to_html),
                badge,
            })
        }
        Err(e) => error_response(&e),
    }
}
