use crate::core::{Badge, CoordinatorError};
use crate::models::{
    BlocksResponse, ListQuery, NotificationsResponse, RecordVisitRequest, Session, TargetRequest,
    VisitorsResponse,
};
use crate::routes::{error_response, validation_response, AppState};
use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

/// Configure notification, block and visitor routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/notifications", web::get().to(list_notifications))
        .route("/notifications/read", web::post().to(mark_notifications_read))
        .route("/blocks", web::get().to(list_blocks))
        .route("/blocks", web::post().to(block_user))
        .route("/blocks/{target_user_id}", web::delete().to(unblock_user))
        .route("/visits", web::post().to(record_visit))
        .route("/visitors", web::get().to(list_visitors));
}

/// GET /api/v1/notifications?limit=25
async fn list_notifications(
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<ListQuery>,
) -> impl Responder {
    let activity = state.context.activity(session);

    let notifications = match activity.list_notifications(query.capped()).await {
        Ok(n) => n,
        Err(e) => return error_response(&e),
    };
    let unread_count = match activity.unread_count().await {
        Ok(count) => count,
        Err(e) => return error_response(&e),
    };

    HttpResponse::Ok().json(NotificationsResponse {
        notifications,
        unread_count,
        badge: Badge::unread(unread_count),
    })
}

/// POST /api/v1/notifications/read
async fn mark_notifications_read(state: web::Data<AppState>, session: Session) -> impl Responder {
    match state.context.activity(session).mark_all_read().await {
        Ok(updated) => HttpResponse::Ok().json(serde_json::json!({ "updated": updated })),
        Err(e) => error_response(&e),
    }
}

/// GET /api/v1/blocks
async fn list_blocks(state: web::Data<AppState>, session: Session) -> impl Responder {
    match state.context.blocks().blocked_ids(&session.user_id).await {
        Ok(ids) => HttpResponse::Ok().json(BlocksResponse {
            count: ids.len(),
            blocked_user_ids: ids,
        }),
        Err(e) => error_response(&CoordinatorError::from(e)),
    }
}

/// POST /api/v1/blocks
///
/// Request body:
/// ```json
/// { "targetUserId": "string" }
/// ```
async fn block_user(
    state: web::Data<AppState>,
    session: Session,
    req: web::Json<TargetRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_response(errors);
    }

    match state.context.blocks().block(&session, &req.target_user_id).await {
        Ok(outcome) => HttpResponse::Ok().json(serde_json::json!({
            "targetUserId": req.target_user_id,
            "blocked": true,
            "created": outcome.created(),
        })),
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/v1/blocks/{targetUserId}
async fn unblock_user(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<String>,
) -> impl Responder {
    let target_user_id = path.into_inner();

    match state.context.blocks().unblock(&session, &target_user_id).await {
        Ok(existed) => HttpResponse::Ok().json(serde_json::json!({
            "targetUserId": target_user_id,
            "blocked": false,
            "existed": existed,
        })),
        Err(e) => error_response(&e),
    }
}

/// POST /api/v1/visits
///
/// Request body:
/// ```json
/// { "profileUserId": "string" }
/// ```
async fn record_visit(
    state: web::Data<AppState>,
    session: Session,
    req: web::Json<RecordVisitRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_response(errors);
    }

    match state.context.activity(session).record_visit(&req.profile_user_id).await {
        Ok(visit) => HttpResponse::Ok().json(serde_json::json!({
            "recorded": visit.is_some(),
            "visit": visit,
        })),
        Err(e) => error_response(&e),
    }
}

/// GET /api/v1/visitors?limit=25
async fn list_visitors(
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<ListQuery>,
) -> impl Responder {
    match state.context.activity(session).list_visitors(query.capped()).await {
        Ok(visitors) => HttpResponse::Ok().json(VisitorsResponse {
            count: visitors.len(),
            visitors,
        }),
        Err(e) => error_response(&e),
    }
}
