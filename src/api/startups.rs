use actix_web::{web, HttpResponse};

use crate::models::{StartupListParams, StartupPageResponse, SubmitStartupRequest, SubmitStartupResponse, UpdateStartupRequest};
use crate::services::auth_service::Claims;
use crate::services::startup_service;
use crate::state::AppState;
use crate::utils::AppError;

/// GET /api/v1/startups - Public listing
#[utoipa::path(
    get,
    path = "/api/v1/startups",
    tag = "Startups",
    params(StartupListParams),
    responses(
        (status = 200, description = "Page of startups", body = StartupPageResponse),
        (status = 400, description = "Invalid filter, sort or page")
    )
)]
pub async fn list_startups(
    state: web::Data<AppState>,
    query: web::Query<StartupListParams>,
) -> Result<HttpResponse, AppError> {
    let response = startup_service::list_startups(state.store.as_ref(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// POST /api/v1/startups/applications/submit
#[utoipa::path(
    post,
    path = "/api/v1/startups/applications/submit",
    tag = "Startups",
    request_body = SubmitStartupRequest,
    responses(
        (status = 201, description = "Startup registered", body = SubmitStartupResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Application already submitted")
    ),
    security(("bearer_auth" = []))
)]
pub async fn submit_startup(
    user: Option<web::ReqData<Claims>>,
    state: web::Data<AppState>,
    request: web::Json<SubmitStartupRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = user.as_ref().map(|c| c.sub.clone());
    log::info!("🚀 POST /startups/applications/submit - user {:?}", user_id);

    let response = startup_service::submit_startup(
        &state.store,
        state.drafts.as_ref(),
        user_id.as_deref(),
        request.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Created().json(response))
}

/// GET /api/v1/startups/{id}
pub async fn get_startup(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let startup = startup_service::get_startup(state.store.as_ref(), &path).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "data": startup })))
}

/// GET /api/v1/startups/owner/{userId}
pub async fn get_startups_by_owner(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let startups = startup_service::startups_by_owner(state.store.as_ref(), &path).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": startups.len(),
        "data": startups
    })))
}

/// PATCH /api/v1/startups/{id} - Owner only
pub async fn update_startup(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    path: web::Path<String>,
    request: web::Json<UpdateStartupRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔧 PATCH /startups/{} - user {}", path, user.sub);
    let startup =
        startup_service::update_startup(state.store.as_ref(), &user.sub, &path, request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "data": startup })))
}

/// DELETE /api/v1/startups/{id} - Owner only
pub async fn delete_startup(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    log::info!("🗑️  DELETE /startups/{} - user {}", path, user.sub);
    startup_service::delete_startup(state.store.as_ref(), &user.sub, &path).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Startup deleted successfully"
    })))
}
