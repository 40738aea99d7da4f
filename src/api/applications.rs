use actix_web::{web, HttpResponse};
use serde_json::{Map, Value};

use crate::models::{ProgressView, StepSaveResponse};
use crate::services::auth_service::Claims;
use crate::services::{application_service, wizard_service};
use crate::state::AppState;
use crate::utils::AppError;

fn session(user: &Option<web::ReqData<Claims>>) -> Option<String> {
    user.as_ref().map(|c| c.sub.clone())
}

/// POST /api/v1/applications/start
pub async fn start_application(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let response = application_service::start_application(
        state.store.as_ref(),
        &user.sub,
        state.config.application_ttl_days,
    )
    .await?;
    Ok(HttpResponse::Created().json(response))
}

/// GET /api/v1/applications/{userId}
pub async fn list_applications(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let response = application_service::list_applications(state.store.as_ref(), &user.sub, &path).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/v1/applications/application/{userId}/{appId}
pub async fn get_application(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (user_id, application_id) = path.into_inner();
    let response = application_service::application_detail(
        state.store.as_ref(),
        state.drafts.as_ref(),
        &user.sub,
        &user_id,
        &application_id,
    )
    .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// PATCH /api/v1/applications/complete/{appId}
pub async fn complete_application(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let response =
        application_service::complete_application(state.store.as_ref(), state.drafts.as_ref(), &user.sub, &path)
            .await?;
    Ok(HttpResponse::Ok().json(response))
}

// ==================== WIZARD ====================

/// GET /api/v1/applications/{appId}/progress
#[utoipa::path(
    get,
    path = "/api/v1/applications/{appId}/progress",
    tag = "Applications",
    params(("appId" = String, Path, description = "Application id")),
    responses(
        (status = 200, description = "Wizard state", body = ProgressView),
        (status = 400, description = "No session"),
        (status = 404, description = "Unknown application")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_progress(
    user: Option<web::ReqData<Claims>>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let progress = wizard_service::load_progress(
        state.store.as_ref(),
        state.drafts.as_ref(),
        session(&user).as_deref(),
        &path,
    )
    .await?;
    Ok(HttpResponse::Ok().json(progress))
}

/// PUT /api/v1/applications/{appId}/steps/{step} - Autosave
#[utoipa::path(
    put,
    path = "/api/v1/applications/{appId}/steps/{step}",
    tag = "Applications",
    params(
        ("appId" = String, Path, description = "Application id"),
        ("step" = String, Path, description = "personal, organization, financial, banking, documents or review")
    ),
    responses(
        (status = 200, description = "Step saved as pending", body = StepSaveResponse),
        (status = 409, description = "Application is read-only")
    ),
    security(("bearer_auth" = []))
)]
pub async fn autosave_step(
    user: Option<web::ReqData<Claims>>,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<Map<String, Value>>,
) -> Result<HttpResponse, AppError> {
    let (application_id, step) = path.into_inner();
    let response = wizard_service::autosave_step(
        state.store.as_ref(),
        state.drafts.as_ref(),
        session(&user).as_deref(),
        &application_id,
        &step,
        body.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// POST /api/v1/applications/{appId}/steps/{step}/complete
pub async fn complete_step(
    user: Option<web::ReqData<Claims>>,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<Map<String, Value>>,
) -> Result<HttpResponse, AppError> {
    let (application_id, step) = path.into_inner();
    log::info!("🧭 Completing step {} of application {}", step, application_id);

    let response = wizard_service::complete_step(
        state.store.as_ref(),
        state.drafts.as_ref(),
        session(&user).as_deref(),
        &application_id,
        &step,
        body.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// DELETE /api/v1/applications/{appId}/drafts
pub async fn clear_drafts(
    user: Option<web::ReqData<Claims>>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let removed = wizard_service::clear_drafts(
        state.store.as_ref(),
        state.drafts.as_ref(),
        session(&user).as_deref(),
        &path,
    )
    .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "removed": removed
    })))
}
