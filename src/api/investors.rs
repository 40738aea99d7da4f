use actix_web::{web, HttpResponse};

use crate::models::{InvestorDetails, InvestorListParams, InvestorListResponse, InvestorPageResponse};
use crate::services::{investor_details_service, investor_service};
use crate::state::AppState;
use crate::utils::AppError;

/// GET /api/v1/investors - Every investor, newest first
#[utoipa::path(
    get,
    path = "/api/v1/investors",
    tag = "Investors",
    responses(
        (status = 200, description = "All investors", body = InvestorListResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_investors(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    log::info!("📋 GET /investors");
    let response = investor_service::list_investors(state.store.as_ref()).await?;
    log::info!("✅ Listed {} investors", response.count);
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/v1/investors/paginated - Filtered, paginated listing
#[utoipa::path(
    get,
    path = "/api/v1/investors/paginated",
    tag = "Investors",
    params(InvestorListParams),
    responses(
        (status = 200, description = "Page of investors", body = InvestorPageResponse),
        (status = 400, description = "Invalid page or limit")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_investors_paginated(
    state: web::Data<AppState>,
    query: web::Query<InvestorListParams>,
) -> Result<HttpResponse, AppError> {
    let response = investor_service::list_investors_paginated(state.store.as_ref(), query.into_inner()).await?;
    log::info!(
        "✅ Investors page {}/{} ({} total)",
        response.pagination.current_page,
        response.pagination.total_pages,
        response.pagination.total_items
    );
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/v1/investors/{id}/details - Investor projection by user id or profile id
#[utoipa::path(
    get,
    path = "/api/v1/investors/{id}/details",
    tag = "Investors",
    params(("id" = String, Path, description = "User id or investor profile id")),
    responses(
        (status = 200, description = "Investor details", body = InvestorDetails),
        (status = 404, description = "No investor for this id")
    )
)]
pub async fn get_investor_details(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("🔎 GET investor details for {}", id);

    let details =
        investor_details_service::investor_details(state.store.as_ref(), state.storage.as_ref(), &id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": details
    })))
}
