use actix_web::{web, HttpResponse};

use crate::models::{RegisterInvestorRequest, RegisterInvestorResponse};
use crate::services::auth_service::Claims;
use crate::services::{investment_service, investor_service};
use crate::state::AppState;
use crate::utils::AppError;

/// POST /api/v1/investments/become-a-investor - Investor registration
#[utoipa::path(
    post,
    path = "/api/v1/investments/become-a-investor",
    tag = "Investments",
    request_body = RegisterInvestorRequest,
    responses(
        (status = 201, description = "Investor registered", body = RegisterInvestorResponse),
        (status = 400, description = "Missing or invalid fields, unverified user"),
        (status = 409, description = "Investor profile already exists"),
        (status = 500, description = "A storage step failed; earlier writes were undone")
    ),
    security(("bearer_auth" = []))
)]
pub async fn register_investor(
    user: Option<web::ReqData<Claims>>,
    state: web::Data<AppState>,
    request: web::Json<RegisterInvestorRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = user.as_ref().map(|c| c.sub.clone());
    log::info!("📝 POST /investments/become-a-investor - user {:?}", user_id);

    let response = investor_service::register_investor(&state.store, user_id.as_deref(), request.into_inner()).await?;

    log::info!("✅ Investor {} registered", response.data.investor_id);
    Ok(HttpResponse::Created().json(response))
}

/// GET /api/v1/investments/check-investor-exists
pub async fn check_investor_exists(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let response = investor_service::check_investor_exists(state.store.as_ref(), &user.sub).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/v1/investments/investor-application/{userId}
pub async fn get_investor_application(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    if user.sub != user_id {
        return Err(AppError::Forbidden("You can only view your own application".to_string()));
    }

    let application = investor_service::investor_application(state.store.as_ref(), &user_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": application
    })))
}

/// POST /api/v1/investments/{startupId} - Apply to a startup
pub async fn apply_to_startup(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let startup_id = path.into_inner();
    log::info!("💼 POST /investments/{} - investor {}", startup_id, user.sub);

    let response = investment_service::apply_to_startup(state.store.as_ref(), &user.sub, &startup_id).await?;
    Ok(HttpResponse::Created().json(response))
}

/// GET /api/v1/investments - Startups the caller applied to
pub async fn my_investments(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let response = investment_service::my_investments(state.store.as_ref(), &user.sub).await?;
    log::info!("✅ {} investment(s) for {}", response.count, user.sub);
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/v1/investments/{startupId} - Investors of a startup
pub async fn startup_investments(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let response = investment_service::startup_investments(state.store.as_ref(), &path).await?;
    Ok(HttpResponse::Ok().json(response))
}
