use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::models::{DocumentListResponse, DocumentUploadResponse, ReviewDocumentRequest, UploadDocumentRequest};
use crate::services::auth_service::Claims;
use crate::services::document_service;
use crate::services::storage_service::UrlSigner;
use crate::state::AppState;
use crate::utils::AppError;

/// POST /api/v1/investments/documents/upload
#[utoipa::path(
    post,
    path = "/api/v1/investments/documents/upload",
    tag = "Documents",
    request_body = UploadDocumentRequest,
    responses(
        (status = 201, description = "Document stored", body = DocumentUploadResponse),
        (status = 404, description = "Caller has no investor profile")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_document(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    request: web::Json<UploadDocumentRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📤 POST /investments/documents/upload - user {}", user.sub);
    let response =
        document_service::upload_document(&state.store, &state.storage, &user.sub, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(response))
}

/// GET /api/v1/investments/documents
#[utoipa::path(
    get,
    path = "/api/v1/investments/documents",
    tag = "Documents",
    responses((status = 200, description = "Caller's documents with signed URLs", body = DocumentListResponse)),
    security(("bearer_auth" = []))
)]
pub async fn list_documents(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let response =
        document_service::list_documents(state.store.as_ref(), state.storage.as_ref(), &user.sub).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// PUT /api/v1/investments/documents/{documentId}/status
pub async fn review_document(
    user: web::ReqData<Claims>,
    state: web::Data<AppState>,
    path: web::Path<String>,
    request: web::Json<ReviewDocumentRequest>,
) -> Result<HttpResponse, AppError> {
    let document =
        document_service::review_document(state.store.as_ref(), &user.sub, &path, request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Document status updated successfully",
        "document": document
    })))
}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub token: String,
}

/// GET /api/v1/files/{key}?token=... - Signed file download
pub async fn serve_file(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<FileQuery>,
) -> Result<HttpResponse, AppError> {
    let key = path.into_inner();
    let storage = &state.config.storage;
    let signer = UrlSigner::new(
        state.config.jwt.secret.clone(),
        storage.signed_url_ttl_secs,
        storage.public_base_url.clone(),
    );

    let object = document_service::serve_file(state.storage.as_ref(), &signer, &key, &query.token).await?;
    Ok(HttpResponse::Ok()
        .content_type(object.mime_type)
        .insert_header(("Cache-Control", "private, max-age=60"))
        .body(object.bytes))
}
