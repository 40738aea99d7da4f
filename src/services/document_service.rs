use base64::Engine;
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;

use crate::database::Store;
use crate::models::{
    Document, DocumentListResponse, DocumentReview, DocumentType, DocumentUploadResponse, DocumentView,
    OwnerKind, ReviewDecision, ReviewDocumentRequest, ReviewStatus, UploadDocumentRequest,
};
use crate::services::investor_details_service::sign_documents;
use crate::services::saga::Saga;
use crate::services::storage_service::{ObjectStorage, StoredObject, UrlSigner};
use crate::utils::validation::{present, RequiredFields};
use crate::utils::AppError;

const DEFAULT_MIME_TYPE: &str = "application/pdf";

fn file_extension(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "bin".to_string())
}

/// `investor_{profileId}_{type}_{timestamp}_{uuid}.{ext}`
pub fn object_key(profile_id: &ObjectId, document_type: DocumentType, timestamp: i64, file_name: &str) -> String {
    format!(
        "investor_{}_{}_{}_{}.{}",
        profile_id.to_hex(),
        document_type.as_str(),
        timestamp,
        uuid::Uuid::new_v4().simple(),
        file_extension(file_name)
    )
}

/// Stores an investor document and records it against the caller's profile.
///
/// The object is removed again when the record cannot be written.
pub async fn upload_document(
    store: &Arc<dyn Store>,
    storage: &Arc<dyn ObjectStorage>,
    user_id: &str,
    req: UploadDocumentRequest,
) -> Result<DocumentUploadResponse, AppError> {
    let mut required = RequiredFields::new();
    let document_type = required.take("documentType", &req.document_type);
    let document_name = required.take("documentName", &req.document_name);
    let file_name = required.take("fileName", &req.file_name);
    let content = required.take("content", &req.content);
    required.finish()?;

    let document_type = DocumentType::parse(&document_type).ok_or_else(|| AppError::Validation {
        message: format!("Unsupported document type: {}", document_type),
        fields: vec!["documentType".to_string()],
    })?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(content.as_bytes())
        .map_err(|_| AppError::Validation {
            message: "Document content must be base64 encoded".to_string(),
            fields: vec!["content".to_string()],
        })?;
    if bytes.is_empty() {
        return Err(AppError::Validation {
            message: "Document content is empty".to_string(),
            fields: vec!["content".to_string()],
        });
    }
    let mime_type = present(&req.mime_type).unwrap_or(DEFAULT_MIME_TYPE).to_string();

    let profile = store
        .find_investor_by_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Investor profile not found".to_string()))?;
    let profile_id = profile
        .id
        .ok_or_else(|| AppError::Persistence("investor stored without id".to_string()))?;

    let now = chrono::Utc::now().timestamp();
    let key = object_key(&profile_id, document_type, now, &file_name);
    let size = bytes.len() as u64;

    let mut saga = Saga::new("document upload");
    let key = storage.store(&key, bytes, &mime_type).await?;
    log::info!("📄 Stored {} ({} bytes) for investor {}", key, size, profile_id);

    {
        let storage = storage.clone();
        let key = key.clone();
        saga.on_rollback("delete stored object", move || async move { storage.delete(&key).await });
    }

    let document = Document {
        id: None,
        owner_kind: OwnerKind::Investor,
        owner_id: profile_id,
        name: document_name,
        document_type,
        file_name: key.clone(),
        file_size: Some(size),
        mime_type,
        uploaded_by: Some(user_id.to_string()),
        status: ReviewStatus::Pending,
        approved_by: None,
        approval_date: None,
        rejection_reason: None,
        created_at: now,
        updated_at: None,
    };
    let document = match store.insert_document(document).await {
        Ok(d) => d,
        Err(e) => return Err(saga.abort(e).await),
    };
    let document_id = match document.id {
        Some(id) => id,
        None => {
            let err = AppError::Persistence("document stored without id".to_string());
            return Err(saga.abort(err).await);
        }
    };

    if let Err(e) = store.attach_document(&profile_id, &document_id).await {
        return Err(saga.abort(e).await);
    }
    saga.commit();

    let url = match storage.signed_url(&key).await {
        Ok(url) => Some(url),
        Err(e) => {
            log::warn!("⚠️  Uploaded {} but could not sign its URL: {}", key, e);
            None
        }
    };

    Ok(DocumentUploadResponse {
        success: true,
        message: "Document uploaded successfully".to_string(),
        document: DocumentView::new(&document, url),
    })
}

/// Caller's documents, each with a fresh signed URL.
pub async fn list_documents(
    store: &dyn Store,
    storage: &dyn ObjectStorage,
    user_id: &str,
) -> Result<DocumentListResponse, AppError> {
    let profile = store
        .find_investor_by_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Investor profile not found".to_string()))?;
    let profile_id = profile
        .id
        .ok_or_else(|| AppError::Persistence("investor stored without id".to_string()))?;

    let documents = store.find_documents_by_owner(OwnerKind::Investor, &profile_id).await?;
    Ok(DocumentListResponse {
        success: true,
        message: "Documents retrieved successfully".to_string(),
        documents: sign_documents(storage, &documents).await,
    })
}

pub async fn review_document(
    store: &dyn Store,
    reviewer_id: &str,
    document_id: &str,
    req: ReviewDocumentRequest,
) -> Result<DocumentView, AppError> {
    let id = ObjectId::parse_str(document_id)
        .map_err(|_| AppError::NotFound("Document not found".to_string()))?;
    let mut document = store
        .find_document(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;

    let rejection_reason = present(&req.rejection_reason).map(str::to_string);
    if req.decision == ReviewDecision::Rejected && rejection_reason.is_none() {
        return Err(AppError::Validation {
            message: "A rejection reason is required".to_string(),
            fields: vec!["rejectionReason".to_string()],
        });
    }

    let status = document.status.transition(req.decision)?;
    let review = DocumentReview {
        status,
        reviewed_by: reviewer_id.to_string(),
        reviewed_at: chrono::Utc::now().timestamp(),
        rejection_reason: if status == ReviewStatus::Rejected { rejection_reason } else { None },
    };
    store.update_document_review(&id, &review).await?;
    log::info!("📝 Document {} marked {} by {}", id, status.as_str(), reviewer_id);

    document.status = review.status;
    document.approved_by = Some(review.reviewed_by);
    document.approval_date = Some(review.reviewed_at);
    document.rejection_reason = review.rejection_reason;
    document.updated_at = Some(review.reviewed_at);
    Ok(DocumentView::new(&document, None))
}

/// Loads an object behind a signed link.
pub async fn serve_file(
    storage: &dyn ObjectStorage,
    signer: &UrlSigner,
    key: &str,
    token: &str,
) -> Result<StoredObject, AppError> {
    signer.verify(key, token)?;
    storage.load(key).await
}
