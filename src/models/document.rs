use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::OwnerKind;
use crate::utils::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    IdentityProof,
    AddressProof,
    BankStatement,
    TaxReturn,
    FinancialStatement,
    BusinessLicense,
    Other,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::IdentityProof => "identity_proof",
            DocumentType::AddressProof => "address_proof",
            DocumentType::BankStatement => "bank_statement",
            DocumentType::TaxReturn => "tax_return",
            DocumentType::FinancialStatement => "financial_statement",
            DocumentType::BusinessLicense => "business_license",
            DocumentType::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(value.to_string())).ok()
    }
}

/// Review workflow: `pending -> approved | rejected`. Both decisions are final;
/// a rejected document is replaced by uploading a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn transition(self, decision: ReviewDecision) -> Result<ReviewStatus, AppError> {
        match (self, decision) {
            (ReviewStatus::Pending, ReviewDecision::Approved) => Ok(ReviewStatus::Approved),
            (ReviewStatus::Pending, ReviewDecision::Rejected) => Ok(ReviewStatus::Rejected),
            (current, _) => Err(AppError::Conflict(format!(
                "Document has already been {}",
                current.as_str()
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

/// Uploaded file metadata. The bytes live in object storage under `file_name`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub owner_kind: OwnerKind,
    pub owner_id: ObjectId,
    pub name: String,
    pub document_type: DocumentType,
    pub file_name: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    pub mime_type: String,
    #[serde(default)]
    pub uploaded_by: Option<String>,
    #[serde(default)]
    pub status: ReviewStatus,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub approval_date: Option<i64>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

/// Reviewer decision as persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentReview {
    pub status: ReviewStatus,
    pub reviewed_by: String,
    pub reviewed_at: i64,
    pub rejection_reason: Option<String>,
}

// ==================== REQUESTS ====================

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadDocumentRequest {
    pub document_type: Option<String>,
    pub document_name: Option<String>,
    /// Original file name, used for the extension.
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    /// Base64 encoded file content.
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDocumentRequest {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

// ==================== RESPONSES ====================

/// Document as shown in projections. `file_url` is `None` when a signed URL
/// could not be produced.
#[derive(Debug, Clone, Serialize, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub id: String,
    pub name: String,
    pub document_type: DocumentType,
    pub file_name: String,
    pub file_url: Option<String>,
    pub url_available: bool,
    pub mime_type: String,
    pub file_size: Option<u64>,
    pub uploaded_at: i64,
    pub status: ReviewStatus,
    pub is_approved: bool,
    pub approved_by: Option<String>,
    pub approval_date: Option<i64>,
    pub rejection_reason: Option<String>,
}

impl DocumentView {
    pub fn new(doc: &Document, file_url: Option<String>) -> Self {
        DocumentView {
            id: doc.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: doc.name.clone(),
            document_type: doc.document_type,
            file_name: doc.file_name.clone(),
            url_available: file_url.is_some(),
            file_url,
            mime_type: doc.mime_type.clone(),
            file_size: doc.file_size,
            uploaded_at: doc.created_at,
            status: doc.status,
            is_approved: doc.status == ReviewStatus::Approved,
            approved_by: doc.approved_by.clone(),
            approval_date: doc.approval_date,
            rejection_reason: doc.rejection_reason.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DocumentUploadResponse {
    pub success: bool,
    pub message: String,
    pub document: DocumentView,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DocumentListResponse {
    pub success: bool,
    pub message: String,
    pub documents: Vec<DocumentView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_workflow() {
        assert_eq!(ReviewStatus::Pending.transition(ReviewDecision::Approved).unwrap(), ReviewStatus::Approved);
        assert_eq!(ReviewStatus::Pending.transition(ReviewDecision::Rejected).unwrap(), ReviewStatus::Rejected);
        assert!(matches!(
            ReviewStatus::Rejected.transition(ReviewDecision::Approved),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            ReviewStatus::Approved.transition(ReviewDecision::Approved),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_document_type_parse() {
        assert_eq!(DocumentType::parse("tax_return"), Some(DocumentType::TaxReturn));
        assert_eq!(DocumentType::parse("passport"), None);
        assert_eq!(DocumentType::BusinessLicense.as_str(), "business_license");
    }
}
