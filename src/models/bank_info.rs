use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Which entity a bank account or document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    Investor,
    Startup,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Investor => "investor",
            OwnerKind::Startup => "startup",
        }
    }
}

/// Bank account record. Never embedded in its owner; looked up by
/// (`owner_kind`, `owner_id`). Investors are keyed by user id, startups by
/// the startup's record id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BankInfo {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub owner_kind: OwnerKind,
    pub owner_id: String,
    pub bank_name: String,
    pub account_number: String,
    pub account_type: String,
    pub ifsc_code: String,
    pub branch_name: String,
    pub swift_code: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BankInfoResponse {
    pub id: String,
    pub bank_name: String,
    pub account_number: String,
    pub account_type: String,
    pub ifsc_code: String,
    pub branch_name: String,
    pub swift_code: String,
}

impl From<&BankInfo> for BankInfoResponse {
    fn from(b: &BankInfo) -> Self {
        BankInfoResponse {
            id: b.id.map(|id| id.to_hex()).unwrap_or_default(),
            bank_name: b.bank_name.clone(),
            account_number: b.account_number.clone(),
            account_type: b.account_type.clone(),
            ifsc_code: b.ifsc_code.clone(),
            branch_name: b.branch_name.clone(),
            swift_code: b.swift_code.clone(),
        }
    }
}
