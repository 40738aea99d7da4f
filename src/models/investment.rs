use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::StartupView;

/// An investor's application to a startup. Unique per (startup, investor).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Investment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub startup_id: ObjectId,
    /// User id of the investor.
    pub investor_id: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentView {
    pub id: String,
    pub startup_id: String,
    pub investor_id: String,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startup: Option<StartupView>,
}

impl InvestmentView {
    pub fn new(investment: &Investment, startup: Option<StartupView>) -> Self {
        InvestmentView {
            id: investment.id.map(|id| id.to_hex()).unwrap_or_default(),
            startup_id: investment.startup_id.to_hex(),
            investor_id: investment.investor_id.clone(),
            created_at: investment.created_at,
            startup,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct InvestmentResponse {
    pub success: bool,
    pub message: String,
    pub investment: InvestmentView,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct InvestmentListResponse {
    pub success: bool,
    pub count: usize,
    pub investments: Vec<InvestmentView>,
}
