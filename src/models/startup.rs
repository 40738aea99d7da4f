use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::utils::pagination::{PageRequest, Pagination, SortOrder};
use crate::utils::validation::lenient_string;
use crate::utils::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StartupStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl StartupStatus {
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "pending" => Ok(StartupStatus::Pending),
            "approved" => Ok(StartupStatus::Approved),
            "rejected" => Ok(StartupStatus::Rejected),
            _ => Err(AppError::Validation {
                message: "Status must be one of: pending, approved, rejected".to_string(),
                fields: vec!["status".to_string()],
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StartupStatus::Pending => "pending",
            StartupStatus::Approved => "approved",
            StartupStatus::Rejected => "rejected",
        }
    }
}

/// Storage keys of the files attached during the documents step.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartupDocuments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_sheet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub government_id_proof: Option<String>,
    #[serde(default, rename = "GSTCertificate", skip_serializing_if = "Option::is_none")]
    pub gst_certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_documents: Option<String>,
}

/// Personal record of a user who registered at least one startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StartupOwner {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub date_of_birth: String,
    pub address: String,
    pub nationality: String,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Startup {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// User id of the owner.
    pub owner: String,
    pub startup_name: String,
    pub description: String,
    pub business_type: String,
    pub industry: String,
    pub address: String,
    pub country: String,
    pub website: String,
    pub valuation: f64,
    pub date_of_establishment: String,
    #[serde(default)]
    pub status: StartupStatus,
    #[serde(default)]
    pub investments: Vec<ObjectId>,
    #[serde(default)]
    pub documents: StartupDocuments,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialInfo {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub startup_id: ObjectId,
    pub revenue: f64,
    pub profit_margin: f64,
    pub funding_received: f64,
    pub valuation: f64,
    pub financial_year: String,
}

// ==================== REQUESTS ====================

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersonalSection {
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default, rename = "linkedInURL")]
    pub linkedin_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSection {
    #[serde(default)]
    pub startup_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub business_type: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    /// Defaults to the submission date.
    #[serde(default)]
    pub date_of_establishment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSection {
    #[serde(default, deserialize_with = "lenient_string")]
    #[schema(value_type = Option<String>)]
    pub revenue: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    #[schema(value_type = Option<String>)]
    pub profit_margin: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    #[schema(value_type = Option<String>)]
    pub funding_received: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    #[schema(value_type = Option<String>)]
    pub valuation: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    #[schema(value_type = Option<String>)]
    pub financial_year: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BankingSection {
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    #[schema(value_type = Option<String>)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub ifsc_code: Option<String>,
    #[serde(default)]
    pub branch_name: Option<String>,
    #[serde(default)]
    pub swift_code: Option<String>,
}

/// POST /startups/applications/submit
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitStartupRequest {
    #[serde(default)]
    pub personal: PersonalSection,
    #[serde(default)]
    pub organization: OrganizationSection,
    #[serde(default)]
    pub financial: FinancialSection,
    #[serde(default)]
    pub banking: BankingSection,
    #[serde(default)]
    pub documents: StartupDocuments,
    #[serde(default)]
    pub application_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStartupRequest {
    pub startup_name: Option<String>,
    pub description: Option<String>,
    pub business_type: Option<String>,
    pub industry: Option<String>,
    pub address: Option<String>,
    pub country: Option<String>,
    pub website: Option<String>,
    pub valuation: Option<f64>,
    pub documents: Option<StartupDocuments>,
}

impl UpdateStartupRequest {
    pub fn is_empty(&self) -> bool {
        self.startup_name.is_none()
            && self.description.is_none()
            && self.business_type.is_none()
            && self.industry.is_none()
            && self.address.is_none()
            && self.country.is_none()
            && self.website.is_none()
            && self.valuation.is_none()
            && self.documents.is_none()
    }

    pub fn apply(self, startup: &mut Startup) {
        if let Some(v) = self.startup_name {
            startup.startup_name = v;
        }
        if let Some(v) = self.description {
            startup.description = v;
        }
        if let Some(v) = self.business_type {
            startup.business_type = v;
        }
        if let Some(v) = self.industry {
            startup.industry = v;
        }
        if let Some(v) = self.address {
            startup.address = v;
        }
        if let Some(v) = self.country {
            startup.country = v;
        }
        if let Some(v) = self.website {
            startup.website = v;
        }
        if let Some(v) = self.valuation {
            startup.valuation = v;
        }
        if let Some(v) = self.documents {
            startup.documents = v;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StartupListParams {
    pub keyword: Option<String>,
    pub status: Option<String>,
    pub industry: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

// ==================== QUERY ====================

/// Sortable columns of the startup listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartupSortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    StartupName,
    Valuation,
    DateOfEstablishment,
}

impl StartupSortField {
    pub fn parse(value: Option<&str>) -> Result<Self, AppError> {
        match value {
            None | Some("createdAt") => Ok(StartupSortField::CreatedAt),
            Some("updatedAt") => Ok(StartupSortField::UpdatedAt),
            Some("startupName") => Ok(StartupSortField::StartupName),
            Some("valuation") => Ok(StartupSortField::Valuation),
            Some("dateOfEstablishment") => Ok(StartupSortField::DateOfEstablishment),
            Some(_) => Err(AppError::Validation {
                message: "sortBy must be one of: createdAt, updatedAt, startupName, valuation, dateOfEstablishment".to_string(),
                fields: vec!["sortBy".to_string()],
            }),
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            StartupSortField::CreatedAt => "created_at",
            StartupSortField::UpdatedAt => "updated_at",
            StartupSortField::StartupName => "startup_name",
            StartupSortField::Valuation => "valuation",
            StartupSortField::DateOfEstablishment => "date_of_establishment",
        }
    }

    fn compare(&self, a: &Startup, b: &Startup) -> Ordering {
        match self {
            StartupSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            StartupSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            StartupSortField::StartupName => a.startup_name.cmp(&b.startup_name),
            StartupSortField::Valuation => a.valuation.total_cmp(&b.valuation),
            StartupSortField::DateOfEstablishment => {
                a.date_of_establishment.cmp(&b.date_of_establishment)
            }
        }
    }
}

/// Startup listing predicate, sort and page. Count and slice share it.
#[derive(Debug, Clone)]
pub struct StartupQuery {
    pub keyword: Option<String>,
    pub status: Option<StartupStatus>,
    pub industry: Option<String>,
    pub sort_by: StartupSortField,
    pub sort_order: SortOrder,
    pub page: PageRequest,
}

impl StartupQuery {
    pub fn from_params(params: StartupListParams) -> Result<Self, AppError> {
        let status = match params.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Some(StartupStatus::parse(s)?),
            None => None,
        };

        Ok(StartupQuery {
            keyword: non_blank(params.keyword),
            status,
            industry: non_blank(params.industry),
            sort_by: StartupSortField::parse(params.sort_by.as_deref())?,
            sort_order: SortOrder::parse(params.sort_order.as_deref())?,
            page: PageRequest::new(params.page, params.limit)?,
        })
    }

    pub fn matches(&self, startup: &Startup) -> bool {
        if let Some(keyword) = &self.keyword {
            let hit = [&startup.startup_name, &startup.description, &startup.industry]
                .iter()
                .any(|field| contains_ci(field, keyword));
            if !hit {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != startup.status) {
            return false;
        }
        if let Some(industry) = &self.industry {
            if !contains_ci(&startup.industry, industry) {
                return false;
            }
        }
        true
    }

    pub fn compare(&self, a: &Startup, b: &Startup) -> Ordering {
        let ordering = self.sort_by.compare(a, b);
        match self.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }

    pub fn to_filter(&self) -> Document {
        let mut filter = Document::new();
        if let Some(keyword) = &self.keyword {
            let any: Vec<Bson> = ["startup_name", "description", "industry"]
                .iter()
                .map(|field| {
                    let mut clause = Document::new();
                    clause.insert(*field, ci_regex(keyword));
                    Bson::Document(clause)
                })
                .collect();
            filter.insert("$or", any);
        }
        if let Some(status) = self.status {
            filter.insert("status", status.as_str());
        }
        if let Some(industry) = &self.industry {
            filter.insert("industry", ci_regex(industry));
        }
        filter
    }

    pub fn to_sort(&self) -> Document {
        let mut sort = Document::new();
        sort.insert(self.sort_by.column(), self.sort_order.as_mongo());
        sort
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn ci_regex(value: &str) -> Document {
    doc! { "$regex": regex::escape(value), "$options": "i" }
}

// ==================== RESPONSES ====================

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub linked_in: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartupView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub business_type: String,
    pub industry: String,
    pub address: String,
    pub country: String,
    pub website: String,
    pub valuation: f64,
    pub date_of_establishment: String,
    pub status: StartupStatus,
    pub logo: Option<String>,
    pub documents: StartupDocuments,
    pub investments: Vec<String>,
    pub owner: Option<OwnerSummary>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl StartupView {
    pub fn new(startup: &Startup, owner: Option<OwnerSummary>) -> Self {
        StartupView {
            id: startup.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: startup.startup_name.clone(),
            description: startup.description.clone(),
            business_type: startup.business_type.clone(),
            industry: startup.industry.clone(),
            address: startup.address.clone(),
            country: startup.country.clone(),
            website: startup.website.clone(),
            valuation: startup.valuation,
            date_of_establishment: startup.date_of_establishment.clone(),
            status: startup.status,
            logo: startup.documents.startup_logo.clone(),
            documents: startup.documents.clone(),
            investments: startup.investments.iter().map(|i| i.to_hex()).collect(),
            owner,
            created_at: startup.created_at,
            updated_at: startup.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct StartupPage {
    pub startups: Vec<StartupView>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct StartupPageResponse {
    pub success: bool,
    pub data: StartupPage,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitStartupResponse {
    pub success: bool,
    pub message: String,
    pub startup_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn startup(name: &str, industry: &str, valuation: f64, created_at: i64) -> Startup {
        Startup {
            id: Some(ObjectId::new()),
            owner: "u1".into(),
            startup_name: name.into(),
            description: "Payments for small merchants".into(),
            business_type: "private".into(),
            industry: industry.into(),
            address: "Pune".into(),
            country: "India".into(),
            website: "https://example.com".into(),
            valuation,
            date_of_establishment: "2020-01-01".into(),
            status: StartupStatus::Pending,
            investments: vec![],
            documents: StartupDocuments::default(),
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_params_rejected_outside_allow_list() {
        let bad_sort = StartupListParams { sort_by: Some("owner".into()), ..Default::default() };
        assert!(StartupQuery::from_params(bad_sort).is_err());

        let bad_status = StartupListParams { status: Some("archived".into()), ..Default::default() };
        assert!(StartupQuery::from_params(bad_status).is_err());

        let bad_limit = StartupListParams { limit: Some(500), ..Default::default() };
        assert!(StartupQuery::from_params(bad_limit).is_err());

        let ok = StartupQuery::from_params(StartupListParams {
            sort_by: Some("valuation".into()),
            sort_order: Some("asc".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(ok.to_sort(), doc! { "valuation": 1 });
    }

    #[test]
    fn test_keyword_and_industry_match() {
        let s = startup("PayFlow", "FinTech", 10.0, 1);
        let mut query = StartupQuery::from_params(StartupListParams::default()).unwrap();

        query.keyword = Some("merchants".into());
        assert!(query.matches(&s));

        query.industry = Some("health".into());
        assert!(!query.matches(&s));
    }

    #[test]
    fn test_compare_follows_sort_order() {
        let a = startup("A", "x", 1.0, 1);
        let b = startup("B", "x", 2.0, 2);
        let query = StartupQuery::from_params(StartupListParams::default()).unwrap();

        // newest first by default
        assert_eq!(query.compare(&a, &b), Ordering::Greater);
    }
}
