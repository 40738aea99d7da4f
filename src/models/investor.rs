use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use serde::{Deserialize, Serialize};

use crate::models::{BankInfoResponse, DocumentView};
use crate::utils::pagination::{PageRequest, Pagination};
use crate::utils::validation::lenient_string;

/// Investor profile (one per user, `user_id` is unique)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvestorProfile {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub investor_type: String,
    #[serde(default)]
    pub organisation_name: Option<String>,
    pub date_of_birth: String,
    pub address: String,
    pub nationality: String,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    pub revenue: f64,
    pub net_worth: f64,
    pub tax_id: String,
    #[serde(default)]
    pub business_license_number: String,
    #[serde(default)]
    pub government_id: Option<ObjectId>,
    #[serde(default)]
    pub documents: Vec<ObjectId>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GovernmentId {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub investor_id: ObjectId,
    pub id_type: String,
    pub id_value: String,
    pub created_at: i64,
}

// ==================== REQUESTS ====================

/// POST /investments/become-a-investor
///
/// Every field is optional at the wire level so that validation can report
/// all missing fields at once instead of failing on the first.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInvestorRequest {
    #[serde(default)]
    pub investor_type: Option<String>,
    #[serde(default)]
    pub organisation_name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default, rename = "linkedInURL")]
    pub linkedin_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    #[schema(value_type = Option<String>)]
    pub revenue: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    #[schema(value_type = Option<String>)]
    pub net_worth: Option<String>,
    #[serde(default)]
    pub business_license_number: Option<String>,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default, rename = "govtIdtype")]
    pub govt_id_type: Option<String>,
    #[serde(default)]
    pub govt_id_value: Option<String>,
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

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct InvestorListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub investor_type: Option<String>,
    pub nationality: Option<String>,
    pub min_revenue: Option<f64>,
    pub max_revenue: Option<f64>,
    pub min_net_worth: Option<f64>,
    pub max_net_worth: Option<f64>,
    pub search: Option<String>,
}

// ==================== QUERY ====================

/// Investor listing predicate. The same value drives the page slice and
/// the total count so both always agree.
#[derive(Debug, Clone, Default)]
pub struct InvestorQuery {
    pub investor_type: Option<String>,
    pub nationality: Option<String>,
    pub min_revenue: Option<f64>,
    pub max_revenue: Option<f64>,
    pub min_net_worth: Option<f64>,
    pub max_net_worth: Option<f64>,
    pub search: Option<String>,
    /// Users whose name or email matched `search`.
    pub search_user_ids: Vec<String>,
    pub page: Option<PageRequest>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn ci_regex(value: &str) -> Document {
    doc! { "$regex": regex::escape(value), "$options": "i" }
}

fn range(min: Option<f64>, max: Option<f64>) -> Option<Document> {
    if min.is_none() && max.is_none() {
        return None;
    }
    let mut bounds = Document::new();
    if let Some(min) = min {
        bounds.insert("$gte", min);
    }
    if let Some(max) = max {
        bounds.insert("$lte", max);
    }
    Some(bounds)
}

impl InvestorQuery {
    pub fn matches(&self, investor: &InvestorProfile) -> bool {
        if let Some(t) = &self.investor_type {
            if &investor.investor_type != t {
                return false;
            }
        }
        if let Some(n) = &self.nationality {
            if !contains_ci(&investor.nationality, n) {
                return false;
            }
        }
        if self.min_revenue.is_some_and(|min| investor.revenue < min)
            || self.max_revenue.is_some_and(|max| investor.revenue > max)
            || self.min_net_worth.is_some_and(|min| investor.net_worth < min)
            || self.max_net_worth.is_some_and(|max| investor.net_worth > max)
        {
            return false;
        }
        if let Some(search) = &self.search {
            let by_org = investor
                .organisation_name
                .as_deref()
                .is_some_and(|o| contains_ci(o, search));
            let by_address = contains_ci(&investor.address, search);
            let by_user = self.search_user_ids.contains(&investor.user_id);
            if !(by_org || by_address || by_user) {
                return false;
            }
        }
        true
    }

    pub fn to_filter(&self) -> Document {
        let mut filter = Document::new();
        if let Some(t) = &self.investor_type {
            filter.insert("investor_type", t);
        }
        if let Some(n) = &self.nationality {
            filter.insert("nationality", ci_regex(n));
        }
        if let Some(bounds) = range(self.min_revenue, self.max_revenue) {
            filter.insert("revenue", bounds);
        }
        if let Some(bounds) = range(self.min_net_worth, self.max_net_worth) {
            filter.insert("net_worth", bounds);
        }
        if let Some(search) = &self.search {
            let mut any: Vec<Bson> = vec![
                Bson::Document(doc! { "organisation_name": ci_regex(search) }),
                Bson::Document(doc! { "address": ci_regex(search) }),
            ];
            if !self.search_user_ids.is_empty() {
                any.push(Bson::Document(doc! { "user_id": { "$in": self.search_user_ids.as_slice() } }));
            }
            filter.insert("$or", any);
        }
        filter
    }
}

// ==================== RESPONSES ====================

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GovernmentIdView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub id_type: Option<String>,
    pub id_value: Option<String>,
}

impl From<&GovernmentId> for GovernmentIdView {
    fn from(g: &GovernmentId) -> Self {
        GovernmentIdView {
            id: g.id.map(|id| id.to_hex()),
            id_type: Some(g.id_type.clone()),
            id_value: Some(g.id_value.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvestorProfileResponse {
    pub id: String,
    pub user_id: String,
    pub investor_type: String,
    pub organisation_name: Option<String>,
    pub date_of_birth: String,
    pub address: String,
    pub nationality: String,
    #[serde(rename = "linkedInURL")]
    pub linkedin_url: Option<String>,
    pub revenue: f64,
    pub net_worth: f64,
    pub tax_id: String,
    pub business_license_number: String,
    pub government_id: Option<GovernmentIdView>,
    pub documents: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl InvestorProfileResponse {
    pub fn new(profile: &InvestorProfile, government_id: Option<&GovernmentId>) -> Self {
        InvestorProfileResponse {
            id: profile.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: profile.user_id.clone(),
            investor_type: profile.investor_type.clone(),
            organisation_name: profile.organisation_name.clone(),
            date_of_birth: profile.date_of_birth.clone(),
            address: profile.address.clone(),
            nationality: profile.nationality.clone(),
            linkedin_url: profile.linkedin_url.clone(),
            revenue: profile.revenue,
            net_worth: profile.net_worth,
            tax_id: profile.tax_id.clone(),
            business_license_number: profile.business_license_number.clone(),
            government_id: government_id.map(GovernmentIdView::from),
            documents: profile.documents.iter().map(|d| d.to_hex()).collect(),
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationData {
    pub investor_id: String,
    pub user_id: String,
    pub personal_info: InvestorProfileResponse,
    pub banking_info: BankInfoResponse,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct RegisterInvestorResponse {
    pub success: bool,
    pub message: String,
    pub data: RegistrationData,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct InvestorExistsResponse {
    pub exists: bool,
    pub message: String,
}

/// Row of the investor listings.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvestorListItem {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub investor_type: String,
    pub organisation_name: Option<String>,
    pub date_of_birth: String,
    pub address: String,
    pub nationality: String,
    #[serde(rename = "linkedInURL")]
    pub linkedin_url: Option<String>,
    pub revenue: f64,
    pub net_worth: f64,
    pub tax_id: String,
    pub business_license_number: String,
    pub government_id: GovernmentIdView,
    pub is_approved: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct InvestorListResponse {
    pub success: bool,
    pub count: usize,
    pub investors: Vec<InvestorListItem>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct InvestorPageResponse {
    pub success: bool,
    pub investors: Vec<InvestorListItem>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvestorApplicationResponse {
    pub investor: InvestorProfileResponse,
    pub bank_info: Option<BankInfoResponse>,
    pub status: String,
}

// ==================== DETAILS PROJECTION ====================

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInformation {
    pub full_name: String,
    pub investor_type: String,
    pub organization_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub address: String,
    pub date_of_birth: String,
    pub nationality: String,
    pub linked_in: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinancialInformation {
    pub revenue: f64,
    pub net_worth: f64,
    pub business_license_number: String,
    pub tax_payer_identification: String,
    pub id_type: Option<String>,
    pub id_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvestorDetails {
    pub investor_id: String,
    pub user_id: String,
    pub personal_information: PersonalInformation,
    pub financial_information: FinancialInformation,
    /// `None` serializes as `{}` to keep the client's shape stable.
    #[serde(serialize_with = "empty_object_when_none")]
    #[schema(value_type = Object)]
    pub banking_information: Option<BankInfoResponse>,
    pub documents: Vec<DocumentView>,
}

fn empty_object_when_none<S>(value: &Option<BankInfoResponse>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(bank) => bank.serialize(serializer),
        None => serde_json::Map::new().serialize(serializer),
    }
}
