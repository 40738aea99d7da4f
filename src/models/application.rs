use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    #[default]
    Draft,
    Submitted,
}

/// Startup registration application the wizard runs against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Application {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// User id of the applicant.
    pub owner: String,
    #[serde(default)]
    pub status: ApplicationStatus,
    #[serde(default)]
    pub startup_id: Option<ObjectId>,
    pub created_at: i64,
    /// Drafts still open at this instant are swept by the expiry job.
    pub expire_at: i64,
    #[serde(default)]
    pub submitted_at: Option<i64>,
}

impl Application {
    pub fn is_draft(&self) -> bool {
        self.status == ApplicationStatus::Draft
    }
}

/// Wizard steps in navigation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    Personal,
    Organization,
    Financial,
    Banking,
    Documents,
    Review,
}

impl WizardStep {
    pub const ALL: [WizardStep; 6] = [
        WizardStep::Personal,
        WizardStep::Organization,
        WizardStep::Financial,
        WizardStep::Banking,
        WizardStep::Documents,
        WizardStep::Review,
    ];

    pub fn route(&self) -> &'static str {
        match self {
            WizardStep::Personal => "personal",
            WizardStep::Organization => "organization",
            WizardStep::Financial => "financial",
            WizardStep::Banking => "banking",
            WizardStep::Documents => "documents",
            WizardStep::Review => "review",
        }
    }

    pub fn from_route(route: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.route() == route)
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn next(&self) -> Option<WizardStep> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn earlier(&self) -> &'static [WizardStep] {
        &Self::ALL[..self.index()]
    }

    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            WizardStep::Personal => &[
                "fullName",
                "email",
                "phoneNumber",
                "dateOfBirth",
                "address",
                "nationality",
            ],
            WizardStep::Organization => &[
                "startupName",
                "description",
                "businessType",
                "industry",
                "address",
                "country",
                "website",
            ],
            WizardStep::Financial => &[
                "revenue",
                "profitMargin",
                "fundingReceived",
                "valuation",
                "financialYear",
            ],
            WizardStep::Banking => &[
                "bankName",
                "accountNumber",
                "accountType",
                "ifscCode",
                "branchName",
                "swiftCode",
            ],
            WizardStep::Documents | WizardStep::Review => &[],
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Complete,
}

/// Where the wizard state was reconstructed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ApplicationSource {
    /// Editable; state comes from the user's drafts.
    Draft,
    /// Read-only; state comes from the submitted server record.
    Submitted,
}

impl From<ApplicationStatus> for ApplicationSource {
    fn from(status: ApplicationStatus) -> Self {
        match status {
            ApplicationStatus::Draft => ApplicationSource::Draft,
            ApplicationStatus::Submitted => ApplicationSource::Submitted,
        }
    }
}

/// One persisted wizard step, keyed by (user, application, step).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftRecord {
    pub user_id: String,
    pub application_id: String,
    pub step: WizardStep,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub status: StepStatus,
    pub updated_at: i64,
}

// ==================== RESPONSES ====================

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationView {
    pub id: String,
    pub owner: String,
    pub status: ApplicationStatus,
    pub startup_id: Option<String>,
    pub created_at: i64,
    pub expire_at: i64,
    pub submitted_at: Option<i64>,
}

impl From<&Application> for ApplicationView {
    fn from(a: &Application) -> Self {
        ApplicationView {
            id: a.id.map(|id| id.to_hex()).unwrap_or_default(),
            owner: a.owner.clone(),
            status: a.status,
            startup_id: a.startup_id.map(|id| id.to_hex()),
            created_at: a.created_at,
            expire_at: a.expire_at,
            submitted_at: a.submitted_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    pub step: WizardStep,
    pub status: StepStatus,
    pub can_visit: bool,
    #[schema(value_type = Object)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub application_id: String,
    pub source: ApplicationSource,
    pub read_only: bool,
    pub current_step: WizardStep,
    pub steps: Vec<StepView>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepSaveResponse {
    pub success: bool,
    pub step: WizardStep,
    pub status: StepStatus,
    /// Route of the following step, present after a completing save.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_route: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ApplicationResponse {
    pub success: bool,
    pub application: ApplicationView,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ApplicationListResponse {
    pub success: bool,
    pub applications: Vec<ApplicationView>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ApplicationDetailResponse {
    pub success: bool,
    pub application: ApplicationView,
    pub progress: ProgressView,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order() {
        assert_eq!(WizardStep::Personal.next(), Some(WizardStep::Organization));
        assert_eq!(WizardStep::Review.next(), None);
        assert_eq!(WizardStep::Banking.earlier().len(), 3);
        assert_eq!(WizardStep::from_route("documents"), Some(WizardStep::Documents));
        assert_eq!(WizardStep::from_route("settings"), None);
    }

    #[test]
    fn test_source_follows_status() {
        assert_eq!(ApplicationSource::from(ApplicationStatus::Draft), ApplicationSource::Draft);
        assert_eq!(ApplicationSource::from(ApplicationStatus::Submitted), ApplicationSource::Submitted);
    }
}
