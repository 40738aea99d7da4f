//! Step orchestration for the startup application wizard.
//!
//! The editable state lives in the draft store. Once the application is
//! submitted the wizard turns read-only and shows the registered records.

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::database::{DraftStore, Store};
use crate::models::{
    Application, ApplicationSource, DraftRecord, OwnerKind, ProgressView, StepSaveResponse, StepStatus,
    StepView, WizardStep,
};
use crate::services::application_service::owned_application;
use crate::utils::validation::check_field;
use crate::utils::AppError;

type StepData = Map<String, Value>;

#[derive(Debug, Clone)]
pub struct StepOrchestrator {
    application_id: String,
    source: ApplicationSource,
    steps: BTreeMap<WizardStep, (StepStatus, StepData)>,
}

impl StepOrchestrator {
    /// Editable state: a step is complete only when a save marked it so.
    pub fn from_drafts(application_id: impl Into<String>, drafts: Vec<DraftRecord>) -> Self {
        let mut steps: BTreeMap<WizardStep, (StepStatus, StepData)> = WizardStep::ALL
            .into_iter()
            .map(|step| (step, (StepStatus::Pending, Map::new())))
            .collect();
        for draft in drafts {
            steps.insert(draft.step, (draft.status, draft.data));
        }
        Self {
            application_id: application_id.into(),
            source: ApplicationSource::Draft,
            steps,
        }
    }

    /// Read-only state: every step complete.
    pub fn from_submitted(application_id: impl Into<String>, mut data: BTreeMap<WizardStep, StepData>) -> Self {
        let steps = WizardStep::ALL
            .into_iter()
            .map(|step| (step, (StepStatus::Complete, data.remove(&step).unwrap_or_default())))
            .collect();
        Self {
            application_id: application_id.into(),
            source: ApplicationSource::Submitted,
            steps,
        }
    }

    pub fn source(&self) -> ApplicationSource {
        self.source
    }

    pub fn is_read_only(&self) -> bool {
        self.source == ApplicationSource::Submitted
    }

    pub fn status(&self, step: WizardStep) -> StepStatus {
        self.steps
            .get(&step)
            .map(|(status, _)| *status)
            .unwrap_or_default()
    }

    fn incomplete_before(&self, step: WizardStep) -> Vec<WizardStep> {
        step.earlier()
            .iter()
            .copied()
            .filter(|s| self.status(*s) != StepStatus::Complete)
            .collect()
    }

    pub fn can_visit(&self, step: WizardStep) -> bool {
        self.is_read_only() || self.incomplete_before(step).is_empty()
    }

    /// First step that is not complete; the review step once all are.
    pub fn current_step(&self) -> WizardStep {
        WizardStep::ALL
            .into_iter()
            .find(|step| self.status(*step) != StepStatus::Complete)
            .unwrap_or(WizardStep::Review)
    }

    pub fn incomplete_steps(&self) -> Vec<WizardStep> {
        WizardStep::ALL
            .into_iter()
            .filter(|step| self.status(*step) != StepStatus::Complete)
            .collect()
    }

    /// Fails unless `step` may be edited right now.
    pub fn ensure_editable(&self, step: WizardStep) -> Result<(), AppError> {
        if self.is_read_only() {
            return Err(AppError::Conflict("Application has already been submitted".to_string()));
        }
        let blocked = self.incomplete_before(step);
        if !blocked.is_empty() {
            return Err(AppError::Validation {
                message: format!("Complete the earlier steps before {}", step),
                fields: blocked.iter().map(|s| s.route().to_string()).collect(),
            });
        }
        Ok(())
    }

    pub fn next_route(&self, step: WizardStep) -> Option<String> {
        step.next()
            .map(|next| format!("/application/{}/{}", self.application_id, next.route()))
    }

    pub fn view(&self) -> ProgressView {
        ProgressView {
            application_id: self.application_id.clone(),
            source: self.source,
            read_only: self.is_read_only(),
            current_step: self.current_step(),
            steps: WizardStep::ALL
                .into_iter()
                .map(|step| {
                    let (status, data) = self
                        .steps
                        .get(&step)
                        .cloned()
                        .unwrap_or((StepStatus::Pending, Map::new()));
                    StepView {
                        step,
                        status,
                        can_visit: self.can_visit(step),
                        data,
                    }
                })
                .collect(),
        }
    }
}

fn is_filled(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(_) => true,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Required fields present and every filled field well-formed.
pub fn validate_step(step: WizardStep, data: &StepData) -> Result<(), AppError> {
    let missing: Vec<String> = step
        .required_fields()
        .iter()
        .filter(|field| !is_filled(data.get(**field)))
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::missing_fields(missing));
    }

    let invalid: Vec<String> = data
        .iter()
        .filter_map(|(name, value)| as_text(value).and_then(|text| check_field(name, &text)).map(|_| name.clone()))
        .collect();
    if !invalid.is_empty() {
        return Err(AppError::invalid_fields(invalid));
    }
    Ok(())
}

fn parse_step(route: &str) -> Result<WizardStep, AppError> {
    WizardStep::from_route(route).ok_or_else(|| AppError::NotFound(format!("Unknown step: {}", route)))
}

/// Step data shown for a submitted application, rebuilt from the registered records.
async fn submitted_data(
    store: &dyn Store,
    drafts: &dyn DraftStore,
    application: &Application,
    application_id: &str,
) -> Result<BTreeMap<WizardStep, StepData>, AppError> {
    let mut data: BTreeMap<WizardStep, StepData> = drafts
        .load(&application.owner, application_id)
        .await?
        .into_iter()
        .map(|d| (d.step, d.data))
        .collect();

    let Some(startup_id) = application.startup_id else {
        return Ok(data);
    };
    let as_map = |value: Value| match value {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    if let Some(owner) = store.find_startup_owner(&application.owner).await? {
        let user = store.find_user(&application.owner).await?;
        data.insert(
            WizardStep::Personal,
            as_map(json!({
                "fullName": user.as_ref().and_then(|u| u.name.clone()),
                "email": user.as_ref().map(|u| u.email.clone()),
                "phoneNumber": user.as_ref().and_then(|u| u.phone_number.clone()),
                "dateOfBirth": owner.date_of_birth,
                "address": owner.address,
                "nationality": owner.nationality,
                "linkedInURL": owner.linkedin_url,
            })),
        );
    }
    if let Some(startup) = store.find_startup(&startup_id).await? {
        data.insert(
            WizardStep::Organization,
            as_map(json!({
                "startupName": startup.startup_name,
                "description": startup.description,
                "businessType": startup.business_type,
                "industry": startup.industry,
                "address": startup.address,
                "country": startup.country,
                "website": startup.website,
                "dateOfEstablishment": startup.date_of_establishment,
            })),
        );
        data.insert(
            WizardStep::Documents,
            serde_json::to_value(&startup.documents).map(as_map).unwrap_or_default(),
        );
    }
    if let Some(financial) = store.find_financial_info(&startup_id).await? {
        data.insert(
            WizardStep::Financial,
            as_map(json!({
                "revenue": financial.revenue,
                "profitMargin": financial.profit_margin,
                "fundingReceived": financial.funding_received,
                "valuation": financial.valuation,
                "financialYear": financial.financial_year,
            })),
        );
    }
    if let Some(bank) = store.find_bank_info(OwnerKind::Startup, &startup_id.to_hex()).await? {
        data.insert(
            WizardStep::Banking,
            as_map(json!({
                "bankName": bank.bank_name,
                "accountNumber": bank.account_number,
                "accountType": bank.account_type,
                "ifscCode": bank.ifsc_code,
                "branchName": bank.branch_name,
                "swiftCode": bank.swift_code,
            })),
        );
    }
    Ok(data)
}

/// Orchestrator for `application`, with the source taken from its status.
pub async fn orchestrator_for(
    store: &dyn Store,
    drafts: &dyn DraftStore,
    application: &Application,
) -> Result<StepOrchestrator, AppError> {
    let application_id = application.id.map(|id| id.to_hex()).unwrap_or_default();
    match ApplicationSource::from(application.status) {
        ApplicationSource::Draft => {
            let records = drafts.load(&application.owner, &application_id).await?;
            Ok(StepOrchestrator::from_drafts(application_id, records))
        }
        ApplicationSource::Submitted => {
            let data = submitted_data(store, drafts, application, &application_id).await?;
            Ok(StepOrchestrator::from_submitted(application_id, data))
        }
    }
}

pub async fn load_progress(
    store: &dyn Store,
    drafts: &dyn DraftStore,
    session: Option<&str>,
    application_id: &str,
) -> Result<ProgressView, AppError> {
    let user_id = session.ok_or(AppError::SessionMissing)?;
    let application = owned_application(store, user_id, application_id).await?;
    Ok(orchestrator_for(store, drafts, &application).await?.view())
}

async fn save_step(
    store: &dyn Store,
    drafts: &dyn DraftStore,
    session: Option<&str>,
    application_id: &str,
    step: &str,
    data: StepData,
    complete: bool,
) -> Result<StepSaveResponse, AppError> {
    let user_id = session.ok_or(AppError::SessionMissing)?;
    let step = parse_step(step)?;
    let application = owned_application(store, user_id, application_id).await?;
    let orchestrator = orchestrator_for(store, drafts, &application).await?;
    orchestrator.ensure_editable(step)?;

    let status = if complete {
        validate_step(step, &data)?;
        StepStatus::Complete
    } else {
        StepStatus::Pending
    };

    drafts
        .save(DraftRecord {
            user_id: user_id.to_string(),
            application_id: application_id.to_string(),
            step,
            data,
            status,
            updated_at: chrono::Utc::now().timestamp(),
        })
        .await?;
    log::debug!("💾 Saved step {} of application {} ({:?})", step, application_id, status);

    Ok(StepSaveResponse {
        success: true,
        step,
        status,
        next_route: if complete { orchestrator.next_route(step) } else { None },
    })
}

/// Stores the step as typed so far. A completed step saved this way is reopened.
pub async fn autosave_step(
    store: &dyn Store,
    drafts: &dyn DraftStore,
    session: Option<&str>,
    application_id: &str,
    step: &str,
    data: StepData,
) -> Result<StepSaveResponse, AppError> {
    save_step(store, drafts, session, application_id, step, data, false).await
}

/// Validates and stores the step as complete, returning the next step's route.
pub async fn complete_step(
    store: &dyn Store,
    drafts: &dyn DraftStore,
    session: Option<&str>,
    application_id: &str,
    step: &str,
    data: StepData,
) -> Result<StepSaveResponse, AppError> {
    save_step(store, drafts, session, application_id, step, data, true).await
}

pub async fn clear_drafts(
    store: &dyn Store,
    drafts: &dyn DraftStore,
    session: Option<&str>,
    application_id: &str,
) -> Result<u64, AppError> {
    let user_id = session.ok_or(AppError::SessionMissing)?;
    let application = owned_application(store, user_id, application_id).await?;
    if !application.is_draft() {
        return Err(AppError::Conflict("Application has already been submitted".to_string()));
    }
    let removed = drafts.clear(user_id, application_id).await?;
    log::info!("🧹 Cleared {} draft step(s) of application {}", removed, application_id);
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApplicationStatus;
    use crate::state::testing::{test_state, TestState};

    fn data(value: Value) -> StepData {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn personal() -> StepData {
        data(json!({
            "fullName": "Asha Rao",
            "email": "asha@example.com",
            "phoneNumber": "+91 98765 43210",
            "dateOfBirth": "1990-01-01",
            "address": "4 Lake Road",
            "nationality": "Indian"
        }))
    }

    async fn application(t: &TestState, status: ApplicationStatus) -> String {
        t.state
            .store
            .insert_application(Application {
                id: None,
                owner: "u1".into(),
                status,
                startup_id: None,
                created_at: 0,
                expire_at: i64::MAX,
                submitted_at: None,
            })
            .await
            .unwrap()
            .id
            .unwrap()
            .to_hex()
    }

    #[test]
    fn test_draft_navigation_gating() {
        let o = StepOrchestrator::from_drafts(
            "app",
            vec![DraftRecord {
                user_id: "u1".into(),
                application_id: "app".into(),
                step: WizardStep::Personal,
                data: Map::new(),
                status: StepStatus::Complete,
                updated_at: 0,
            }],
        );
        assert!(o.can_visit(WizardStep::Personal));
        assert!(o.can_visit(WizardStep::Organization));
        assert!(!o.can_visit(WizardStep::Financial));
        assert_eq!(o.current_step(), WizardStep::Organization);
        assert_eq!(o.next_route(WizardStep::Personal).as_deref(), Some("/application/app/organization"));
        assert_eq!(o.next_route(WizardStep::Review), None);
    }

    #[test]
    fn test_read_only_mode() {
        let o = StepOrchestrator::from_submitted("app", BTreeMap::new());
        assert!(o.is_read_only());
        assert!(WizardStep::ALL.iter().all(|s| o.can_visit(*s) && o.status(*s) == StepStatus::Complete));
        assert!(matches!(o.ensure_editable(WizardStep::Banking), Err(AppError::Conflict(_))));
        assert!(o.incomplete_steps().is_empty());
    }

    #[test]
    fn test_step_validation() {
        assert!(validate_step(WizardStep::Personal, &personal()).is_ok());

        let mut missing = personal();
        missing.remove("email");
        match validate_step(WizardStep::Personal, &missing) {
            Err(AppError::Validation { fields, .. }) => assert_eq!(fields, vec!["email".to_string()]),
            other => panic!("unexpected {:?}", other),
        }

        let mut invalid = personal();
        invalid.insert("email".into(), json!("nope"));
        assert!(matches!(validate_step(WizardStep::Personal, &invalid), Err(AppError::Validation { .. })));

        assert!(validate_step(WizardStep::Documents, &Map::new()).is_ok());
    }

    #[tokio::test]
    async fn test_complete_then_autosave_reopens() {
        let t = test_state();
        let app = application(&t, ApplicationStatus::Draft).await;
        let (store, drafts) = (t.state.store.as_ref(), t.state.drafts.as_ref());

        let saved = complete_step(store, drafts, Some("u1"), &app, "personal", personal()).await.unwrap();
        assert_eq!(saved.status, StepStatus::Complete);
        assert_eq!(saved.next_route, Some(format!("/application/{}/organization", app)));

        let progress = load_progress(store, drafts, Some("u1"), &app).await.unwrap();
        assert_eq!(progress.current_step, WizardStep::Organization);
        assert_eq!(progress.source, ApplicationSource::Draft);

        autosave_step(store, drafts, Some("u1"), &app, "personal", data(json!({"fullName": "A"})))
            .await
            .unwrap();
        let progress = load_progress(store, drafts, Some("u1"), &app).await.unwrap();
        assert_eq!(progress.current_step, WizardStep::Personal);
        assert!(!progress.steps[1].can_visit);
    }

    #[tokio::test]
    async fn test_gated_step_and_review_require_earlier_steps() {
        let t = test_state();
        let app = application(&t, ApplicationStatus::Draft).await;
        let (store, drafts) = (t.state.store.as_ref(), t.state.drafts.as_ref());

        let banking = complete_step(store, drafts, Some("u1"), &app, "banking", Map::new()).await;
        assert!(matches!(banking, Err(AppError::Validation { .. })));

        match complete_step(store, drafts, Some("u1"), &app, "review", Map::new()).await {
            Err(AppError::Validation { fields, .. }) => assert_eq!(fields.len(), 5),
            other => panic!("unexpected {:?}", other),
        }
        assert!(t.drafts.load("u1", &app).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_session_missing_writes_nothing() {
        let t = test_state();
        let app = application(&t, ApplicationStatus::Draft).await;
        let (store, drafts) = (t.state.store.as_ref(), t.state.drafts.as_ref());

        assert_eq!(
            complete_step(store, drafts, None, &app, "personal", personal()).await.unwrap_err(),
            AppError::SessionMissing
        );
        assert_eq!(
            autosave_step(store, drafts, None, &app, "personal", personal()).await.unwrap_err(),
            AppError::SessionMissing
        );
        assert!(t.drafts.load("u1", &app).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submitted_application_is_read_only() {
        let t = test_state();
        let app = application(&t, ApplicationStatus::Submitted).await;
        let (store, drafts) = (t.state.store.as_ref(), t.state.drafts.as_ref());

        let progress = load_progress(store, drafts, Some("u1"), &app).await.unwrap();
        assert!(progress.read_only);
        assert_eq!(progress.source, ApplicationSource::Submitted);

        assert!(matches!(
            autosave_step(store, drafts, Some("u1"), &app, "personal", personal()).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            clear_drafts(store, drafts, Some("u1"), &app).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_other_users_application_is_hidden() {
        let t = test_state();
        let app = application(&t, ApplicationStatus::Draft).await;
        let (store, drafts) = (t.state.store.as_ref(), t.state.drafts.as_ref());

        assert!(matches!(
            load_progress(store, drafts, Some("u2"), &app).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            complete_step(store, drafts, Some("u1"), &app, "settings", Map::new()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_drafts() {
        let t = test_state();
        let app = application(&t, ApplicationStatus::Draft).await;
        let (store, drafts) = (t.state.store.as_ref(), t.state.drafts.as_ref());

        complete_step(store, drafts, Some("u1"), &app, "personal", personal()).await.unwrap();
        assert_eq!(clear_drafts(store, drafts, Some("u1"), &app).await.unwrap(), 1);
        let progress = load_progress(store, drafts, Some("u1"), &app).await.unwrap();
        assert_eq!(progress.current_step, WizardStep::Personal);
    }
}
