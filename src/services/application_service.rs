use mongodb::bson::oid::ObjectId;

use crate::database::{DraftStore, Store};
use crate::models::{
    Application, ApplicationDetailResponse, ApplicationListResponse, ApplicationResponse, ApplicationStatus,
    ApplicationView,
};
use crate::services::wizard_service::orchestrator_for;
use crate::utils::AppError;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// The caller's application; anyone else's is reported as missing.
pub async fn owned_application(store: &dyn Store, user_id: &str, application_id: &str) -> Result<Application, AppError> {
    let not_found = || AppError::NotFound("Application not found".to_string());
    let id = ObjectId::parse_str(application_id).map_err(|_| not_found())?;
    let application = store.find_application(&id).await?.ok_or_else(not_found)?;
    if application.owner != user_id {
        return Err(not_found());
    }
    Ok(application)
}

pub async fn start_application(store: &dyn Store, user_id: &str, ttl_days: i64) -> Result<ApplicationResponse, AppError> {
    let now = chrono::Utc::now().timestamp();
    let application = store
        .insert_application(Application {
            id: None,
            owner: user_id.to_string(),
            status: ApplicationStatus::Draft,
            startup_id: None,
            created_at: now,
            expire_at: now + ttl_days * SECONDS_PER_DAY,
            submitted_at: None,
        })
        .await?;
    log::info!("📝 Application {:?} started by {}", application.id, user_id);

    Ok(ApplicationResponse {
        success: true,
        application: ApplicationView::from(&application),
    })
}

pub async fn list_applications(store: &dyn Store, caller: &str, user_id: &str) -> Result<ApplicationListResponse, AppError> {
    if caller != user_id {
        return Err(AppError::Forbidden("You can only view your own applications".to_string()));
    }
    let applications = store.list_applications(user_id).await?;
    Ok(ApplicationListResponse {
        success: true,
        applications: applications.iter().map(ApplicationView::from).collect(),
    })
}

/// Application plus its wizard state.
pub async fn application_detail(
    store: &dyn Store,
    drafts: &dyn DraftStore,
    caller: &str,
    user_id: &str,
    application_id: &str,
) -> Result<ApplicationDetailResponse, AppError> {
    if caller != user_id {
        return Err(AppError::Forbidden("You can only view your own applications".to_string()));
    }
    let application = owned_application(store, user_id, application_id).await?;
    let progress = orchestrator_for(store, drafts, &application).await?.view();

    Ok(ApplicationDetailResponse {
        success: true,
        application: ApplicationView::from(&application),
        progress,
    })
}

/// Marks the application submitted once every wizard step is complete.
pub async fn complete_application(
    store: &dyn Store,
    drafts: &dyn DraftStore,
    caller: &str,
    application_id: &str,
) -> Result<ApplicationResponse, AppError> {
    let mut application = owned_application(store, caller, application_id).await?;
    if !application.is_draft() {
        return Err(AppError::Conflict("Application has already been submitted".to_string()));
    }

    let incomplete = orchestrator_for(store, drafts, &application).await?.incomplete_steps();
    if !incomplete.is_empty() {
        return Err(AppError::Validation {
            message: "Every step must be completed before submitting".to_string(),
            fields: incomplete.iter().map(|s| s.route().to_string()).collect(),
        });
    }

    let id = application
        .id
        .ok_or_else(|| AppError::Persistence("application stored without id".to_string()))?;
    let now = chrono::Utc::now().timestamp();
    store.mark_application_submitted(&id, None, now).await?;
    log::info!("✅ Application {} submitted by {}", id, caller);

    application.status = ApplicationStatus::Submitted;
    application.submitted_at = Some(now);
    Ok(ApplicationResponse {
        success: true,
        application: ApplicationView::from(&application),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DraftRecord, StepStatus, WizardStep};
    use crate::state::testing::test_state;

    #[tokio::test]
    async fn test_start_sets_expiry() {
        let t = test_state();
        let started = start_application(t.state.store.as_ref(), "u1", 10).await.unwrap();
        let app = started.application;
        assert_eq!(app.status, ApplicationStatus::Draft);
        assert_eq!(app.expire_at - app.created_at, 10 * SECONDS_PER_DAY);

        let listed = list_applications(t.state.store.as_ref(), "u1", "u1").await.unwrap();
        assert_eq!(listed.applications.len(), 1);
        assert!(matches!(
            list_applications(t.state.store.as_ref(), "u2", "u1").await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_complete_requires_every_step() {
        let t = test_state();
        let (store, drafts) = (t.state.store.as_ref(), t.state.drafts.as_ref());
        let app_id = start_application(store, "u1", 10).await.unwrap().application.id;

        match complete_application(store, drafts, "u1", &app_id).await {
            Err(AppError::Validation { fields, .. }) => assert_eq!(fields.len(), 6),
            other => panic!("unexpected {:?}", other),
        }

        for step in WizardStep::ALL {
            drafts
                .save(DraftRecord {
                    user_id: "u1".into(),
                    application_id: app_id.clone(),
                    step,
                    data: Default::default(),
                    status: StepStatus::Complete,
                    updated_at: 0,
                })
                .await
                .unwrap();
        }

        let done = complete_application(store, drafts, "u1", &app_id).await.unwrap();
        assert_eq!(done.application.status, ApplicationStatus::Submitted);
        assert!(matches!(
            complete_application(store, drafts, "u1", &app_id).await,
            Err(AppError::Conflict(_))
        ));

        let detail = application_detail(store, drafts, "u1", "u1", &app_id).await.unwrap();
        assert!(detail.progress.read_only);
    }
}
