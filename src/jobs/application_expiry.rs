// ==================== APPLICATION EXPIRY ====================
// Hourly sweep of draft applications whose expire_at has passed. The
// application record and its step drafts are removed together.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration};

use crate::database::{DraftStore, Store};
use crate::utils::AppError;

const SWEEP_INTERVAL_SECS: u64 = 3600;

/// Spawns the sweeper. The first tick fires immediately so drafts that
/// expired while the service was down are removed at startup.
pub fn start_application_expiry(store: Arc<dyn Store>, drafts: Arc<dyn DraftStore>) {
    log::info!("⏳ Starting application expiry job (runs every hour)");

    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(SWEEP_INTERVAL_SECS));

        loop {
            interval.tick().await;

            match sweep_expired(store.as_ref(), drafts.as_ref(), Utc::now().timestamp()).await {
                Ok(0) => log::debug!("⏰ No expired applications"),
                Ok(count) => log::info!("🧹 Removed {} expired application(s)", count),
                Err(e) => log::error!("❌ Application expiry sweep failed: {}", e),
            }
        }
    });
}

/// Removes every draft application that expired before `now`.
/// A failure on one application is logged and does not stop the sweep.
pub async fn sweep_expired(store: &dyn Store, drafts: &dyn DraftStore, now: i64) -> Result<usize, AppError> {
    let expired = store.expired_applications(now).await?;
    let mut removed = 0;

    for application in expired {
        let Some(id) = application.id else { continue };
        let app_id = id.to_hex();

        if let Err(e) = drafts.clear(&application.owner, &app_id).await {
            log::warn!("⚠️  Could not clear drafts of application {}: {}", app_id, e);
            continue;
        }

        match store.delete_application(&id).await {
            Ok(()) => removed += 1,
            Err(e) => log::warn!("⚠️  Could not delete expired application {}: {}", app_id, e),
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryDraftStore, MemoryStore};
    use crate::models::{Application, ApplicationStatus, DraftRecord, StepStatus, WizardStep};

    fn application(owner: &str, status: ApplicationStatus, expire_at: i64) -> Application {
        Application {
            id: None,
            owner: owner.to_string(),
            status,
            startup_id: None,
            created_at: 0,
            expire_at,
            submitted_at: None,
        }
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired_drafts() {
        let store = MemoryStore::new();
        let drafts = MemoryDraftStore::new();

        let stale = store.insert_application(application("u1", ApplicationStatus::Draft, 100)).await.unwrap();
        let fresh = store.insert_application(application("u1", ApplicationStatus::Draft, 10_000)).await.unwrap();
        let done = store.insert_application(application("u1", ApplicationStatus::Submitted, 100)).await.unwrap();

        let stale_id = stale.id.unwrap().to_hex();
        drafts
            .save(DraftRecord {
                user_id: "u1".into(),
                application_id: stale_id.clone(),
                step: WizardStep::Personal,
                data: serde_json::Map::new(),
                status: StepStatus::Pending,
                updated_at: 50,
            })
            .await
            .unwrap();

        let removed = sweep_expired(&store, &drafts, 1_000).await.unwrap();

        assert_eq!(removed, 1);
        assert!(store.find_application(&stale.id.unwrap()).await.unwrap().is_none());
        assert!(store.find_application(&fresh.id.unwrap()).await.unwrap().is_some());
        assert!(store.find_application(&done.id.unwrap()).await.unwrap().is_some());
        assert!(drafts.load("u1", &stale_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_propagates_listing_failure() {
        let store = MemoryStore::new();
        let drafts = MemoryDraftStore::new();
        store.fail_on("expired_applications").await;

        assert!(sweep_expired(&store, &drafts, 1_000).await.is_err());
    }
}
