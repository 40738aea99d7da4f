use async_trait::async_trait;
use futures::stream::StreamExt;
use mongodb::bson::doc;
use mongodb::Collection;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::database::{MongoDB, APPLICATION_DRAFTS};
use crate::models::{DraftRecord, WizardStep};
use crate::utils::AppError;

/// Per-user, per-application wizard drafts. Writes are last-write-wins.
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Every saved step of the application, in wizard order.
    async fn load(&self, user_id: &str, application_id: &str) -> Result<Vec<DraftRecord>, AppError>;
    async fn save(&self, record: DraftRecord) -> Result<(), AppError>;
    /// Removes all steps of the application and returns how many were dropped.
    async fn clear(&self, user_id: &str, application_id: &str) -> Result<u64, AppError>;
}

type DraftKey = (String, String, WizardStep);

#[derive(Default)]
pub struct MemoryDraftStore {
    drafts: RwLock<HashMap<DraftKey, DraftRecord>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn load(&self, user_id: &str, application_id: &str) -> Result<Vec<DraftRecord>, AppError> {
        let drafts = self.drafts.read().await;
        let mut records: Vec<DraftRecord> = drafts
            .values()
            .filter(|d| d.user_id == user_id && d.application_id == application_id)
            .cloned()
            .collect();
        records.sort_by_key(|d| d.step);
        Ok(records)
    }

    async fn save(&self, record: DraftRecord) -> Result<(), AppError> {
        let key = (record.user_id.clone(), record.application_id.clone(), record.step);
        self.drafts.write().await.insert(key, record);
        Ok(())
    }

    async fn clear(&self, user_id: &str, application_id: &str) -> Result<u64, AppError> {
        let mut drafts = self.drafts.write().await;
        let before = drafts.len();
        drafts.retain(|(user, app, _), _| !(user == user_id && app == application_id));
        Ok((before - drafts.len()) as u64)
    }
}

/// Drafts in the `application_drafts` collection, unique per (user, application, step).
#[derive(Clone)]
pub struct MongoDraftStore {
    db: MongoDB,
}

impl MongoDraftStore {
    pub fn new(db: MongoDB) -> Self {
        Self { db }
    }

    fn drafts(&self) -> Collection<DraftRecord> {
        self.db.collection(APPLICATION_DRAFTS)
    }
}

#[async_trait]
impl DraftStore for MongoDraftStore {
    async fn load(&self, user_id: &str, application_id: &str) -> Result<Vec<DraftRecord>, AppError> {
        let mut cursor = self
            .drafts()
            .find(doc! { "user_id": user_id, "application_id": application_id })
            .await
            .map_err(|e| AppError::persistence("load drafts", e))?;

        let mut records = Vec::new();
        while let Some(result) = cursor.next().await {
            match result {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("⚠️  Skipping unreadable draft for {}: {}", application_id, e),
            }
        }
        records.sort_by_key(|d| d.step);
        Ok(records)
    }

    async fn save(&self, record: DraftRecord) -> Result<(), AppError> {
        let filter = doc! {
            "user_id": record.user_id.as_str(),
            "application_id": record.application_id.as_str(),
            "step": record.step.route(),
        };
        self.drafts()
            .replace_one(filter, &record)
            .upsert(true)
            .await
            .map_err(|e| AppError::persistence("save draft", e))?;
        Ok(())
    }

    async fn clear(&self, user_id: &str, application_id: &str) -> Result<u64, AppError> {
        let result = self
            .drafts()
            .delete_many(doc! { "user_id": user_id, "application_id": application_id })
            .await
            .map_err(|e| AppError::persistence("clear drafts", e))?;
        Ok(result.deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StepStatus;

    fn record(step: WizardStep, status: StepStatus) -> DraftRecord {
        DraftRecord {
            user_id: "u1".into(),
            application_id: "app1".into(),
            step,
            data: serde_json::Map::new(),
            status,
            updated_at: 0,
        }
    }

    #[tokio::test]
    async fn test_memory_drafts_last_write_wins() {
        let store = MemoryDraftStore::new();
        store.save(record(WizardStep::Financial, StepStatus::Pending)).await.unwrap();
        store.save(record(WizardStep::Personal, StepStatus::Complete)).await.unwrap();
        store.save(record(WizardStep::Personal, StepStatus::Pending)).await.unwrap();

        let loaded = store.load("u1", "app1").await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].step, WizardStep::Personal);
        assert_eq!(loaded[0].status, StepStatus::Pending);

        assert!(store.load("u2", "app1").await.unwrap().is_empty());
        assert_eq!(store.clear("u1", "app1").await.unwrap(), 2);
        assert!(store.load("u1", "app1").await.unwrap().is_empty());
    }
}
