use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::{DraftStore, Store};
use crate::services::storage_service::ObjectStorage;

/// Shared handles passed to every handler through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub drafts: Arc<dyn DraftStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        drafts: Arc<dyn DraftStore>,
        storage: Arc<dyn ObjectStorage>,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            drafts,
            storage,
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::database::{MemoryDraftStore, MemoryStore};
    use crate::services::storage_service::testing::FakeStorage;

    /// Memory-backed state plus typed handles for seeding and inspection.
    pub struct TestState {
        pub state: AppState,
        pub store: Arc<MemoryStore>,
        pub drafts: Arc<MemoryDraftStore>,
        pub storage: Arc<FakeStorage>,
    }

    pub fn test_state() -> TestState {
        let store = Arc::new(MemoryStore::new());
        let drafts = Arc::new(MemoryDraftStore::new());
        let storage = Arc::new(FakeStorage::default());
        let state = AppState::new(
            store.clone(),
            drafts.clone(),
            storage.clone(),
            AppConfig::for_tests(),
        );
        TestState { state, store, drafts, storage }
    }

    pub fn verified_user(user_id: &str) -> crate::models::User {
        crate::models::User {
            id: None,
            user_id: user_id.to_string(),
            email: format!("{}@example.com", user_id),
            name: Some(format!("User {}", user_id)),
            phone_number: Some("+91 98765 43210".to_string()),
            verified: true,
            designation: None,
            is_approved: false,
        }
    }
}
