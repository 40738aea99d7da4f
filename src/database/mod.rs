pub mod drafts;
pub mod memory;
pub mod mongo_store;
pub mod store;

pub use drafts::{DraftStore, MemoryDraftStore, MongoDraftStore};
pub use memory::MemoryStore;
pub use mongo_store::MongoStore;
pub use store::Store;

use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use std::error::Error;

pub const USERS: &str = "users";
pub const INVESTORS: &str = "investors";
pub const GOVERNMENT_IDS: &str = "government_ids";
pub const BANK_INFOS: &str = "bank_infos";
pub const DOCUMENTS: &str = "investor_documents";
pub const STARTUP_OWNERS: &str = "startup_owners";
pub const STARTUPS: &str = "startups";
pub const FINANCIAL_INFOS: &str = "financial_infos";
pub const INVESTMENTS: &str = "investments";
pub const APPLICATIONS: &str = "startup_applications";
pub const APPLICATION_DRAFTS: &str = "application_drafts";

#[derive(Clone)]
pub struct MongoDB {
    client: Client,
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        // Connection pool
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = uri
            .split('/')
            .last()
            .and_then(|s| s.split('?').next())
            .filter(|s| !s.is_empty())
            .unwrap_or("VentureRegistry");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { client, db };

        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Unique indexes are the source of truth for one-per-key records;
    /// service pre-checks only short-circuit the common case.
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        log::info!("🔧 Creating database indexes...");

        self.create_index(INVESTORS, doc! { "user_id": 1 }, true).await;
        self.create_index(GOVERNMENT_IDS, doc! { "investor_id": 1 }, true).await;
        self.create_index(BANK_INFOS, doc! { "owner_kind": 1, "owner_id": 1 }, true).await;
        self.create_index(DOCUMENTS, doc! { "owner_kind": 1, "owner_id": 1 }, false).await;
        self.create_index(STARTUP_OWNERS, doc! { "user_id": 1 }, true).await;
        self.create_index(STARTUPS, doc! { "owner": 1 }, false).await;
        self.create_index(STARTUPS, doc! { "status": 1, "created_at": -1 }, false).await;
        self.create_index(FINANCIAL_INFOS, doc! { "startup_id": 1 }, false).await;
        self.create_index(INVESTMENTS, doc! { "startup_id": 1, "investor_id": 1 }, true).await;
        self.create_index(APPLICATIONS, doc! { "owner": 1 }, false).await;
        self.create_index(APPLICATIONS, doc! { "status": 1, "expire_at": 1 }, false).await;
        self.create_index(
            APPLICATION_DRAFTS,
            doc! { "user_id": 1, "application_id": 1, "step": 1 },
            true,
        )
        .await;

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    async fn create_index(&self, collection: &str, keys: Document, unique: bool) {
        let label = format!("{}({})", collection, keys.keys().cloned().collect::<Vec<_>>().join(", "));
        let index = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(unique).build())
            .build();

        match self.collection::<Document>(collection).create_index(index).await {
            Ok(_) => log::info!("   ✅ Index created: {}", label),
            Err(e) => log::warn!("   ⚠️  Index {} not created: {}", label, e),
        }
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires a running MongoDB at DATABASE_URL"]
    async fn test_connects_and_creates_indexes() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL").unwrap_or_else(|_| "mongodb://localhost:27017/venture_test".into());
        let db = MongoDB::new(&uri).await.unwrap();
        assert!(db.database().list_collection_names().await.is_ok());
    }
}
