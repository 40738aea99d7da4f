use async_trait::async_trait;
use futures::stream::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::{Collection, Cursor};
use serde::de::DeserializeOwned;

use crate::database::{
    MongoDB, Store, APPLICATIONS, BANK_INFOS, DOCUMENTS, FINANCIAL_INFOS, GOVERNMENT_IDS,
    INVESTMENTS, INVESTORS, STARTUPS, STARTUP_OWNERS, USERS,
};
use crate::models::{
    Application, BankInfo, Designation, Document, DocumentReview, FinancialInfo, GovernmentId,
    InvestorProfile, InvestorQuery, Investment, OwnerKind, ReviewStatus, Startup, StartupOwner,
    StartupQuery, User,
};
use crate::utils::AppError;

const DUPLICATE_KEY: i32 = 11000;

/// [`Store`] backed by the service's MongoDB collections.
#[derive(Clone)]
pub struct MongoStore {
    db: MongoDB,
}

impl MongoStore {
    pub fn new(db: MongoDB) -> Self {
        Self { db }
    }

    fn users(&self) -> Collection<User> {
        self.db.collection(USERS)
    }

    fn investors(&self) -> Collection<InvestorProfile> {
        self.db.collection(INVESTORS)
    }

    fn government_ids(&self) -> Collection<GovernmentId> {
        self.db.collection(GOVERNMENT_IDS)
    }

    fn bank_infos(&self) -> Collection<BankInfo> {
        self.db.collection(BANK_INFOS)
    }

    fn documents(&self) -> Collection<Document> {
        self.db.collection(DOCUMENTS)
    }

    fn startup_owners(&self) -> Collection<StartupOwner> {
        self.db.collection(STARTUP_OWNERS)
    }

    fn startups(&self) -> Collection<Startup> {
        self.db.collection(STARTUPS)
    }

    fn financial_infos(&self) -> Collection<FinancialInfo> {
        self.db.collection(FINANCIAL_INFOS)
    }

    fn investments(&self) -> Collection<Investment> {
        self.db.collection(INVESTMENTS)
    }

    fn applications(&self) -> Collection<Application> {
        self.db.collection(APPLICATIONS)
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

/// Maps an insert failure, turning unique-index violations into `Conflict`.
fn insert_error(context: &str, conflict: &str, err: MongoError) -> AppError {
    if is_duplicate_key(&err) {
        AppError::Conflict(conflict.to_string())
    } else {
        AppError::persistence(context, err)
    }
}

async fn collect<T>(mut cursor: Cursor<T>, context: &str) -> Result<Vec<T>, AppError>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let mut rows = Vec::new();
    while let Some(result) = cursor.next().await {
        rows.push(result.map_err(|e| AppError::persistence(context, e))?);
    }
    Ok(rows)
}

fn ci_regex(value: &str) -> mongodb::bson::Document {
    doc! { "$regex": regex::escape(value), "$options": "i" }
}

#[async_trait]
impl Store for MongoStore {
    // ---- users ----

    async fn find_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.users()
            .find_one(doc! { "user_id": user_id })
            .await
            .map_err(|e| AppError::persistence("find user", e))
    }

    async fn find_users(&self, user_ids: &[String]) -> Result<Vec<User>, AppError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .users()
            .find(doc! { "user_id": { "$in": user_ids } })
            .await
            .map_err(|e| AppError::persistence("find users", e))?;
        collect(cursor, "find users").await
    }

    async fn find_user_ids_matching(&self, search: &str) -> Result<Vec<String>, AppError> {
        let filter = doc! { "$or": [ { "name": ci_regex(search) }, { "email": ci_regex(search) } ] };
        let cursor = self
            .users()
            .find(filter)
            .await
            .map_err(|e| AppError::persistence("search users", e))?;
        Ok(collect(cursor, "search users")
            .await?
            .into_iter()
            .map(|u| u.user_id)
            .collect())
    }

    async fn set_user_designation(&self, user_id: &str, designation: Designation) -> Result<(), AppError> {
        let value = match designation {
            Designation::Investor => "investor",
            Designation::Owner => "owner",
        };
        self.users()
            .update_one(doc! { "user_id": user_id }, doc! { "$set": { "designation": value } })
            .await
            .map_err(|e| AppError::persistence("set designation", e))?;
        Ok(())
    }

    // ---- investors ----

    async fn find_investor_by_user(&self, user_id: &str) -> Result<Option<InvestorProfile>, AppError> {
        self.investors()
            .find_one(doc! { "user_id": user_id })
            .await
            .map_err(|e| AppError::persistence("find investor", e))
    }

    async fn find_investor_by_id(&self, id: &ObjectId) -> Result<Option<InvestorProfile>, AppError> {
        self.investors()
            .find_one(doc! { "_id": *id })
            .await
            .map_err(|e| AppError::persistence("find investor", e))
    }

    async fn insert_investor(&self, mut profile: InvestorProfile) -> Result<InvestorProfile, AppError> {
        let result = self
            .investors()
            .insert_one(&profile)
            .await
            .map_err(|e| insert_error("create investor", "Investor profile already exists", e))?;
        profile.id = result.inserted_id.as_object_id();
        Ok(profile)
    }

    async fn attach_government_id(&self, investor_id: &ObjectId, government_id: &ObjectId) -> Result<(), AppError> {
        let result = self
            .investors()
            .update_one(
                doc! { "_id": *investor_id },
                doc! { "$set": {
                    "government_id": *government_id,
                    "updated_at": chrono::Utc::now().timestamp(),
                } },
            )
            .await
            .map_err(|e| AppError::persistence("attach government id", e))?;
        if result.matched_count == 0 {
            return Err(AppError::Persistence(format!("investor {} vanished", investor_id)));
        }
        Ok(())
    }

    async fn attach_document(&self, investor_id: &ObjectId, document_id: &ObjectId) -> Result<(), AppError> {
        let result = self
            .investors()
            .update_one(
                doc! { "_id": *investor_id },
                doc! { "$push": { "documents": *document_id } },
            )
            .await
            .map_err(|e| AppError::persistence("attach document", e))?;
        if result.matched_count == 0 {
            return Err(AppError::Persistence(format!("investor {} vanished", investor_id)));
        }
        Ok(())
    }

    async fn delete_investor(&self, id: &ObjectId) -> Result<(), AppError> {
        self.investors()
            .delete_one(doc! { "_id": *id })
            .await
            .map_err(|e| AppError::persistence("delete investor", e))?;
        Ok(())
    }

    async fn list_investors(&self, query: &InvestorQuery) -> Result<(Vec<InvestorProfile>, u64), AppError> {
        let filter = query.to_filter();
        let total = self
            .investors()
            .count_documents(filter.clone())
            .await
            .map_err(|e| AppError::persistence("count investors", e))?;

        let investors = self.investors();
        let find = investors.find(filter).sort(doc! { "created_at": -1 });
        let cursor = match query.page {
            Some(page) => find.skip(page.skip()).limit(page.limit as i64).await,
            None => find.await,
        }
        .map_err(|e| AppError::persistence("list investors", e))?;

        Ok((collect(cursor, "list investors").await?, total))
    }

    // ---- government ids ----

    async fn insert_government_id(&self, mut government_id: GovernmentId) -> Result<GovernmentId, AppError> {
        let result = self
            .government_ids()
            .insert_one(&government_id)
            .await
            .map_err(|e| insert_error("create government id", "Government id already exists", e))?;
        government_id.id = result.inserted_id.as_object_id();
        Ok(government_id)
    }

    async fn find_government_id(&self, id: &ObjectId) -> Result<Option<GovernmentId>, AppError> {
        self.government_ids()
            .find_one(doc! { "_id": *id })
            .await
            .map_err(|e| AppError::persistence("find government id", e))
    }

    async fn delete_government_id(&self, id: &ObjectId) -> Result<(), AppError> {
        self.government_ids()
            .delete_one(doc! { "_id": *id })
            .await
            .map_err(|e| AppError::persistence("delete government id", e))?;
        Ok(())
    }

    // ---- bank info ----

    async fn insert_bank_info(&self, mut bank_info: BankInfo) -> Result<BankInfo, AppError> {
        let result = self
            .bank_infos()
            .insert_one(&bank_info)
            .await
            .map_err(|e| insert_error("create bank info", "Bank info already exists", e))?;
        bank_info.id = result.inserted_id.as_object_id();
        Ok(bank_info)
    }

    async fn find_bank_info(&self, kind: OwnerKind, owner_id: &str) -> Result<Option<BankInfo>, AppError> {
        self.bank_infos()
            .find_one(doc! { "owner_kind": kind.as_str(), "owner_id": owner_id })
            .await
            .map_err(|e| AppError::persistence("find bank info", e))
    }

    async fn delete_bank_info(&self, id: &ObjectId) -> Result<(), AppError> {
        self.bank_infos()
            .delete_one(doc! { "_id": *id })
            .await
            .map_err(|e| AppError::persistence("delete bank info", e))?;
        Ok(())
    }

    async fn delete_bank_info_for_owner(&self, kind: OwnerKind, owner_id: &str) -> Result<(), AppError> {
        self.bank_infos()
            .delete_many(doc! { "owner_kind": kind.as_str(), "owner_id": owner_id })
            .await
            .map_err(|e| AppError::persistence("delete bank info", e))?;
        Ok(())
    }

    // ---- documents ----

    async fn insert_document(&self, mut document: Document) -> Result<Document, AppError> {
        let result = self
            .documents()
            .insert_one(&document)
            .await
            .map_err(|e| AppError::persistence("create document", e))?;
        document.id = result.inserted_id.as_object_id();
        Ok(document)
    }

    async fn find_document(&self, id: &ObjectId) -> Result<Option<Document>, AppError> {
        self.documents()
            .find_one(doc! { "_id": *id })
            .await
            .map_err(|e| AppError::persistence("find document", e))
    }

    async fn find_documents_by_owner(&self, kind: OwnerKind, owner_id: &ObjectId) -> Result<Vec<Document>, AppError> {
        let cursor = self
            .documents()
            .find(doc! { "owner_kind": kind.as_str(), "owner_id": *owner_id })
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(|e| AppError::persistence("find documents", e))?;
        collect(cursor, "find documents").await
    }

    async fn update_document_review(&self, id: &ObjectId, review: &DocumentReview) -> Result<(), AppError> {
        let result = self
            .documents()
            .update_one(
                doc! { "_id": *id, "status": ReviewStatus::Pending.as_str() },
                doc! { "$set": {
                    "status": review.status.as_str(),
                    "approved_by": review.reviewed_by.as_str(),
                    "approval_date": review.reviewed_at,
                    "rejection_reason": review.rejection_reason.clone(),
                    "updated_at": review.reviewed_at,
                } },
            )
            .await
            .map_err(|e| AppError::persistence("update document", e))?;
        if result.matched_count == 0 {
            return match self.find_document(id).await? {
                Some(current) => Err(AppError::Conflict(format!(
                    "Document has already been {}",
                    current.status.as_str()
                ))),
                None => Err(AppError::NotFound("Document not found".to_string())),
            };
        }
        Ok(())
    }

    // ---- startup owners ----

    async fn find_startup_owner(&self, user_id: &str) -> Result<Option<StartupOwner>, AppError> {
        self.startup_owners()
            .find_one(doc! { "user_id": user_id })
            .await
            .map_err(|e| AppError::persistence("find startup owner", e))
    }

    async fn insert_startup_owner(&self, mut owner: StartupOwner) -> Result<StartupOwner, AppError> {
        let result = self
            .startup_owners()
            .insert_one(&owner)
            .await
            .map_err(|e| insert_error("create startup owner", "Startup owner already exists", e))?;
        owner.id = result.inserted_id.as_object_id();
        Ok(owner)
    }

    async fn delete_startup_owner(&self, id: &ObjectId) -> Result<(), AppError> {
        self.startup_owners()
            .delete_one(doc! { "_id": *id })
            .await
            .map_err(|e| AppError::persistence("delete startup owner", e))?;
        Ok(())
    }

    // ---- startups ----

    async fn insert_startup(&self, mut startup: Startup) -> Result<Startup, AppError> {
        let result = self
            .startups()
            .insert_one(&startup)
            .await
            .map_err(|e| AppError::persistence("create startup", e))?;
        startup.id = result.inserted_id.as_object_id();
        Ok(startup)
    }

    async fn find_startup(&self, id: &ObjectId) -> Result<Option<Startup>, AppError> {
        self.startups()
            .find_one(doc! { "_id": *id })
            .await
            .map_err(|e| AppError::persistence("find startup", e))
    }

    async fn find_startups_by_owner(&self, user_id: &str) -> Result<Vec<Startup>, AppError> {
        let cursor = self
            .startups()
            .find(doc! { "owner": user_id })
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(|e| AppError::persistence("find startups", e))?;
        collect(cursor, "find startups").await
    }

    async fn list_startups(&self, query: &StartupQuery) -> Result<(Vec<Startup>, u64), AppError> {
        let filter = query.to_filter();
        let total = self
            .startups()
            .count_documents(filter.clone())
            .await
            .map_err(|e| AppError::persistence("count startups", e))?;

        let cursor = self
            .startups()
            .find(filter)
            .sort(query.to_sort())
            .skip(query.page.skip())
            .limit(query.page.limit as i64)
            .await
            .map_err(|e| AppError::persistence("list startups", e))?;

        Ok((collect(cursor, "list startups").await?, total))
    }

    async fn update_startup(&self, startup: &Startup) -> Result<(), AppError> {
        let id = startup
            .id
            .ok_or_else(|| AppError::NotFound("Startup not found".to_string()))?;
        let result = self
            .startups()
            .replace_one(doc! { "_id": id }, startup)
            .await
            .map_err(|e| AppError::persistence("update startup", e))?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound("Startup not found".to_string()));
        }
        Ok(())
    }

    async fn delete_startup(&self, id: &ObjectId) -> Result<(), AppError> {
        self.startups()
            .delete_one(doc! { "_id": *id })
            .await
            .map_err(|e| AppError::persistence("delete startup", e))?;
        Ok(())
    }

    async fn push_investment(&self, startup_id: &ObjectId, investment_id: &ObjectId) -> Result<(), AppError> {
        self.startups()
            .update_one(
                doc! { "_id": *startup_id },
                doc! { "$push": { "investments": *investment_id } },
            )
            .await
            .map_err(|e| AppError::persistence("link investment", e))?;
        Ok(())
    }

    // ---- financial info ----

    async fn insert_financial_info(&self, mut info: FinancialInfo) -> Result<FinancialInfo, AppError> {
        let result = self
            .financial_infos()
            .insert_one(&info)
            .await
            .map_err(|e| AppError::persistence("create financial info", e))?;
        info.id = result.inserted_id.as_object_id();
        Ok(info)
    }

    async fn find_financial_info(&self, startup_id: &ObjectId) -> Result<Option<FinancialInfo>, AppError> {
        self.financial_infos()
            .find_one(doc! { "startup_id": *startup_id })
            .await
            .map_err(|e| AppError::persistence("find financial info", e))
    }

    async fn delete_financial_info_for_startup(&self, startup_id: &ObjectId) -> Result<(), AppError> {
        self.financial_infos()
            .delete_many(doc! { "startup_id": *startup_id })
            .await
            .map_err(|e| AppError::persistence("delete financial info", e))?;
        Ok(())
    }

    // ---- investments ----

    async fn find_investment(&self, startup_id: &ObjectId, investor_id: &str) -> Result<Option<Investment>, AppError> {
        self.investments()
            .find_one(doc! { "startup_id": *startup_id, "investor_id": investor_id })
            .await
            .map_err(|e| AppError::persistence("find investment", e))
    }

    async fn insert_investment(&self, mut investment: Investment) -> Result<Investment, AppError> {
        let result = self
            .investments()
            .insert_one(&investment)
            .await
            .map_err(|e| insert_error("create investment", "Already applied to this startup", e))?;
        investment.id = result.inserted_id.as_object_id();
        Ok(investment)
    }

    async fn list_investments_by_investor(&self, investor_id: &str) -> Result<Vec<Investment>, AppError> {
        let cursor = self
            .investments()
            .find(doc! { "investor_id": investor_id })
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(|e| AppError::persistence("list investments", e))?;
        collect(cursor, "list investments").await
    }

    async fn list_investments_by_startup(&self, startup_id: &ObjectId) -> Result<Vec<Investment>, AppError> {
        let cursor = self
            .investments()
            .find(doc! { "startup_id": *startup_id })
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(|e| AppError::persistence("list investments", e))?;
        collect(cursor, "list investments").await
    }

    // ---- applications ----

    async fn insert_application(&self, mut application: Application) -> Result<Application, AppError> {
        let result = self
            .applications()
            .insert_one(&application)
            .await
            .map_err(|e| AppError::persistence("create application", e))?;
        application.id = result.inserted_id.as_object_id();
        Ok(application)
    }

    async fn find_application(&self, id: &ObjectId) -> Result<Option<Application>, AppError> {
        self.applications()
            .find_one(doc! { "_id": *id })
            .await
            .map_err(|e| AppError::persistence("find application", e))
    }

    async fn list_applications(&self, owner: &str) -> Result<Vec<Application>, AppError> {
        let cursor = self
            .applications()
            .find(doc! { "owner": owner })
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(|e| AppError::persistence("list applications", e))?;
        collect(cursor, "list applications").await
    }

    async fn mark_application_submitted(
        &self,
        id: &ObjectId,
        startup_id: Option<ObjectId>,
        submitted_at: i64,
    ) -> Result<(), AppError> {
        let mut set = doc! { "status": "submitted", "submitted_at": submitted_at };
        if let Some(startup_id) = startup_id {
            set.insert("startup_id", startup_id);
        }
        let result = self
            .applications()
            .update_one(doc! { "_id": *id }, doc! { "$set": set })
            .await
            .map_err(|e| AppError::persistence("submit application", e))?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound("Application not found".to_string()));
        }
        Ok(())
    }

    async fn expired_applications(&self, now: i64) -> Result<Vec<Application>, AppError> {
        let cursor = self
            .applications()
            .find(doc! { "status": "draft", "expire_at": { "$lt": now } })
            .await
            .map_err(|e| AppError::persistence("find expired applications", e))?;
        collect(cursor, "find expired applications").await
    }

    async fn delete_application(&self, id: &ObjectId) -> Result<(), AppError> {
        self.applications()
            .delete_one(doc! { "_id": *id })
            .await
            .map_err(|e| AppError::persistence("delete application", e))?;
        Ok(())
    }
}
