use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::models::{
    Application, BankInfo, Designation, Document, DocumentReview, FinancialInfo, GovernmentId,
    InvestorProfile, InvestorQuery, Investment, OwnerKind, Startup, StartupOwner, StartupQuery,
    User,
};
use crate::utils::AppError;

/// Record persistence used by the services.
///
/// Every insert returns the stored record with its id assigned. Inserts that
/// collide with a unique key fail with [`AppError::Conflict`]; any other
/// storage failure is [`AppError::Persistence`].
#[async_trait]
pub trait Store: Send + Sync {
    // ---- users ----
    async fn find_user(&self, user_id: &str) -> Result<Option<User>, AppError>;
    async fn find_users(&self, user_ids: &[String]) -> Result<Vec<User>, AppError>;
    /// User ids whose name or email contains `search`, case-insensitively.
    async fn find_user_ids_matching(&self, search: &str) -> Result<Vec<String>, AppError>;
    async fn set_user_designation(&self, user_id: &str, designation: Designation) -> Result<(), AppError>;

    // ---- investors ----
    async fn find_investor_by_user(&self, user_id: &str) -> Result<Option<InvestorProfile>, AppError>;
    async fn find_investor_by_id(&self, id: &ObjectId) -> Result<Option<InvestorProfile>, AppError>;
    async fn insert_investor(&self, profile: InvestorProfile) -> Result<InvestorProfile, AppError>;
    async fn attach_government_id(&self, investor_id: &ObjectId, government_id: &ObjectId) -> Result<(), AppError>;
    async fn attach_document(&self, investor_id: &ObjectId, document_id: &ObjectId) -> Result<(), AppError>;
    async fn delete_investor(&self, id: &ObjectId) -> Result<(), AppError>;
    /// Matching profiles newest first, sliced by `query.page` when set, plus the total match count.
    async fn list_investors(&self, query: &InvestorQuery) -> Result<(Vec<InvestorProfile>, u64), AppError>;

    // ---- government ids ----
    async fn insert_government_id(&self, government_id: GovernmentId) -> Result<GovernmentId, AppError>;
    async fn find_government_id(&self, id: &ObjectId) -> Result<Option<GovernmentId>, AppError>;
    async fn delete_government_id(&self, id: &ObjectId) -> Result<(), AppError>;

    // ---- bank info ----
    async fn insert_bank_info(&self, bank_info: BankInfo) -> Result<BankInfo, AppError>;
    async fn find_bank_info(&self, kind: OwnerKind, owner_id: &str) -> Result<Option<BankInfo>, AppError>;
    async fn delete_bank_info(&self, id: &ObjectId) -> Result<(), AppError>;
    async fn delete_bank_info_for_owner(&self, kind: OwnerKind, owner_id: &str) -> Result<(), AppError>;

    // ---- documents ----
    async fn insert_document(&self, document: Document) -> Result<Document, AppError>;
    async fn find_document(&self, id: &ObjectId) -> Result<Option<Document>, AppError>;
    async fn find_documents_by_owner(&self, kind: OwnerKind, owner_id: &ObjectId) -> Result<Vec<Document>, AppError>;
    /// Applies a decision only while the document is still pending; a document
    /// already decided yields `Conflict`.
    async fn update_document_review(&self, id: &ObjectId, review: &DocumentReview) -> Result<(), AppError>;

    // ---- startup owners ----
    async fn find_startup_owner(&self, user_id: &str) -> Result<Option<StartupOwner>, AppError>;
    async fn insert_startup_owner(&self, owner: StartupOwner) -> Result<StartupOwner, AppError>;
    async fn delete_startup_owner(&self, id: &ObjectId) -> Result<(), AppError>;

    // ---- startups ----
    async fn insert_startup(&self, startup: Startup) -> Result<Startup, AppError>;
    async fn find_startup(&self, id: &ObjectId) -> Result<Option<Startup>, AppError>;
    async fn find_startups_by_owner(&self, user_id: &str) -> Result<Vec<Startup>, AppError>;
    async fn list_startups(&self, query: &StartupQuery) -> Result<(Vec<Startup>, u64), AppError>;
    async fn update_startup(&self, startup: &Startup) -> Result<(), AppError>;
    async fn delete_startup(&self, id: &ObjectId) -> Result<(), AppError>;
    async fn push_investment(&self, startup_id: &ObjectId, investment_id: &ObjectId) -> Result<(), AppError>;

    // ---- financial info ----
    async fn insert_financial_info(&self, info: FinancialInfo) -> Result<FinancialInfo, AppError>;
    async fn find_financial_info(&self, startup_id: &ObjectId) -> Result<Option<FinancialInfo>, AppError>;
    async fn delete_financial_info_for_startup(&self, startup_id: &ObjectId) -> Result<(), AppError>;

    // ---- investments ----
    async fn find_investment(&self, startup_id: &ObjectId, investor_id: &str) -> Result<Option<Investment>, AppError>;
    async fn insert_investment(&self, investment: Investment) -> Result<Investment, AppError>;
    async fn list_investments_by_investor(&self, investor_id: &str) -> Result<Vec<Investment>, AppError>;
    async fn list_investments_by_startup(&self, startup_id: &ObjectId) -> Result<Vec<Investment>, AppError>;

    // ---- applications ----
    async fn insert_application(&self, application: Application) -> Result<Application, AppError>;
    async fn find_application(&self, id: &ObjectId) -> Result<Option<Application>, AppError>;
    async fn list_applications(&self, owner: &str) -> Result<Vec<Application>, AppError>;
    async fn mark_application_submitted(
        &self,
        id: &ObjectId,
        startup_id: Option<ObjectId>,
        submitted_at: i64,
    ) -> Result<(), AppError>;
    /// Draft applications whose `expire_at` is before `now`.
    async fn expired_applications(&self, now: i64) -> Result<Vec<Application>, AppError>;
    async fn delete_application(&self, id: &ObjectId) -> Result<(), AppError>;
}
