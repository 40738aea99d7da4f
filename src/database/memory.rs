use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use std::collections::HashSet;
use tokio::sync::RwLock;

use crate::database::Store;
use crate::models::{
    Application, ApplicationStatus, BankInfo, Designation, Document, DocumentReview,
    FinancialInfo, GovernmentId, InvestorProfile, InvestorQuery, Investment, OwnerKind, ReviewStatus,
    Startup, StartupOwner, StartupQuery, User,
};
use crate::utils::AppError;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    investors: Vec<InvestorProfile>,
    government_ids: Vec<GovernmentId>,
    bank_infos: Vec<BankInfo>,
    documents: Vec<Document>,
    startup_owners: Vec<StartupOwner>,
    startups: Vec<Startup>,
    financial_infos: Vec<FinancialInfo>,
    investments: Vec<Investment>,
    applications: Vec<Application>,
}

/// In-process [`Store`] with the same unique keys as the MongoDB indexes.
///
/// Used for `STORE_BACKEND=memory` and by the test suite, which can make
/// individual operations fail by name.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    failures: RwLock<HashSet<&'static str>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn insert_user(&self, user: User) {
        self.tables.write().await.users.push(user);
    }

    /// Makes every later call of `operation` fail with a persistence error.
    #[cfg(test)]
    pub async fn fail_on(&self, operation: &'static str) {
        self.failures.write().await.insert(operation);
    }

    #[cfg(test)]
    pub async fn counts(&self) -> (usize, usize, usize) {
        let t = self.tables.read().await;
        (t.investors.len(), t.government_ids.len(), t.bank_infos.len())
    }

    #[cfg(test)]
    pub async fn startup_counts(&self) -> (usize, usize, usize, usize) {
        let t = self.tables.read().await;
        (t.startup_owners.len(), t.startups.len(), t.bank_infos.len(), t.financial_infos.len())
    }

    async fn check(&self, operation: &'static str) -> Result<(), AppError> {
        if self.failures.read().await.contains(operation) {
            return Err(AppError::Persistence(format!("{} failed (injected)", operation)));
        }
        Ok(())
    }
}

fn assign_id(id: &mut Option<ObjectId>) -> ObjectId {
    *id.get_or_insert_with(ObjectId::new)
}

fn slice<T>(mut rows: Vec<T>, skip: u64, limit: u64) -> Vec<T> {
    let skip = (skip as usize).min(rows.len());
    rows.drain(..skip);
    rows.truncate(limit as usize);
    rows
}

#[async_trait]
impl Store for MemoryStore {
    // ---- users ----

    async fn find_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.check("find_user").await?;
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.user_id == user_id).cloned())
    }

    async fn find_users(&self, user_ids: &[String]) -> Result<Vec<User>, AppError> {
        self.check("find_users").await?;
        let t = self.tables.read().await;
        Ok(t.users.iter().filter(|u| user_ids.contains(&u.user_id)).cloned().collect())
    }

    async fn find_user_ids_matching(&self, search: &str) -> Result<Vec<String>, AppError> {
        self.check("find_user_ids_matching").await?;
        let needle = search.to_lowercase();
        let t = self.tables.read().await;
        Ok(t.users
            .iter()
            .filter(|u| {
                u.email.to_lowercase().contains(&needle)
                    || u.name.as_deref().is_some_and(|n| n.to_lowercase().contains(&needle))
            })
            .map(|u| u.user_id.clone())
            .collect())
    }

    async fn set_user_designation(&self, user_id: &str, designation: Designation) -> Result<(), AppError> {
        self.check("set_user_designation").await?;
        let mut t = self.tables.write().await;
        if let Some(user) = t.users.iter_mut().find(|u| u.user_id == user_id) {
            user.designation = Some(designation);
        }
        Ok(())
    }

    // ---- investors ----

    async fn find_investor_by_user(&self, user_id: &str) -> Result<Option<InvestorProfile>, AppError> {
        self.check("find_investor_by_user").await?;
        let t = self.tables.read().await;
        Ok(t.investors.iter().find(|i| i.user_id == user_id).cloned())
    }

    async fn find_investor_by_id(&self, id: &ObjectId) -> Result<Option<InvestorProfile>, AppError> {
        self.check("find_investor_by_id").await?;
        let t = self.tables.read().await;
        Ok(t.investors.iter().find(|i| i.id.as_ref() == Some(id)).cloned())
    }

    async fn insert_investor(&self, mut profile: InvestorProfile) -> Result<InvestorProfile, AppError> {
        self.check("insert_investor").await?;
        let mut t = self.tables.write().await;
        if t.investors.iter().any(|i| i.user_id == profile.user_id) {
            return Err(AppError::Conflict("Investor profile already exists".to_string()));
        }
        assign_id(&mut profile.id);
        t.investors.push(profile.clone());
        Ok(profile)
    }

    async fn attach_government_id(&self, investor_id: &ObjectId, government_id: &ObjectId) -> Result<(), AppError> {
        self.check("attach_government_id").await?;
        let mut t = self.tables.write().await;
        match t.investors.iter_mut().find(|i| i.id.as_ref() == Some(investor_id)) {
            Some(investor) => {
                investor.government_id = Some(*government_id);
                investor.updated_at = chrono::Utc::now().timestamp();
                Ok(())
            }
            None => Err(AppError::Persistence(format!("investor {} vanished", investor_id))),
        }
    }

    async fn attach_document(&self, investor_id: &ObjectId, document_id: &ObjectId) -> Result<(), AppError> {
        self.check("attach_document").await?;
        let mut t = self.tables.write().await;
        match t.investors.iter_mut().find(|i| i.id.as_ref() == Some(investor_id)) {
            Some(investor) => {
                investor.documents.push(*document_id);
                Ok(())
            }
            None => Err(AppError::Persistence(format!("investor {} vanished", investor_id))),
        }
    }

    async fn delete_investor(&self, id: &ObjectId) -> Result<(), AppError> {
        self.check("delete_investor").await?;
        self.tables.write().await.investors.retain(|i| i.id.as_ref() != Some(id));
        Ok(())
    }

    async fn list_investors(&self, query: &InvestorQuery) -> Result<(Vec<InvestorProfile>, u64), AppError> {
        self.check("list_investors").await?;
        let t = self.tables.read().await;
        let mut rows: Vec<InvestorProfile> = t.investors.iter().filter(|i| query.matches(i)).cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = rows.len() as u64;
        let rows = match query.page {
            Some(page) => slice(rows, page.skip(), page.limit),
            None => rows,
        };
        Ok((rows, total))
    }

    // ---- government ids ----

    async fn insert_government_id(&self, mut government_id: GovernmentId) -> Result<GovernmentId, AppError> {
        self.check("insert_government_id").await?;
        let mut t = self.tables.write().await;
        if t.government_ids.iter().any(|g| g.investor_id == government_id.investor_id) {
            return Err(AppError::Conflict("Government id already exists".to_string()));
        }
        assign_id(&mut government_id.id);
        t.government_ids.push(government_id.clone());
        Ok(government_id)
    }

    async fn find_government_id(&self, id: &ObjectId) -> Result<Option<GovernmentId>, AppError> {
        self.check("find_government_id").await?;
        let t = self.tables.read().await;
        Ok(t.government_ids.iter().find(|g| g.id.as_ref() == Some(id)).cloned())
    }

    async fn delete_government_id(&self, id: &ObjectId) -> Result<(), AppError> {
        self.check("delete_government_id").await?;
        self.tables.write().await.government_ids.retain(|g| g.id.as_ref() != Some(id));
        Ok(())
    }

    // ---- bank info ----

    async fn insert_bank_info(&self, mut bank_info: BankInfo) -> Result<BankInfo, AppError> {
        self.check("insert_bank_info").await?;
        let mut t = self.tables.write().await;
        if t.bank_infos
            .iter()
            .any(|b| b.owner_kind == bank_info.owner_kind && b.owner_id == bank_info.owner_id)
        {
            return Err(AppError::Conflict("Bank info already exists".to_string()));
        }
        assign_id(&mut bank_info.id);
        t.bank_infos.push(bank_info.clone());
        Ok(bank_info)
    }

    async fn find_bank_info(&self, kind: OwnerKind, owner_id: &str) -> Result<Option<BankInfo>, AppError> {
        self.check("find_bank_info").await?;
        let t = self.tables.read().await;
        Ok(t.bank_infos
            .iter()
            .find(|b| b.owner_kind == kind && b.owner_id == owner_id)
            .cloned())
    }

    async fn delete_bank_info(&self, id: &ObjectId) -> Result<(), AppError> {
        self.check("delete_bank_info").await?;
        self.tables.write().await.bank_infos.retain(|b| b.id.as_ref() != Some(id));
        Ok(())
    }

    async fn delete_bank_info_for_owner(&self, kind: OwnerKind, owner_id: &str) -> Result<(), AppError> {
        self.check("delete_bank_info_for_owner").await?;
        self.tables
            .write()
            .await
            .bank_infos
            .retain(|b| !(b.owner_kind == kind && b.owner_id == owner_id));
        Ok(())
    }

    // ---- documents ----

    async fn insert_document(&self, mut document: Document) -> Result<Document, AppError> {
        self.check("insert_document").await?;
        assign_id(&mut document.id);
        self.tables.write().await.documents.push(document.clone());
        Ok(document)
    }

    async fn find_document(&self, id: &ObjectId) -> Result<Option<Document>, AppError> {
        self.check("find_document").await?;
        let t = self.tables.read().await;
        Ok(t.documents.iter().find(|d| d.id.as_ref() == Some(id)).cloned())
    }

    async fn find_documents_by_owner(&self, kind: OwnerKind, owner_id: &ObjectId) -> Result<Vec<Document>, AppError> {
        self.check("find_documents_by_owner").await?;
        let t = self.tables.read().await;
        Ok(t.documents
            .iter()
            .filter(|d| d.owner_kind == kind && &d.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn update_document_review(&self, id: &ObjectId, review: &DocumentReview) -> Result<(), AppError> {
        self.check("update_document_review").await?;
        let mut t = self.tables.write().await;
        match t.documents.iter_mut().find(|d| d.id.as_ref() == Some(id)) {
            Some(doc) if doc.status != ReviewStatus::Pending => Err(AppError::Conflict(format!(
                "Document has already been {}",
                doc.status.as_str()
            ))),
            Some(doc) => {
                doc.status = review.status;
                doc.approved_by = Some(review.reviewed_by.clone());
                doc.approval_date = Some(review.reviewed_at);
                doc.rejection_reason = review.rejection_reason.clone();
                doc.updated_at = Some(review.reviewed_at);
                Ok(())
            }
            None => Err(AppError::NotFound("Document not found".to_string())),
        }
    }

    // ---- startup owners ----

    async fn find_startup_owner(&self, user_id: &str) -> Result<Option<StartupOwner>, AppError> {
        self.check("find_startup_owner").await?;
        let t = self.tables.read().await;
        Ok(t.startup_owners.iter().find(|o| o.user_id == user_id).cloned())
    }

    async fn insert_startup_owner(&self, mut owner: StartupOwner) -> Result<StartupOwner, AppError> {
        self.check("insert_startup_owner").await?;
        let mut t = self.tables.write().await;
        if t.startup_owners.iter().any(|o| o.user_id == owner.user_id) {
            return Err(AppError::Conflict("Startup owner already exists".to_string()));
        }
        assign_id(&mut owner.id);
        t.startup_owners.push(owner.clone());
        Ok(owner)
    }

    async fn delete_startup_owner(&self, id: &ObjectId) -> Result<(), AppError> {
        self.check("delete_startup_owner").await?;
        self.tables.write().await.startup_owners.retain(|o| o.id.as_ref() != Some(id));
        Ok(())
    }

    // ---- startups ----

    async fn insert_startup(&self, mut startup: Startup) -> Result<Startup, AppError> {
        self.check("insert_startup").await?;
        assign_id(&mut startup.id);
        self.tables.write().await.startups.push(startup.clone());
        Ok(startup)
    }

    async fn find_startup(&self, id: &ObjectId) -> Result<Option<Startup>, AppError> {
        self.check("find_startup").await?;
        let t = self.tables.read().await;
        Ok(t.startups.iter().find(|s| s.id.as_ref() == Some(id)).cloned())
    }

    async fn find_startups_by_owner(&self, user_id: &str) -> Result<Vec<Startup>, AppError> {
        self.check("find_startups_by_owner").await?;
        let t = self.tables.read().await;
        Ok(t.startups.iter().filter(|s| s.owner == user_id).cloned().collect())
    }

    async fn list_startups(&self, query: &StartupQuery) -> Result<(Vec<Startup>, u64), AppError> {
        self.check("list_startups").await?;
        let t = self.tables.read().await;
        let mut rows: Vec<Startup> = t.startups.iter().filter(|s| query.matches(s)).cloned().collect();
        rows.sort_by(|a, b| query.compare(a, b));
        let total = rows.len() as u64;
        Ok((slice(rows, query.page.skip(), query.page.limit), total))
    }

    async fn update_startup(&self, startup: &Startup) -> Result<(), AppError> {
        self.check("update_startup").await?;
        let mut t = self.tables.write().await;
        match t.startups.iter_mut().find(|s| s.id == startup.id) {
            Some(existing) => {
                *existing = startup.clone();
                Ok(())
            }
            None => Err(AppError::NotFound("Startup not found".to_string())),
        }
    }

    async fn delete_startup(&self, id: &ObjectId) -> Result<(), AppError> {
        self.check("delete_startup").await?;
        self.tables.write().await.startups.retain(|s| s.id.as_ref() != Some(id));
        Ok(())
    }

    async fn push_investment(&self, startup_id: &ObjectId, investment_id: &ObjectId) -> Result<(), AppError> {
        self.check("push_investment").await?;
        let mut t = self.tables.write().await;
        if let Some(startup) = t.startups.iter_mut().find(|s| s.id.as_ref() == Some(startup_id)) {
            startup.investments.push(*investment_id);
        }
        Ok(())
    }

    // ---- financial info ----

    async fn insert_financial_info(&self, mut info: FinancialInfo) -> Result<FinancialInfo, AppError> {
        self.check("insert_financial_info").await?;
        assign_id(&mut info.id);
        self.tables.write().await.financial_infos.push(info.clone());
        Ok(info)
    }

    async fn find_financial_info(&self, startup_id: &ObjectId) -> Result<Option<FinancialInfo>, AppError> {
        self.check("find_financial_info").await?;
        let t = self.tables.read().await;
        Ok(t.financial_infos.iter().find(|f| &f.startup_id == startup_id).cloned())
    }

    async fn delete_financial_info_for_startup(&self, startup_id: &ObjectId) -> Result<(), AppError> {
        self.check("delete_financial_info_for_startup").await?;
        self.tables.write().await.financial_infos.retain(|f| &f.startup_id != startup_id);
        Ok(())
    }

    // ---- investments ----

    async fn find_investment(&self, startup_id: &ObjectId, investor_id: &str) -> Result<Option<Investment>, AppError> {
        self.check("find_investment").await?;
        let t = self.tables.read().await;
        Ok(t.investments
            .iter()
            .find(|i| &i.startup_id == startup_id && i.investor_id == investor_id)
            .cloned())
    }

    async fn insert_investment(&self, mut investment: Investment) -> Result<Investment, AppError> {
        self.check("insert_investment").await?;
        let mut t = self.tables.write().await;
        if t.investments
            .iter()
            .any(|i| i.startup_id == investment.startup_id && i.investor_id == investment.investor_id)
        {
            return Err(AppError::Conflict("Already applied to this startup".to_string()));
        }
        assign_id(&mut investment.id);
        t.investments.push(investment.clone());
        Ok(investment)
    }

    async fn list_investments_by_investor(&self, investor_id: &str) -> Result<Vec<Investment>, AppError> {
        self.check("list_investments_by_investor").await?;
        let t = self.tables.read().await;
        Ok(t.investments.iter().filter(|i| i.investor_id == investor_id).cloned().collect())
    }

    async fn list_investments_by_startup(&self, startup_id: &ObjectId) -> Result<Vec<Investment>, AppError> {
        self.check("list_investments_by_startup").await?;
        let t = self.tables.read().await;
        Ok(t.investments.iter().filter(|i| &i.startup_id == startup_id).cloned().collect())
    }

    // ---- applications ----

    async fn insert_application(&self, mut application: Application) -> Result<Application, AppError> {
        self.check("insert_application").await?;
        assign_id(&mut application.id);
        self.tables.write().await.applications.push(application.clone());
        Ok(application)
    }

    async fn find_application(&self, id: &ObjectId) -> Result<Option<Application>, AppError> {
        self.check("find_application").await?;
        let t = self.tables.read().await;
        Ok(t.applications.iter().find(|a| a.id.as_ref() == Some(id)).cloned())
    }

    async fn list_applications(&self, owner: &str) -> Result<Vec<Application>, AppError> {
        self.check("list_applications").await?;
        let t = self.tables.read().await;
        let mut rows: Vec<Application> = t.applications.iter().filter(|a| a.owner == owner).cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn mark_application_submitted(
        &self,
        id: &ObjectId,
        startup_id: Option<ObjectId>,
        submitted_at: i64,
    ) -> Result<(), AppError> {
        self.check("mark_application_submitted").await?;
        let mut t = self.tables.write().await;
        match t.applications.iter_mut().find(|a| a.id.as_ref() == Some(id)) {
            Some(application) => {
                application.status = ApplicationStatus::Submitted;
                application.submitted_at = Some(submitted_at);
                if startup_id.is_some() {
                    application.startup_id = startup_id;
                }
                Ok(())
            }
            None => Err(AppError::NotFound("Application not found".to_string())),
        }
    }

    async fn expired_applications(&self, now: i64) -> Result<Vec<Application>, AppError> {
        self.check("expired_applications").await?;
        let t = self.tables.read().await;
        Ok(t.applications
            .iter()
            .filter(|a| a.is_draft() && a.expire_at < now)
            .cloned()
            .collect())
    }

    async fn delete_application(&self, id: &ObjectId) -> Result<(), AppError> {
        self.check("delete_application").await?;
        self.tables.write().await.applications.retain(|a| a.id.as_ref() != Some(id));
        Ok(())
    }
}
