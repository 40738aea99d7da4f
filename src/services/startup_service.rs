use mongodb::bson::oid::ObjectId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::database::{DraftStore, Store};
use crate::models::{
    Application, BankInfo, Designation, FinancialInfo, OwnerKind, OwnerSummary, Startup,
    StartupListParams, StartupOwner, StartupPage, StartupPageResponse, StartupQuery, StartupStatus,
    StartupView, SubmitStartupRequest, SubmitStartupResponse, UpdateStartupRequest, User,
};
use crate::services::investor_service::require_verified_user;
use crate::services::saga::Saga;
use crate::utils::pagination::Pagination;
use crate::utils::validation::{parse_amount, parse_date_of_birth, present, RequiredFields};
use crate::utils::AppError;

fn parse_startup_id(id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id).map_err(|_| AppError::NotFound("Startup not found".to_string()))
}

struct ValidatedSubmission {
    owner: StartupOwner,
    startup: Startup,
    financial: FinancialInfo,
    bank: BankInfo,
}

/// Validates every section at once; missing fields come back as `section.field`.
fn validate_submission(user_id: &str, req: &SubmitStartupRequest, now: i64) -> Result<ValidatedSubmission, AppError> {
    let mut required = RequiredFields::new();

    let p = &req.personal;
    let date_of_birth = required.take("personal.dateOfBirth", &p.date_of_birth);
    let personal_address = required.take("personal.address", &p.address);
    let nationality = required.take("personal.nationality", &p.nationality);

    let o = &req.organization;
    let startup_name = required.take("organization.startupName", &o.startup_name);
    let description = required.take("organization.description", &o.description);
    let business_type = required.take("organization.businessType", &o.business_type);
    let industry = required.take("organization.industry", &o.industry);
    let address = required.take("organization.address", &o.address);
    let country = required.take("organization.country", &o.country);
    let website = required.take("organization.website", &o.website);

    let f = &req.financial;
    let revenue = required.take("financial.revenue", &f.revenue);
    let profit_margin = required.take("financial.profitMargin", &f.profit_margin);
    let funding_received = required.take("financial.fundingReceived", &f.funding_received);
    let valuation = required.take("financial.valuation", &f.valuation);
    let financial_year = required.take("financial.financialYear", &f.financial_year);

    let b = &req.banking;
    let bank_name = required.take("banking.bankName", &b.bank_name);
    let account_number = required.take("banking.accountNumber", &b.account_number);
    let account_type = required.take("banking.accountType", &b.account_type);
    let ifsc_code = required.take("banking.ifscCode", &b.ifsc_code);
    let branch_name = required.take("banking.branchName", &b.branch_name);
    let swift_code = required.take("banking.swiftCode", &b.swift_code);

    required.finish()?;

    let mut invalid = Vec::new();
    let mut amount = |name: &str, value: &str| {
        parse_amount(value).unwrap_or_else(|| {
            invalid.push(format!("financial.{}", name));
            0.0
        })
    };
    let revenue = amount("revenue", &revenue);
    let funding_received = amount("fundingReceived", &funding_received);
    let valuation = amount("valuation", &valuation);
    let profit_margin = match profit_margin.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            invalid.push("financial.profitMargin".to_string());
            0.0
        }
    };
    if !invalid.is_empty() {
        return Err(AppError::invalid_fields(invalid));
    }

    parse_date_of_birth(&date_of_birth)?;

    let date_of_establishment = present(&o.date_of_establishment)
        .map(str::to_string)
        .unwrap_or_else(|| chrono::Utc::now().format("%Y-%m-%d").to_string());

    Ok(ValidatedSubmission {
        owner: StartupOwner {
            id: None,
            user_id: user_id.to_string(),
            date_of_birth,
            address: personal_address,
            nationality,
            linkedin_url: present(&p.linkedin_url).map(str::to_string),
            created_at: now,
        },
        startup: Startup {
            id: None,
            owner: user_id.to_string(),
            startup_name,
            description,
            business_type,
            industry,
            address,
            country,
            website,
            valuation,
            date_of_establishment,
            status: StartupStatus::Pending,
            investments: Vec::new(),
            documents: req.documents.clone(),
            created_at: now,
            updated_at: now,
        },
        financial: FinancialInfo {
            id: None,
            // assigned once the startup exists
            startup_id: ObjectId::new(),
            revenue,
            profit_margin,
            funding_received,
            valuation,
            financial_year,
        },
        bank: BankInfo {
            id: None,
            owner_kind: OwnerKind::Startup,
            owner_id: String::new(),
            bank_name,
            account_number,
            account_type,
            ifsc_code,
            branch_name,
            swift_code,
            created_at: now,
        },
    })
}

/// The draft application a submission completes, when one is named.
async fn submittable_application(
    store: &dyn Store,
    user_id: &str,
    application_id: Option<&str>,
) -> Result<Option<Application>, AppError> {
    let Some(raw) = application_id.map(str::trim).filter(|id| !id.is_empty() && *id != "new") else {
        return Ok(None);
    };
    let not_found = || AppError::NotFound("Application not found".to_string());
    let id = ObjectId::parse_str(raw).map_err(|_| not_found())?;
    let application = store.find_application(&id).await?.ok_or_else(not_found)?;
    if application.owner != user_id {
        return Err(not_found());
    }
    if !application.is_draft() {
        return Err(AppError::Conflict("Application has already been submitted".to_string()));
    }
    Ok(Some(application))
}

/// Registers a startup with its owner, bank and financial records.
///
/// Records written before a failing step are deleted again in reverse
/// order. Marking the application and the user designation afterwards are
/// best effort.
pub async fn submit_startup(
    store: &Arc<dyn Store>,
    drafts: &dyn DraftStore,
    user_id: Option<&str>,
    req: SubmitStartupRequest,
) -> Result<SubmitStartupResponse, AppError> {
    let user = require_verified_user(store.as_ref(), user_id).await?;
    let now = chrono::Utc::now().timestamp();
    let validated = validate_submission(&user.user_id, &req, now)?;
    let application = submittable_application(store.as_ref(), &user.user_id, req.application_id.as_deref()).await?;

    let mut saga = Saga::new("startup submission");

    if store.find_startup_owner(&user.user_id).await?.is_none() {
        let owner = store.insert_startup_owner(validated.owner).await?;
        if let Some(owner_id) = owner.id {
            let store = store.clone();
            saga.on_rollback("delete startup owner", move || async move {
                store.delete_startup_owner(&owner_id).await
            });
        }
        log::info!("👤 Startup owner created for user {}", user.user_id);
    }

    let startup = match store.insert_startup(validated.startup).await {
        Ok(s) => s,
        Err(e) => return Err(saga.abort(e).await),
    };
    let startup_id = match startup.id {
        Some(id) => id,
        None => {
            let err = AppError::Persistence("startup stored without id".to_string());
            return Err(saga.abort(err).await);
        }
    };
    {
        let store = store.clone();
        saga.on_rollback("delete startup", move || async move { store.delete_startup(&startup_id).await });
    }

    let bank = BankInfo { owner_id: startup_id.to_hex(), ..validated.bank };
    let bank = match store.insert_bank_info(bank).await {
        Ok(b) => b,
        Err(e) => return Err(saga.abort(e).await),
    };
    if let Some(bank_id) = bank.id {
        let store = store.clone();
        saga.on_rollback("delete startup bank info", move || async move {
            store.delete_bank_info(&bank_id).await
        });
    }

    let financial = FinancialInfo { startup_id, ..validated.financial };
    if let Err(e) = store.insert_financial_info(financial).await {
        return Err(saga.abort(e).await);
    }

    saga.commit();
    log::info!("🚀 Startup {} registered by {}", startup_id, user.user_id);

    if let Some(application) = &application {
        if let Some(application_id) = application.id {
            if let Err(e) = store
                .mark_application_submitted(&application_id, Some(startup_id), now)
                .await
            {
                log::error!("❌ Could not mark application {} submitted: {}", application_id, e);
            } else if let Err(e) = drafts.clear(&user.user_id, &application_id.to_hex()).await {
                log::warn!("⚠️  Could not clear drafts of application {}: {}", application_id, e);
            }
        }
    }

    if let Err(e) = store.set_user_designation(&user.user_id, Designation::Owner).await {
        log::warn!("⚠️  Could not set designation for {}: {}", user.user_id, e);
    }

    Ok(SubmitStartupResponse {
        success: true,
        message: "startup has been registered successfully".to_string(),
        startup_id: startup_id.to_hex(),
    })
}

async fn with_owners(store: &dyn Store, startups: &[Startup]) -> Result<Vec<StartupView>, AppError> {
    let mut owner_ids: Vec<String> = startups.iter().map(|s| s.owner.clone()).collect();
    owner_ids.sort();
    owner_ids.dedup();

    let users: HashMap<String, User> = store
        .find_users(&owner_ids)
        .await?
        .into_iter()
        .map(|u| (u.user_id.clone(), u))
        .collect();

    let mut owners: HashMap<String, OwnerSummary> = HashMap::new();
    for user_id in &owner_ids {
        let Some(record) = store.find_startup_owner(user_id).await? else {
            continue;
        };
        let user = users.get(user_id);
        owners.insert(
            user_id.clone(),
            OwnerSummary {
                id: record.id.map(|id| id.to_hex()).unwrap_or_default(),
                name: user.and_then(|u| u.name.clone()).unwrap_or_else(|| "N/A".to_string()),
                email: user.map(|u| u.email.clone()).unwrap_or_else(|| "N/A".to_string()),
                linked_in: record.linkedin_url,
            },
        );
    }

    Ok(startups
        .iter()
        .map(|s| StartupView::new(s, owners.get(&s.owner).cloned()))
        .collect())
}

/// Public startup listing with filters, sort and pagination.
pub async fn list_startups(store: &dyn Store, params: StartupListParams) -> Result<StartupPageResponse, AppError> {
    let query = StartupQuery::from_params(params)?;
    let (startups, total) = store.list_startups(&query).await?;
    let startups = with_owners(store, &startups).await?;

    Ok(StartupPageResponse {
        success: true,
        message: if total > 0 {
            "Startups fetched successfully".to_string()
        } else {
            "No startups found".to_string()
        },
        data: StartupPage {
            startups,
            pagination: Pagination::new(query.page, total),
        },
    })
}

pub async fn get_startup(store: &dyn Store, id: &str) -> Result<StartupView, AppError> {
    let id = parse_startup_id(id)?;
    let startup = store
        .find_startup(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Startup not found".to_string()))?;
    let mut views = with_owners(store, std::slice::from_ref(&startup)).await?;
    views
        .pop()
        .ok_or_else(|| AppError::NotFound("Startup not found".to_string()))
}

pub async fn startups_by_owner(store: &dyn Store, user_id: &str) -> Result<Vec<StartupView>, AppError> {
    let startups = store.find_startups_by_owner(user_id).await?;
    if startups.is_empty() {
        return Err(AppError::NotFound("No startups found".to_string()));
    }
    with_owners(store, &startups).await
}

async fn owned_startup(store: &dyn Store, caller: &str, id: &str, action: &str) -> Result<Startup, AppError> {
    let id = parse_startup_id(id)?;
    let startup = store
        .find_startup(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Startup not found".to_string()))?;
    if startup.owner != caller {
        return Err(AppError::Forbidden(format!("You are not authorized to {} this startup", action)));
    }
    Ok(startup)
}

pub async fn update_startup(
    store: &dyn Store,
    caller: &str,
    id: &str,
    req: UpdateStartupRequest,
) -> Result<StartupView, AppError> {
    let mut startup = owned_startup(store, caller, id, "update").await?;
    if req.is_empty() {
        return Err(AppError::validation("No fields to update"));
    }

    req.apply(&mut startup);
    startup.updated_at = chrono::Utc::now().timestamp();
    store.update_startup(&startup).await?;
    log::info!("✏️  Startup {:?} updated by {}", startup.id, caller);

    let mut views = with_owners(store, std::slice::from_ref(&startup)).await?;
    views
        .pop()
        .ok_or_else(|| AppError::NotFound("Startup not found".to_string()))
}

/// Deletes the startup together with its bank and financial records.
pub async fn delete_startup(store: &dyn Store, caller: &str, id: &str) -> Result<(), AppError> {
    let startup = owned_startup(store, caller, id, "delete").await?;
    let startup_id = startup
        .id
        .ok_or_else(|| AppError::Persistence("startup stored without id".to_string()))?;

    store
        .delete_bank_info_for_owner(OwnerKind::Startup, &startup_id.to_hex())
        .await?;
    store.delete_financial_info_for_startup(&startup_id).await?;
    store.delete_startup(&startup_id).await?;

    log::info!("🗑️  Startup {} deleted by {}", startup_id, caller);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApplicationStatus;
    use crate::state::testing::{test_state, verified_user, TestState};

    fn request() -> SubmitStartupRequest {
        serde_json::from_value(serde_json::json!({
            "personal": {
                "dateOfBirth": "1988-05-20",
                "address": "4 Lake Road",
                "nationality": "Indian",
                "linkedInURL": "https://linkedin.com/in/founder"
            },
            "organization": {
                "startupName": "Acme Robotics",
                "description": "Warehouse robots",
                "businessType": "private",
                "industry": "Robotics",
                "address": "9 Tech Park",
                "country": "India",
                "website": "https://acme.example",
                "dateOfEstablishment": "2020-01-01"
            },
            "financial": {
                "revenue": 100000,
                "profitMargin": "12.5",
                "fundingReceived": "50000",
                "valuation": 2000000,
                "financialYear": "2024"
            },
            "banking": {
                "bankName": "State Bank",
                "accountNumber": 12345678,
                "accountType": "current",
                "ifscCode": "SBIN0001234",
                "branchName": "Main",
                "swiftCode": "SBININBB"
            },
            "documents": { "startupLogo": "logo.png" }
        }))
        .unwrap()
    }

    async fn setup() -> TestState {
        let t = test_state();
        t.store.insert_user(verified_user("founder")).await;
        t
    }

    #[tokio::test]
    async fn test_submit_creates_every_record() {
        let t = setup().await;

        let response = submit_startup(&t.state.store, t.drafts.as_ref(), Some("founder"), request())
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(t.store.startup_counts().await, (1, 1, 1, 1));
        let view = get_startup(t.state.store.as_ref(), &response.startup_id).await.unwrap();
        assert_eq!(view.name, "Acme Robotics");
        assert_eq!(view.valuation, 2_000_000.0);
        assert_eq!(view.logo.as_deref(), Some("logo.png"));
        assert_eq!(view.owner.unwrap().linked_in.as_deref(), Some("https://linkedin.com/in/founder"));

        let bank = t
            .state
            .store
            .find_bank_info(OwnerKind::Startup, &response.startup_id)
            .await
            .unwrap();
        assert!(bank.is_some());
        let user = t.state.store.find_user("founder").await.unwrap().unwrap();
        assert_eq!(user.designation, Some(Designation::Owner));
    }

    #[tokio::test]
    async fn test_missing_fields_are_section_prefixed() {
        let t = setup().await;
        let mut req = request();
        req.banking.swift_code = None;
        req.organization.website = Some(" ".into());

        match submit_startup(&t.state.store, t.drafts.as_ref(), Some("founder"), req).await {
            Err(AppError::Validation { fields, .. }) => assert_eq!(
                fields,
                vec!["organization.website".to_string(), "banking.swiftCode".to_string()]
            ),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(t.store.startup_counts().await, (0, 0, 0, 0));
    }

    #[tokio::test]
    async fn test_financial_failure_rolls_back() {
        let t = setup().await;
        t.store.fail_on("insert_financial_info").await;

        let err = submit_startup(&t.state.store, t.drafts.as_ref(), Some("founder"), request())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
        assert_eq!(t.store.startup_counts().await, (0, 0, 0, 0));
    }

    #[tokio::test]
    async fn test_existing_owner_is_kept_on_rollback() {
        let t = setup().await;
        submit_startup(&t.state.store, t.drafts.as_ref(), Some("founder"), request())
            .await
            .unwrap();
        t.store.fail_on("insert_bank_info").await;

        let err = submit_startup(&t.state.store, t.drafts.as_ref(), Some("founder"), request())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
        assert_eq!(t.store.startup_counts().await, (1, 1, 1, 1));
    }

    #[tokio::test]
    async fn test_submission_completes_application() {
        let t = setup().await;
        let application = t
            .state
            .store
            .insert_application(Application {
                id: None,
                owner: "founder".into(),
                status: ApplicationStatus::Draft,
                startup_id: None,
                created_at: 0,
                expire_at: i64::MAX,
                submitted_at: None,
            })
            .await
            .unwrap();
        let app_id = application.id.unwrap();

        let mut req = request();
        req.application_id = Some(app_id.to_hex());
        let response = submit_startup(&t.state.store, t.drafts.as_ref(), Some("founder"), req.clone())
            .await
            .unwrap();

        let stored = t.state.store.find_application(&app_id).await.unwrap().unwrap();
        assert_eq!(stored.status, ApplicationStatus::Submitted);
        assert_eq!(stored.startup_id.map(|id| id.to_hex()), Some(response.startup_id));

        let again = submit_startup(&t.state.store, t.drafts.as_ref(), Some("founder"), req).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_owner_only_update_and_delete() {
        let t = setup().await;
        let id = submit_startup(&t.state.store, t.drafts.as_ref(), Some("founder"), request())
            .await
            .unwrap()
            .startup_id;
        let store = t.state.store.as_ref();

        let rename = UpdateStartupRequest { startup_name: Some("Acme Labs".into()), ..Default::default() };
        assert!(matches!(
            update_startup(store, "intruder", &id, rename.clone()).await,
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(update_startup(store, "founder", &id, rename).await.unwrap().name, "Acme Labs");

        assert!(matches!(delete_startup(store, "intruder", &id).await, Err(AppError::Forbidden(_))));
        delete_startup(store, "founder", &id).await.unwrap();
        assert_eq!(t.store.startup_counts().await, (1, 0, 0, 0));
        assert!(matches!(get_startup(store, &id).await, Err(AppError::NotFound(_))));
        assert!(matches!(startups_by_owner(store, "founder").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_listing_filters_and_validates() {
        let t = setup().await;
        submit_startup(&t.state.store, t.drafts.as_ref(), Some("founder"), request())
            .await
            .unwrap();
        let store = t.state.store.as_ref();

        let hit = list_startups(
            store,
            StartupListParams { keyword: Some("warehouse".into()), ..Default::default() },
        )
        .await
        .unwrap();
        assert_eq!(hit.data.pagination.total_items, 1);
        assert_eq!(hit.data.startups[0].owner.as_ref().unwrap().name, "User founder");

        let miss = list_startups(
            store,
            StartupListParams { status: Some("approved".into()), ..Default::default() },
        )
        .await
        .unwrap();
        assert_eq!(miss.message, "No startups found");

        let bad = list_startups(
            store,
            StartupListParams { sort_by: Some("owner".into()), ..Default::default() },
        )
        .await;
        assert!(matches!(bad, Err(AppError::Validation { .. })));
    }
}
