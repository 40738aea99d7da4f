use std::collections::HashMap;
use std::sync::Arc;

use crate::api::metrics;
use crate::database::Store;
use crate::models::{
    BankInfo, BankInfoResponse, Designation, GovernmentId, GovernmentIdView, InvestorApplicationResponse,
    InvestorExistsResponse, InvestorListItem, InvestorListParams, InvestorListResponse,
    InvestorPageResponse, InvestorProfile, InvestorProfileResponse, InvestorQuery, OwnerKind,
    RegisterInvestorRequest, RegisterInvestorResponse, RegistrationData, User,
};
use crate::services::saga::Saga;
use crate::utils::pagination::{PageRequest, Pagination};
use crate::utils::validation::{parse_amount, parse_date_of_birth, present, RequiredFields};
use crate::utils::AppError;

/// The caller must be known and have a verified email.
pub async fn require_verified_user(store: &dyn Store, user_id: Option<&str>) -> Result<User, AppError> {
    let user_id = user_id.ok_or(AppError::SessionMissing)?;
    match store.find_user(user_id).await? {
        Some(user) if user.verified => Ok(user),
        _ => Err(AppError::Unverified),
    }
}

struct ValidatedRegistration {
    profile: InvestorProfile,
    govt_id_type: String,
    govt_id_value: String,
    bank: BankInfo,
}

fn validate(user_id: &str, req: &RegisterInvestorRequest, now: i64) -> Result<ValidatedRegistration, AppError> {
    let mut required = RequiredFields::new();
    let investor_type = required.take("investorType", &req.investor_type);
    let date_of_birth = required.take("dateOfBirth", &req.date_of_birth);
    let address = required.take("address", &req.address);
    let nationality = required.take("nationality", &req.nationality);
    let revenue = required.take("revenue", &req.revenue);
    let net_worth = required.take("netWorth", &req.net_worth);
    let tax_id = required.take("taxId", &req.tax_id);
    let govt_id_type = required.take("govtIdtype", &req.govt_id_type);
    let govt_id_value = required.take("govtIdValue", &req.govt_id_value);
    let bank_name = required.take("bankName", &req.bank_name);
    let account_number = required.take("accountNumber", &req.account_number);
    let account_type = required.take("accountType", &req.account_type);
    let ifsc_code = required.take("ifscCode", &req.ifsc_code);
    let branch_name = required.take("branchName", &req.branch_name);
    let swift_code = required.take("swiftCode", &req.swift_code);
    required.finish()?;

    let revenue_value = parse_amount(&revenue);
    let net_worth_value = parse_amount(&net_worth);
    let invalid: Vec<String> = [("revenue", revenue_value), ("netWorth", net_worth_value)]
        .iter()
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| name.to_string())
        .collect();
    if !invalid.is_empty() {
        return Err(AppError::invalid_fields(invalid));
    }

    parse_date_of_birth(&date_of_birth)?;

    Ok(ValidatedRegistration {
        profile: InvestorProfile {
            id: None,
            user_id: user_id.to_string(),
            investor_type,
            organisation_name: present(&req.organisation_name).map(str::to_string),
            date_of_birth,
            address,
            nationality,
            linkedin_url: present(&req.linkedin_url).map(str::to_string),
            revenue: revenue_value.unwrap_or_default(),
            net_worth: net_worth_value.unwrap_or_default(),
            tax_id,
            business_license_number: present(&req.business_license_number)
                .unwrap_or_default()
                .to_string(),
            government_id: None,
            documents: Vec::new(),
            created_at: now,
            updated_at: now,
        },
        govt_id_type,
        govt_id_value,
        bank: BankInfo {
            id: None,
            owner_kind: OwnerKind::Investor,
            owner_id: user_id.to_string(),
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

/// Registers the caller as an investor: profile, government id and bank info.
///
/// Validation and the duplicate check run before any write. Later failures
/// undo the records written so far, except a failed government id link,
/// which leaves both records in place.
pub async fn register_investor(
    store: &Arc<dyn Store>,
    user_id: Option<&str>,
    req: RegisterInvestorRequest,
) -> Result<RegisterInvestorResponse, AppError> {
    let user = require_verified_user(store.as_ref(), user_id).await?;
    let now = chrono::Utc::now().timestamp();
    let validated = validate(&user.user_id, &req, now)?;

    if store.find_investor_by_user(&user.user_id).await?.is_some() {
        return Err(AppError::Conflict("Investor profile already exists".to_string()));
    }

    let mut saga = Saga::new("investor registration");

    let mut profile = store.insert_investor(validated.profile).await?;
    let profile_id = profile
        .id
        .ok_or_else(|| AppError::Persistence("investor stored without id".to_string()))?;
    log::info!("👤 Investor profile {} created for user {}", profile_id, user.user_id);

    {
        let store = store.clone();
        saga.on_rollback("delete investor profile", move || async move {
            store.delete_investor(&profile_id).await
        });
    }

    let government_id = GovernmentId {
        id: None,
        investor_id: profile_id,
        id_type: validated.govt_id_type,
        id_value: validated.govt_id_value,
        created_at: now,
    };
    let government_id = match store.insert_government_id(government_id).await {
        Ok(g) => g,
        Err(e) => return Err(saga.abort(e).await),
    };
    let government_id_oid = match government_id.id {
        Some(id) => id,
        None => {
            let err = AppError::Persistence("government id stored without id".to_string());
            return Err(saga.abort(err).await);
        }
    };

    {
        let store = store.clone();
        saga.on_rollback("delete government id", move || async move {
            store.delete_government_id(&government_id_oid).await
        });
    }

    if let Err(e) = store.attach_government_id(&profile_id, &government_id_oid).await {
        return Err(saga.abandon(e));
    }
    profile.government_id = Some(government_id_oid);

    let bank = match store.insert_bank_info(validated.bank).await {
        Ok(b) => b,
        Err(e) => return Err(saga.abort(e).await),
    };

    saga.commit();
    metrics::increment_registration_count();
    log::info!("✅ Investor registration completed for user {}", user.user_id);

    if let Err(e) = store.set_user_designation(&user.user_id, Designation::Investor).await {
        log::warn!("⚠️  Could not set designation for {}: {}", user.user_id, e);
    }

    Ok(RegisterInvestorResponse {
        success: true,
        message: "Investor profile created successfully".to_string(),
        data: RegistrationData {
            investor_id: profile_id.to_hex(),
            user_id: user.user_id.clone(),
            personal_info: InvestorProfileResponse::new(&profile, Some(&government_id)),
            banking_info: BankInfoResponse::from(&bank),
        },
    })
}

pub async fn check_investor_exists(store: &dyn Store, user_id: &str) -> Result<InvestorExistsResponse, AppError> {
    let exists = store.find_investor_by_user(user_id).await?.is_some();
    Ok(InvestorExistsResponse {
        exists,
        message: if exists {
            "Investor profile exists".to_string()
        } else {
            "No investor profile found".to_string()
        },
    })
}

/// The caller's submitted investor application.
pub async fn investor_application(
    store: &dyn Store,
    user_id: &str,
) -> Result<InvestorApplicationResponse, AppError> {
    let profile = store
        .find_investor_by_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Investor application not found".to_string()))?;

    let government_id = match profile.government_id {
        Some(id) => store.find_government_id(&id).await?,
        None => None,
    };
    let bank = store.find_bank_info(OwnerKind::Investor, user_id).await?;

    Ok(InvestorApplicationResponse {
        investor: InvestorProfileResponse::new(&profile, government_id.as_ref()),
        bank_info: bank.as_ref().map(BankInfoResponse::from),
        status: "Under Review".to_string(),
    })
}

async fn list_items(store: &dyn Store, profiles: Vec<InvestorProfile>) -> Result<Vec<InvestorListItem>, AppError> {
    let user_ids: Vec<String> = profiles.iter().map(|p| p.user_id.clone()).collect();
    let users: HashMap<String, User> = store
        .find_users(&user_ids)
        .await?
        .into_iter()
        .map(|u| (u.user_id.clone(), u))
        .collect();

    let mut items = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let government_id = match profile.government_id {
            Some(id) => store.find_government_id(&id).await?,
            None => None,
        };
        let user = users.get(&profile.user_id);
        items.push(InvestorListItem {
            id: profile.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: profile.user_id.clone(),
            name: user.and_then(|u| u.name.clone()).unwrap_or_else(|| "N/A".to_string()),
            email: user.map(|u| u.email.clone()).unwrap_or_else(|| "N/A".to_string()),
            phone_number: user
                .and_then(|u| u.phone_number.clone())
                .unwrap_or_else(|| "N/A".to_string()),
            investor_type: profile.investor_type,
            organisation_name: profile.organisation_name,
            date_of_birth: profile.date_of_birth,
            address: profile.address,
            nationality: profile.nationality,
            linkedin_url: profile.linkedin_url,
            revenue: profile.revenue,
            net_worth: profile.net_worth,
            tax_id: profile.tax_id,
            business_license_number: profile.business_license_number,
            government_id: government_id
                .as_ref()
                .map(GovernmentIdView::from)
                .unwrap_or(GovernmentIdView { id: None, id_type: None, id_value: None }),
            is_approved: user.is_some_and(|u| u.is_approved),
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        });
    }
    Ok(items)
}

/// Every investor, newest first.
pub async fn list_investors(store: &dyn Store) -> Result<InvestorListResponse, AppError> {
    let (profiles, _) = store.list_investors(&InvestorQuery::default()).await?;
    let investors = list_items(store, profiles).await?;
    Ok(InvestorListResponse {
        success: true,
        count: investors.len(),
        investors,
    })
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn list_investors_paginated(
    store: &dyn Store,
    params: InvestorListParams,
) -> Result<InvestorPageResponse, AppError> {
    let page = PageRequest::new(params.page, params.limit)?;
    let search = blank_to_none(params.search);

    let search_user_ids = match &search {
        Some(s) => store.find_user_ids_matching(s).await?,
        None => Vec::new(),
    };

    let query = InvestorQuery {
        investor_type: blank_to_none(params.investor_type),
        nationality: blank_to_none(params.nationality),
        min_revenue: params.min_revenue,
        max_revenue: params.max_revenue,
        min_net_worth: params.min_net_worth,
        max_net_worth: params.max_net_worth,
        search,
        search_user_ids,
        page: Some(page),
    };

    let (profiles, total) = store.list_investors(&query).await?;
    let investors = list_items(store, profiles).await?;

    Ok(InvestorPageResponse {
        success: true,
        investors,
        pagination: Pagination::new(page, total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::state::testing::verified_user;

    fn full_request() -> RegisterInvestorRequest {
        serde_json::from_value(serde_json::json!({
            "investorType": "individual",
            "dateOfBirth": "1990-01-01",
            "address": "12 Market Street",
            "nationality": "Indian",
            "revenue": "1000000",
            "netWorth": 5000000,
            "taxId": "T1",
            "govtIdtype": "passport",
            "govtIdValue": "P123",
            "bankName": "B",
            "accountNumber": "123",
            "accountType": "savings",
            "ifscCode": "IFSC1",
            "branchName": "BR",
            "swiftCode": "S1"
        }))
        .unwrap()
    }

    async fn setup() -> (Arc<MemoryStore>, Arc<dyn Store>) {
        let memory = Arc::new(MemoryStore::new());
        memory.insert_user(verified_user("u1")).await;
        let store: Arc<dyn Store> = memory.clone();
        (memory, store)
    }

    #[tokio::test]
    async fn test_registration_success() {
        let (memory, store) = setup().await;

        let response = register_investor(&store, Some("u1"), full_request()).await.unwrap();

        assert!(response.success);
        let gov = response.data.personal_info.government_id.as_ref().unwrap();
        assert_eq!(gov.id_type.as_deref(), Some("passport"));
        assert_eq!(response.data.banking_info.ifsc_code, "IFSC1");
        assert_eq!(memory.counts().await, (1, 1, 1));

        let user = store.find_user("u1").await.unwrap().unwrap();
        assert_eq!(user.designation, Some(Designation::Investor));
    }

    #[tokio::test]
    async fn test_missing_field_lists_it_and_writes_nothing() {
        let (memory, store) = setup().await;
        let mut req = full_request();
        req.swift_code = None;
        req.tax_id = Some("   ".into());

        let err = register_investor(&store, Some("u1"), req).await.unwrap_err();
        match err {
            AppError::Validation { fields, .. } => {
                assert_eq!(fields, vec!["taxId".to_string(), "swiftCode".to_string()])
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(memory.counts().await, (0, 0, 0));
    }

    #[tokio::test]
    async fn test_unverified_and_missing_session() {
        let (memory, store) = setup().await;
        let mut unverified = verified_user("u2");
        unverified.verified = false;
        memory.insert_user(unverified).await;

        assert_eq!(
            register_investor(&store, Some("u2"), full_request()).await.unwrap_err(),
            AppError::Unverified
        );
        assert_eq!(
            register_investor(&store, Some("ghost"), full_request()).await.unwrap_err(),
            AppError::Unverified
        );
        assert_eq!(
            register_investor(&store, None, full_request()).await.unwrap_err(),
            AppError::SessionMissing
        );
        assert_eq!(memory.counts().await, (0, 0, 0));
    }

    #[tokio::test]
    async fn test_invalid_dob_and_amounts() {
        let (_, store) = setup().await;

        let mut future = full_request();
        future.date_of_birth = Some("2999-01-01".into());
        assert!(matches!(
            register_investor(&store, Some("u1"), future).await,
            Err(AppError::Validation { .. })
        ));

        let mut negative = full_request();
        negative.net_worth = Some("-5".into());
        match register_investor(&store, Some("u1"), negative).await {
            Err(AppError::Validation { fields, .. }) => assert_eq!(fields, vec!["netWorth".to_string()]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_repeat_registration_conflicts() {
        let (memory, store) = setup().await;
        register_investor(&store, Some("u1"), full_request()).await.unwrap();

        let err = register_investor(&store, Some("u1"), full_request()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(memory.counts().await, (1, 1, 1));
    }

    #[tokio::test]
    async fn test_bank_failure_rolls_back_profile_and_government_id() {
        let (memory, store) = setup().await;
        memory.fail_on("insert_bank_info").await;

        let err = register_investor(&store, Some("u1"), full_request()).await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
        assert_eq!(memory.counts().await, (0, 0, 0));
    }

    #[tokio::test]
    async fn test_government_id_failure_rolls_back_profile() {
        let (memory, store) = setup().await;
        memory.fail_on("insert_government_id").await;

        let err = register_investor(&store, Some("u1"), full_request()).await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
        assert_eq!(memory.counts().await, (0, 0, 0));
    }

    #[tokio::test]
    async fn test_link_failure_leaves_records() {
        let (memory, store) = setup().await;
        memory.fail_on("attach_government_id").await;

        let err = register_investor(&store, Some("u1"), full_request()).await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
        assert_eq!(memory.counts().await, (1, 1, 0));
    }

    #[tokio::test]
    async fn test_failed_compensation_keeps_persistence_error() {
        let (memory, store) = setup().await;
        memory.fail_on("insert_bank_info").await;
        memory.fail_on("delete_government_id").await;

        let err = register_investor(&store, Some("u1"), full_request()).await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(ref m) if m.contains("insert_bank_info")));
        // the profile compensation still ran
        assert_eq!(memory.counts().await, (0, 1, 0));
    }

    #[tokio::test]
    async fn test_application_and_exists() {
        let (_, store) = setup().await;
        assert!(!check_investor_exists(store.as_ref(), "u1").await.unwrap().exists);
        assert!(matches!(
            investor_application(store.as_ref(), "u1").await,
            Err(AppError::NotFound(_))
        ));

        register_investor(&store, Some("u1"), full_request()).await.unwrap();

        assert!(check_investor_exists(store.as_ref(), "u1").await.unwrap().exists);
        let application = investor_application(store.as_ref(), "u1").await.unwrap();
        assert_eq!(application.status, "Under Review");
        assert!(application.bank_info.is_some());
        assert!(application.investor.government_id.is_some());
    }

    #[tokio::test]
    async fn test_paginated_listing_searches_user_names() {
        let (memory, store) = setup().await;
        let mut alice = verified_user("u2");
        alice.name = Some("Alice Rao".into());
        memory.insert_user(alice).await;

        register_investor(&store, Some("u1"), full_request()).await.unwrap();
        register_investor(&store, Some("u2"), full_request()).await.unwrap();

        let page = list_investors_paginated(
            store.as_ref(),
            InvestorListParams { search: Some("alice".into()), ..Default::default() },
        )
        .await
        .unwrap();
        assert_eq!(page.pagination.total_items, 1);
        assert_eq!(page.investors[0].user_id, "u2");
        assert_eq!(page.investors[0].name, "Alice Rao");

        let all = list_investors(store.as_ref()).await.unwrap();
        assert_eq!(all.count, 2);

        let bad = list_investors_paginated(
            store.as_ref(),
            InvestorListParams { limit: Some(0), ..Default::default() },
        )
        .await;
        assert!(matches!(bad, Err(AppError::Validation { .. })));
    }
}
