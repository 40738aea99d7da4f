use mongodb::bson::oid::ObjectId;

use crate::database::Store;
use crate::models::{
    BankInfoResponse, Document, DocumentView, FinancialInformation, InvestorDetails, InvestorProfile,
    OwnerKind, PersonalInformation,
};
use crate::services::storage_service::ObjectStorage;
use crate::utils::AppError;

/// Looks the profile up by user id, then by profile id.
pub async fn resolve_investor(store: &dyn Store, id_or_user_id: &str) -> Result<InvestorProfile, AppError> {
    if let Some(profile) = store.find_investor_by_user(id_or_user_id).await? {
        return Ok(profile);
    }

    if let Ok(oid) = ObjectId::parse_str(id_or_user_id) {
        if let Some(profile) = store.find_investor_by_id(&oid).await? {
            return Ok(profile);
        }
    }

    Err(AppError::NotFound("Investor not found".to_string()))
}

async fn investor_documents(store: &dyn Store, profile: &InvestorProfile, profile_id: &ObjectId) -> Result<Vec<Document>, AppError> {
    let documents = store.find_documents_by_owner(OwnerKind::Investor, profile_id).await?;
    if !documents.is_empty() || profile.documents.is_empty() {
        return Ok(documents);
    }

    // Older profiles only embed the ids
    let mut resolved = Vec::with_capacity(profile.documents.len());
    for id in &profile.documents {
        if let Some(doc) = store.find_document(id).await? {
            resolved.push(doc);
        }
    }
    Ok(resolved)
}

/// Signs each document's file independently; a failure only blanks that document's URL.
pub async fn sign_documents(storage: &dyn ObjectStorage, documents: &[Document]) -> Vec<DocumentView> {
    let mut views = Vec::with_capacity(documents.len());
    for doc in documents {
        let url = if doc.file_name.is_empty() {
            None
        } else {
            match storage.signed_url(&doc.file_name).await {
                Ok(url) => Some(url),
                Err(e) => {
                    log::warn!("⚠️  Could not sign URL for document {:?}: {}", doc.id, e);
                    None
                }
            }
        };
        views.push(DocumentView::new(doc, url));
    }
    views
}

/// Denormalized investor view: profile, contact data, government id, bank info and documents.
pub async fn investor_details(
    store: &dyn Store,
    storage: &dyn ObjectStorage,
    id_or_user_id: &str,
) -> Result<InvestorDetails, AppError> {
    let profile = resolve_investor(store, id_or_user_id).await?;
    let profile_id = profile
        .id
        .ok_or_else(|| AppError::Persistence("investor stored without id".to_string()))?;

    let user = store.find_user(&profile.user_id).await?;
    let government_id = match profile.government_id {
        Some(id) => store.find_government_id(&id).await?,
        None => None,
    };
    let bank = store.find_bank_info(OwnerKind::Investor, &profile.user_id).await?;
    let documents = investor_documents(store, &profile, &profile_id).await?;
    let documents = sign_documents(storage, &documents).await;

    log::debug!(
        "🔎 Investor {} projected with {} document(s)",
        profile_id,
        documents.len()
    );

    Ok(InvestorDetails {
        investor_id: profile_id.to_hex(),
        user_id: profile.user_id.clone(),
        personal_information: PersonalInformation {
            full_name: user
                .as_ref()
                .and_then(|u| u.name.clone())
                .unwrap_or_else(|| "N/A".to_string()),
            investor_type: profile.investor_type.clone(),
            organization_name: profile.organisation_name.clone(),
            phone_number: user.as_ref().and_then(|u| u.phone_number.clone()),
            email: user.as_ref().map(|u| u.email.clone()),
            address: profile.address.clone(),
            date_of_birth: profile.date_of_birth.clone(),
            nationality: profile.nationality.clone(),
            linked_in: profile.linkedin_url.clone(),
        },
        financial_information: FinancialInformation {
            revenue: profile.revenue,
            net_worth: profile.net_worth,
            business_license_number: profile.business_license_number.clone(),
            tax_payer_identification: profile.tax_id.clone(),
            id_type: government_id.as_ref().map(|g| g.id_type.clone()),
            id_value: government_id.as_ref().map(|g| g.id_value.clone()),
        },
        banking_information: bank.as_ref().map(BankInfoResponse::from),
        documents,
    })
}
