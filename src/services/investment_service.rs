use mongodb::bson::oid::ObjectId;

use crate::database::Store;
use crate::models::{Investment, InvestmentListResponse, InvestmentResponse, InvestmentView, StartupView};
use crate::utils::AppError;

fn parse_startup_id(id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id).map_err(|_| AppError::NotFound("Startup not found".to_string()))
}

/// Records the caller's interest in a startup. One investment per pair.
pub async fn apply_to_startup(store: &dyn Store, investor_id: &str, startup_id: &str) -> Result<InvestmentResponse, AppError> {
    let startup_id = parse_startup_id(startup_id)?;

    if store.find_investment(&startup_id, investor_id).await?.is_some() {
        return Err(AppError::Conflict("Already applied to this startup".to_string()));
    }
    let startup = store
        .find_startup(&startup_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Startup not found".to_string()))?;

    let investment = store
        .insert_investment(Investment {
            id: None,
            startup_id,
            investor_id: investor_id.to_string(),
            created_at: chrono::Utc::now().timestamp(),
        })
        .await?;

    if let Some(investment_id) = investment.id {
        store.push_investment(&startup_id, &investment_id).await?;
    }
    log::info!("💼 Investor {} applied to startup {}", investor_id, startup_id);

    Ok(InvestmentResponse {
        success: true,
        message: "Applied to startup successfully".to_string(),
        investment: InvestmentView::new(&investment, Some(StartupView::new(&startup, None))),
    })
}

/// Caller's investments, each with its startup when it still exists.
pub async fn my_investments(store: &dyn Store, investor_id: &str) -> Result<InvestmentListResponse, AppError> {
    let investments = store.list_investments_by_investor(investor_id).await?;

    let mut views = Vec::with_capacity(investments.len());
    for investment in &investments {
        let startup = store.find_startup(&investment.startup_id).await?;
        views.push(InvestmentView::new(
            investment,
            startup.as_ref().map(|s| StartupView::new(s, None)),
        ));
    }

    Ok(InvestmentListResponse {
        success: true,
        count: views.len(),
        investments: views,
    })
}

pub async fn startup_investments(store: &dyn Store, startup_id: &str) -> Result<InvestmentListResponse, AppError> {
    let startup_id = parse_startup_id(startup_id)?;
    let investments = store.list_investments_by_startup(&startup_id).await?;
    let views: Vec<InvestmentView> = investments.iter().map(|i| InvestmentView::new(i, None)).collect();

    Ok(InvestmentListResponse {
        success: true,
        count: views.len(),
        investments: views,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::models::{Startup, StartupDocuments, StartupStatus};

    async fn startup(store: &MemoryStore) -> String {
        store
            .insert_startup(Startup {
                id: None,
                owner: "founder".into(),
                startup_name: "Acme".into(),
                description: "d".into(),
                business_type: "private".into(),
                industry: "Robotics".into(),
                address: "a".into(),
                country: "India".into(),
                website: "https://acme.example".into(),
                valuation: 1.0,
                date_of_establishment: "2020-01-01".into(),
                status: StartupStatus::Approved,
                investments: vec![],
                documents: StartupDocuments::default(),
                created_at: 0,
                updated_at: 0,
            })
            .await
            .unwrap()
            .id
            .unwrap()
            .to_hex()
    }

    #[tokio::test]
    async fn test_apply_once_per_startup() {
        let store = MemoryStore::new();
        let id = startup(&store).await;

        let applied = apply_to_startup(&store, "inv1", &id).await.unwrap();
        assert_eq!(applied.investment.startup_id, id);
        assert!(matches!(
            apply_to_startup(&store, "inv1", &id).await,
            Err(AppError::Conflict(_))
        ));

        let stored = store.find_startup(&ObjectId::parse_str(&id).unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.investments.len(), 1);

        let mine = my_investments(&store, "inv1").await.unwrap();
        assert_eq!(mine.count, 1);
        assert_eq!(mine.investments[0].startup.as_ref().unwrap().name, "Acme");

        assert_eq!(startup_investments(&store, &id).await.unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_unknown_startup() {
        let store = MemoryStore::new();
        assert!(matches!(
            apply_to_startup(&store, "inv1", &ObjectId::new().to_hex()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            apply_to_startup(&store, "inv1", "not-an-id").await,
            Err(AppError::NotFound(_))
        ));
    }
}
