pub mod applications;
pub mod documents;
pub mod health;
pub mod investments;
pub mod investors;
pub mod metrics;
pub mod startups;
pub mod swagger;

use actix_web::web;

use crate::middleware::AuthMiddleware;

/// Registers every `/api/v1` route.
///
/// Public resources that share a prefix with an authenticated scope are
/// registered first; a scope swallows every path under its prefix.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // ==================== PUBLIC ====================
        .service(
            web::resource("/api/v1/investments/investors/{id}/details")
                .route(web::get().to(investors::get_investor_details)),
        )
        .service(web::resource("/api/v1/startups").route(web::get().to(startups::list_startups)))
        .service(web::resource("/api/v1/files/{key}").route(web::get().to(documents::serve_file)))
        // ==================== INVESTORS ====================
        .service(
            web::scope("/api/v1/investors")
                .wrap(AuthMiddleware::required())
                .route("", web::get().to(investors::list_investors))
                .route("/paginated", web::get().to(investors::list_investors_paginated))
                .route("/{id}/details", web::get().to(investors::get_investor_details))
                .route("/{id}", web::get().to(investors::get_investor_details)),
        )
        // ==================== INVESTMENTS ====================
        .service(
            web::scope("/api/v1/investments")
                .wrap(AuthMiddleware::required())
                .route("/check-investor-exists", web::get().to(investments::check_investor_exists))
                .route("/become-a-investor", web::post().to(investments::register_investor))
                .route("/investor-application/{userId}", web::get().to(investments::get_investor_application))
                .route("/documents", web::get().to(documents::list_documents))
                .route("/documents/upload", web::post().to(documents::upload_document))
                .route("/documents/{documentId}/status", web::put().to(documents::review_document))
                .route("", web::get().to(investments::my_investments))
                .route("/{startupId}", web::post().to(investments::apply_to_startup))
                .route("/{startupId}", web::get().to(investments::startup_investments)),
        )
        // ==================== STARTUPS ====================
        .service(
            web::scope("/api/v1/startups")
                .wrap(AuthMiddleware::required())
                .route("/applications/submit", web::post().to(startups::submit_startup))
                .route("/owner/{userId}", web::get().to(startups::get_startups_by_owner))
                .route("/{id}", web::get().to(startups::get_startup))
                .route("/{id}", web::patch().to(startups::update_startup))
                .route("/{id}", web::delete().to(startups::delete_startup)),
        )
        // ==================== APPLICATIONS ====================
        // The wizard endpoints resolve the session themselves and answer
        // SessionMissing instead of 401.
        .service(
            web::scope("/api/v1/applications")
                .service(
                    web::resource("/start")
                        .wrap(AuthMiddleware::required())
                        .route(web::post().to(applications::start_application)),
                )
                .service(
                    web::resource("/application/{userId}/{appId}")
                        .wrap(AuthMiddleware::required())
                        .route(web::get().to(applications::get_application)),
                )
                .service(
                    web::resource("/complete/{appId}")
                        .wrap(AuthMiddleware::required())
                        .route(web::patch().to(applications::complete_application)),
                )
                .service(
                    web::resource("/{appId}/progress")
                        .wrap(AuthMiddleware::optional())
                        .route(web::get().to(applications::get_progress)),
                )
                .service(
                    web::resource("/{appId}/steps/{step}")
                        .wrap(AuthMiddleware::optional())
                        .route(web::put().to(applications::autosave_step)),
                )
                .service(
                    web::resource("/{appId}/steps/{step}/complete")
                        .wrap(AuthMiddleware::optional())
                        .route(web::post().to(applications::complete_step)),
                )
                .service(
                    web::resource("/{appId}/drafts")
                        .wrap(AuthMiddleware::optional())
                        .route(web::delete().to(applications::clear_drafts)),
                )
                .service(
                    web::resource("/{userId}")
                        .wrap(AuthMiddleware::required())
                        .route(web::get().to(applications::list_applications)),
                ),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth_service::issue_token;
    use crate::state::testing::{test_state, verified_user, TestState};
    use actix_web::{http::StatusCode, test, App};

    fn investor_body() -> serde_json::Value {
        serde_json::json!({
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
        })
    }

    fn bearer(ts: &TestState, user_id: &str) -> (&'static str, String) {
        let token = issue_token(&ts.state.config.jwt, user_id, 3600);
        ("Authorization", format!("Bearer {}", token))
    }

    #[actix_web::test]
    async fn test_register_investor_then_repeat_conflicts() {
        let ts = test_state();
        ts.store.insert_user(verified_user("u1")).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ts.state.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/investments/become-a-investor")
            .insert_header(bearer(&ts, "u1"))
            .set_json(investor_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/v1/investments/become-a-investor")
            .insert_header(bearer(&ts, "u1"))
            .set_json(investor_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(ts.store.counts().await, (1, 1, 1));
    }

    #[actix_web::test]
    async fn test_register_investor_reports_missing_fields() {
        let ts = test_state();
        ts.store.insert_user(verified_user("u1")).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ts.state.clone()))
                .configure(configure),
        )
        .await;

        let mut body = investor_body();
        body.as_object_mut().unwrap().remove("swiftCode");

        let req = test::TestRequest::post()
            .uri("/api/v1/investments/become-a-investor")
            .insert_header(bearer(&ts, "u1"))
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let json: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(json["missingFields"], serde_json::json!(["swiftCode"]));
        assert_eq!(ts.store.counts().await, (0, 0, 0));
    }

    #[actix_web::test]
    async fn test_wizard_without_session_is_rejected() {
        let ts = test_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ts.state.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/applications/65a1b2c3d4e5f60718293a4b/progress")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_protected_scope_requires_token() {
        let ts = test_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ts.state.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/investors").to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_public_startup_listing() {
        let ts = test_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ts.state.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/startups").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(json["success"], true);
    }

    #[actix_web::test]
    async fn test_startup_listing_rejects_out_of_range_page() {
        let ts = test_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ts.state.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/startups?page=9223372036854775807&limit=10")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let json: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(json["missingFields"], serde_json::json!(["page"]));
    }
}
