use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Venture Registry API",
        version = "1.0.0",
        description = "Startup and investor registration service. \n\n**Authentication:** Most endpoints require a JWT Bearer token issued by the auth service.\n\n**Features:**\n- Investor registration with rollback of partial writes\n- Startup application wizard with server-side drafts\n- Investor details projection with signed document links\n- Startup and investor listings with filters and pagination",
        contact(
            name = "Venture Registry Team",
            email = "support@venture-registry.dev"
        )
    ),
    paths(
        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,

        // Investors
        crate::api::investors::list_investors,
        crate::api::investors::list_investors_paginated,
        crate::api::investors::get_investor_details,

        // Investments
        crate::api::investments::register_investor,

        // Documents
        crate::api::documents::upload_document,
        crate::api::documents::list_documents,

        // Startups
        crate::api::startups::list_startups,
        crate::api::startups::submit_startup,

        // Applications
        crate::api::applications::get_progress,
        crate::api::applications::autosave_step,
    ),
    components(
        schemas(
            crate::api::health::HealthResponse,
            crate::api::metrics::MetricsResponse,
            crate::models::RegisterInvestorRequest,
            crate::models::RegisterInvestorResponse,
            crate::models::InvestorDetails,
            crate::models::InvestorListResponse,
            crate::models::InvestorPageResponse,
            crate::models::UploadDocumentRequest,
            crate::models::DocumentUploadResponse,
            crate::models::DocumentListResponse,
            crate::models::ReviewDocumentRequest,
            crate::models::SubmitStartupRequest,
            crate::models::SubmitStartupResponse,
            crate::models::StartupPageResponse,
            crate::models::UpdateStartupRequest,
            crate::models::ProgressView,
            crate::models::StepSaveResponse,
            crate::models::ApplicationResponse,
            crate::models::ApplicationDetailResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check and service metrics."),
        (name = "Investors", description = "Investor listings and the investor details projection."),
        (name = "Investments", description = "Investor registration and applications to startups."),
        (name = "Documents", description = "Investor document upload, listing and review."),
        (name = "Startups", description = "Startup submission, listing and owner management."),
        (name = "Applications", description = "Startup application lifecycle and the step wizard."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your JWT token"))
                        .build()
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_core_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/investments/become-a-investor"));
        assert!(doc.paths.paths.contains_key("/api/v1/applications/{appId}/progress"));
    }
}
