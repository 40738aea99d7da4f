pub mod application_service;
pub mod auth_service;
pub mod document_service;
pub mod investment_service;
pub mod investor_details_service;
pub mod investor_service;
pub mod saga;
pub mod startup_service;
pub mod storage_service;
pub mod wizard_service;
