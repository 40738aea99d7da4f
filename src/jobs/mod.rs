pub mod application_expiry;
