use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Role a user takes on after completing a registration flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Designation {
    Investor,
    Owner,
}

/// Account record owned by the auth subsystem; this service only reads it
/// and updates `designation`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,  // PRIMARY IDENTIFIER - matches the JWT `sub`
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub designation: Option<Designation>,
    #[serde(default)]
    pub is_approved: bool,
}
