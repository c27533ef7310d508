use serde::{Deserialize, Serialize};

use crate::dashboard::{PageGroup, Viewer};
use crate::types::{PageWithCategory, Profile};

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub profile: Profile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub viewer: Viewer,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPagesParams {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub grouped: Option<bool>,
}

/// `GET /pages` returns groups by default and a flat list with `grouped=false`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PagesResponse {
    Grouped(Vec<PageGroup>),
    Flat(Vec<PageWithCategory>),
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersParams {
    #[serde(default)]
    pub role: Option<String>,
}
