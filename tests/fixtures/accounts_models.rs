// Account models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user
#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    #[api(json = "email", validate = "required,email,max=255")]
    pub email: String,
    #[api(json = "username", validate = "required,alphanum,min=3,max=50")]
    pub username: String,
    #[api(json = "age", validate = "omitempty,gte=0,lte=150")]
    pub age: Option<u32>,
    pub status: Status,
    #[serde(flatten)]
    pub audit: Audit,
    #[serde(skip)]
    pub password_hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Audit {
    /// When the record was created
    #[api(validate = "required")]
    pub created_at: DateTime<Utc>,
    #[deprecated]
    pub legacy_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Active,
    Suspended,
    #[serde(rename = "closed")]
    PendingDeletion,
}

#[derive(Debug, Deserialize)]
pub struct GetUserRequest {
    #[api(in = "path")]
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ListUsersRequest {
    #[api(validate = "omitempty,min=1,max=100")]
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    #[api(in = "header", json = "X-Tenant-Id", validate = "required,uuid")]
    pub tenant: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[api(validate = "required,email")]
    pub email: String,
    #[api(validate = "required,alphanum,min=3,max=50")]
    pub username: String,
    #[api(validate = "omitempty,gte=0,lte=150")]
    pub age: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[api(in = "path")]
    pub id: Uuid,
    #[api(validate = "omitempty,min=3")]
    pub username: Option<String>,
    #[api(validate = "omitempty,max")]
    pub nickname: Option<String>,
}
