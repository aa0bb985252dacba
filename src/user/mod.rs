mod repository;
mod service;

pub use repository::*;
pub use service::*;

use serde::{Deserialize, Serialize};

/// User as saved on database.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    #[serde(skip)]
    pub password: String,
    pub birthday: Option<chrono::NaiveDate>,
    pub phone_no: String,
    pub profile_pic: Option<String>,
    #[serde(skip)]
    pub device_token: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Subset of [`User`] safe to embed in any response.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
pub struct Profile {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub profile_pic: Option<String>,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            profile_pic: user.profile_pic,
        }
    }
}
