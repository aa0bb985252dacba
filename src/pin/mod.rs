mod repository;
mod service;

pub use repository::*;
pub use service::*;

use serde::{Deserialize, Serialize};

/// Access level of a pin.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::Type,
)]
#[repr(i32)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Private = 0,
    Friends = 1,
    Public = 2,
}

/// Geotagged post as saved on database.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
pub struct Pin {
    pub id: i64,
    pub user_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub title: String,
    pub caption: Option<String>,
    pub photo: Option<String>,
    pub visibility: Visibility,
    pub location_tags: Vec<String>,
    pub user_tags: Vec<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub edited_at: chrono::DateTime<chrono::Utc>,
}

/// Public profile summary of a pin's author, joined into feed queries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Author {
    pub username: String,
    pub full_name: String,
    pub profile_pic: Option<String>,
}

/// A pin paired with its author's public profile summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeedPin {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub pin: Pin,
    #[sqlx(flatten)]
    pub author: Author,
}
