mod repository;
mod service;

pub use repository::*;
pub use service::*;

use serde::{Deserialize, Serialize};

/// Stored status of a directed friendship edge.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
pub enum EdgeStatus {
    Pending = 0,
    Accepted = 1,
}

/// Directed friendship edge as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Edge {
    pub source_id: i64,
    pub target_id: i64,
    pub status: EdgeStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Relationship between a viewer and another user, as the viewer sees it.
///
/// Total classification: every pair of users maps to exactly one variant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStatus {
    None,
    PendingOutgoing,
    PendingIncoming,
    Friends,
}

/// Classify the (at most one) edge between `viewer` and another user.
///
/// An accepted edge is symmetric: both sides are friends no matter who
/// initiated it.
pub fn classify(viewer: i64, edge: Option<&Edge>) -> RelationshipStatus {
    match edge {
        None => RelationshipStatus::None,
        Some(edge) => match edge.status {
            EdgeStatus::Accepted => RelationshipStatus::Friends,
            EdgeStatus::Pending if edge.source_id == viewer => {
                RelationshipStatus::PendingOutgoing
            },
            EdgeStatus::Pending if edge.target_id == viewer => {
                RelationshipStatus::PendingIncoming
            },
            EdgeStatus::Pending => RelationshipStatus::None,
        },
    }
}
