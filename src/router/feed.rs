//! Feed-related HTTP API.

use axum::Json;
use axum::extract::{Path, State};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::Result;
use crate::pin::FeedPin;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedResponse {
    pub message: String,
    pub pins: Vec<FeedPin>,
}

/// `GET /{user_id}/pins/public`
pub async fn public(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<FeedResponse>> {
    let mut rng = StdRng::from_entropy();
    let pins = state.feed().public_pins(user_id, &mut rng).await?;

    Ok(Json(FeedResponse {
        message: "Public pins retrieved successfully".to_owned(),
        pins,
    }))
}

/// `GET /{user_id}/pins/friends`
pub async fn friends(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<FeedResponse>> {
    let pins = state.feed().friend_pins(user_id).await?;

    Ok(Json(FeedResponse {
        message: "Friend pins retrieved successfully".to_owned(),
        pins,
    }))
}

/// `GET /{user_id}/pins/tagged`
pub async fn tagged(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<FeedResponse>> {
    let pins = state.feed().tagged_pins(user_id).await?;

    Ok(Json(FeedResponse {
        message: "Tagged pins retrieved successfully".to_owned(),
        pins,
    }))
}
