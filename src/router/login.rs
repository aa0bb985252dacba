use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::router::Valid;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(length(min = 2, max = 32))]
    pub username: String,
    #[validate(length(min = 1, max = 255))]
    pub password: String,
}

/// Minimal public profile; the hashed credential never travels.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub message: String,
    pub id: i64,
    pub username: String,
    pub phone_no: String,
}

/// Handler to check credentials.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>> {
    let user = state
        .identity()
        .authenticate(&body.username, &body.password)
        .await?;

    Ok(Json(Response {
        message: "User logged in successfully".to_owned(),
        id: user.id,
        username: user.username,
        phone_no: user.phone_no,
    }))
}
