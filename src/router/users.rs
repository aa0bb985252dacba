//! Users-related HTTP API.

use axum::extract::{Path, State};
use axum::{Json, http::StatusCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::router::{Valid, decode_photo};
use crate::user::{Profile, ProfileUpdate, User};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct InfoResponse {
    pub message: String,
    pub user: User,
}

/// `GET /{user_id}/info`
pub async fn info(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<InfoResponse>> {
    let user = state.identity().profile(user_id).await?;

    Ok(Json(InfoResponse {
        message: "User info retrieved successfully".to_owned(),
        user,
    }))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateBody {
    #[validate(
        length(min = 2, max = 32),
        custom(
            function = "crate::router::validate_username",
            message = "Username must be lowercase alphanumeric."
        )
    )]
    pub username: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,
    #[validate(length(min = 8, max = 255))]
    pub password: Option<String>,
    pub birthday: Option<NaiveDate>,
    #[validate(custom(
        function = "crate::router::validate_phone",
        message = "Phone number must be 7 to 15 digits."
    ))]
    pub phone_no: Option<String>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `PUT /{user_id}/update`
pub async fn update(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Valid(body): Valid<UpdateBody>,
) -> Result<Json<MessageResponse>> {
    state
        .identity()
        .update_profile(
            user_id,
            ProfileUpdate {
                username: body.username,
                full_name: body.full_name,
                password: body.password,
                birthday: body.birthday,
                phone_no: body.phone_no,
            },
        )
        .await?;

    Ok(Json(MessageResponse {
        message: "User updated successfully".to_owned(),
    }))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ProfilePicBody {
    /// Base64 photo bytes; absent clears the current picture.
    pub photo: Option<String>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfilePicResponse {
    pub message: String,
    pub profile_pic: Option<String>,
}

/// `PUT /{user_id}/update_profile_pic`
pub async fn update_profile_pic(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Valid(body): Valid<ProfilePicBody>,
) -> Result<Json<ProfilePicResponse>> {
    let bytes = decode_photo(body.photo.as_deref())?;
    let profile_pic = state
        .identity()
        .update_profile_picture(user_id, bytes)
        .await?;

    Ok(Json(ProfilePicResponse {
        message: "Profile picture updated successfully".to_owned(),
        profile_pic,
    }))
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ExistsResponse {
    pub message: String,
    pub exists: bool,
}

/// `GET /username_exists/{username}`
pub async fn username_exists(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ExistsResponse>> {
    let available = state.identity().username_available(&username).await?;

    Ok(Json(ExistsResponse {
        message: "Username checked successfully".to_owned(),
        exists: !available,
    }))
}

/// `GET /phone_no_exists/{phone_no}`
pub async fn phone_exists(
    State(state): State<AppState>,
    Path(phone_no): Path<String>,
) -> Result<Json<ExistsResponse>> {
    let available = state.identity().phone_available(&phone_no).await?;

    Ok(Json(ExistsResponse {
        message: "Phone number checked successfully".to_owned(),
        exists: !available,
    }))
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub message: String,
    pub users: Vec<Profile>,
}

/// `GET /search/{query}`
pub async fn search(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> Result<Json<SearchResponse>> {
    let users = state.identity().search(&query).await?;

    Ok(Json(SearchResponse {
        message: "Search completed successfully".to_owned(),
        users,
    }))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TokenBody {
    #[validate(length(min = 1, max = 4096))]
    pub token: String,
}

/// `POST /user/{user_id}/token`
pub async fn device_token(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Valid(body): Valid<TokenBody>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    state
        .identity()
        .register_device_token(user_id, &body.token)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Device token registered successfully".to_owned(),
        }),
    ))
}
