//! Pins-related HTTP API.

use axum::extract::{Path, State};
use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::pin::{Pin, PinAttrs, Visibility};
use crate::router::{Valid, decode_photo};
use crate::user::Profile;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PinBody {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(max = 2048))]
    pub caption: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub location_tags: Vec<String>,
    #[serde(default)]
    pub user_tags: Vec<i64>,
    /// Base64 photo bytes.
    pub photo: Option<String>,
}

impl PinBody {
    fn into_parts(self) -> (PinAttrs, Option<String>) {
        (
            PinAttrs {
                latitude: self.latitude,
                longitude: self.longitude,
                title: self.title,
                caption: self.caption,
                visibility: self.visibility,
                location_tags: self.location_tags,
                user_tags: self.user_tags,
            },
            self.photo,
        )
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct PinResponse {
    pub message: String,
    pub pin: Pin,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `POST /{user_id}/pin/add`
pub async fn add(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Valid(body): Valid<PinBody>,
) -> Result<(StatusCode, Json<PinResponse>)> {
    let (attrs, photo) = body.into_parts();
    let photo = decode_photo(photo.as_deref())?;
    let pin = state.pins().create_pin(user_id, attrs, photo).await?;

    Ok((
        StatusCode::CREATED,
        Json(PinResponse {
            message: "Pin created successfully".to_owned(),
            pin,
        }),
    ))
}

/// `GET /{user_id}/pin/{pin_id}/info`
pub async fn info(
    State(state): State<AppState>,
    Path((user_id, pin_id)): Path<(i64, i64)>,
) -> Result<Json<PinResponse>> {
    let pin = state.pins().pin(user_id, pin_id).await?;

    Ok(Json(PinResponse {
        message: "Pin info retrieved successfully".to_owned(),
        pin,
    }))
}

/// `PUT /{user_id}/pin/{pin_id}/update`
pub async fn update(
    State(state): State<AppState>,
    Path((user_id, pin_id)): Path<(i64, i64)>,
    Valid(body): Valid<PinBody>,
) -> Result<Json<PinResponse>> {
    let (attrs, photo) = body.into_parts();
    let photo = decode_photo(photo.as_deref())?;
    let pin = state
        .pins()
        .update_pin(user_id, pin_id, attrs, photo)
        .await?;

    Ok(Json(PinResponse {
        message: "Pin updated successfully".to_owned(),
        pin,
    }))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LocationBody {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

/// `PATCH /{user_id}/pin/{pin_id}/update_loc`
pub async fn update_loc(
    State(state): State<AppState>,
    Path((user_id, pin_id)): Path<(i64, i64)>,
    Valid(body): Valid<LocationBody>,
) -> Result<Json<MessageResponse>> {
    state
        .pins()
        .update_location(user_id, pin_id, body.latitude, body.longitude)
        .await?;

    Ok(Json(MessageResponse {
        message: "Pin location updated successfully".to_owned(),
    }))
}

/// `DELETE /{user_id}/pin/{pin_id}/delete`
pub async fn remove(
    State(state): State<AppState>,
    Path((user_id, pin_id)): Path<(i64, i64)>,
) -> Result<Json<MessageResponse>> {
    state.pins().delete_pin(user_id, pin_id).await?;

    Ok(Json(MessageResponse {
        message: "Pin deleted successfully".to_owned(),
    }))
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct PinsResponse {
    pub message: String,
    pub pins: Vec<Pin>,
}

/// `GET /{user_id}/pins`
pub async fn list(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<PinsResponse>> {
    let pins = state.pins().pins_by_owner(user_id).await?;

    Ok(Json(PinsResponse {
        message: "Pins retrieved successfully".to_owned(),
        pins,
    }))
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct LikesResponse {
    pub message: String,
    pub count: usize,
    pub users: Vec<Profile>,
}

/// `GET /{pin_id}/likes`
pub async fn likes(
    State(state): State<AppState>,
    Path(pin_id): Path<i64>,
) -> Result<Json<LikesResponse>> {
    let users = state.pins().likes(pin_id).await?;

    Ok(Json(LikesResponse {
        message: "Likes retrieved successfully".to_owned(),
        count: users.len(),
        users,
    }))
}

/// `POST /{pin_id}/user/{user_id}/like`
pub async fn like(
    State(state): State<AppState>,
    Path((pin_id, user_id)): Path<(i64, i64)>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    state.pins().like(user_id, pin_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Pin liked successfully".to_owned(),
        }),
    ))
}

/// `DELETE /{pin_id}/user/{user_id}/unlike`
pub async fn unlike(
    State(state): State<AppState>,
    Path((pin_id, user_id)): Path<(i64, i64)>,
) -> Result<Json<MessageResponse>> {
    state.pins().unlike(user_id, pin_id).await?;

    Ok(Json(MessageResponse {
        message: "Pin unliked successfully".to_owned(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::signup;
    use crate::*;
    use axum::Router;
    use axum::http::Method;
    use http_body_util::BodyExt;
    use serde_json::json;
    use sqlx::{Pool, Postgres};

    async fn signup_user(app: Router, username: &str, phone_no: &str) -> i64 {
        let response = make_request(
            app,
            Method::POST,
            "/signup",
            json!(signup::tests::body(username, phone_no)).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: signup::Response = serde_json::from_slice(&bytes).unwrap();
        parsed.id
    }

    fn pin_json(longitude: f64) -> serde_json::Value {
        json!({
            "latitude": 48.8584,
            "longitude": longitude,
            "title": "Tour Eiffel",
            "caption": "sunset",
            "visibility": "public",
            "location_tags": ["paris"],
        })
    }

    async fn add_pin(app: Router, owner: i64, longitude: f64) -> Pin {
        let response = make_request(
            app,
            Method::POST,
            &format!("/{owner}/pin/add"),
            pin_json(longitude).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: PinResponse = serde_json::from_slice(&bytes).unwrap();
        parsed.pin
    }

    #[sqlx::test]
    async fn test_pin_crud_roundtrip(pool: Pool<Postgres>) {
        let app = app(router::state(pool));
        let owner = signup_user(app.clone(), "ada", "+15550000001").await;

        let pin = add_pin(app.clone(), owner, 2.2945).await;
        assert_eq!(pin.title, "Tour Eiffel");
        assert_eq!(pin.visibility, Visibility::Public);

        // Round-trip: every submitted field comes back unchanged.
        let response = make_request(
            app.clone(),
            Method::GET,
            &format!("/{owner}/pin/{}/info", pin.id),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let fetched: PinResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(fetched.pin, pin);

        // Narrow location update.
        let response = make_request(
            app.clone(),
            Method::PATCH,
            &format!("/{owner}/pin/{}/update_loc", pin.id),
            json!({ "latitude": 40.6892, "longitude": -74.0445 }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        // Delete once, then the pin is gone.
        let response = make_request(
            app.clone(),
            Method::DELETE,
            &format!("/{owner}/pin/{}/delete", pin.id),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = make_request(
            app,
            Method::DELETE,
            &format!("/{owner}/pin/{}/delete", pin.id),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    async fn test_add_duplicate_location(pool: Pool<Postgres>) {
        let app = app(router::state(pool));
        let owner = signup_user(app.clone(), "ada", "+15550000001").await;

        add_pin(app.clone(), owner, 2.2945).await;
        let response = make_request(
            app,
            Method::POST,
            &format!("/{owner}/pin/add"),
            pin_json(2.2945).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[sqlx::test]
    async fn test_list_newest_first(pool: Pool<Postgres>) {
        let app = app(router::state(pool));
        let owner = signup_user(app.clone(), "ada", "+15550000001").await;

        let first = add_pin(app.clone(), owner, 1.0).await;
        let second = add_pin(app.clone(), owner, 2.0).await;

        let response = make_request(
            app,
            Method::GET,
            &format!("/{owner}/pins"),
            String::new(),
        )
        .await;
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: PinsResponse = serde_json::from_slice(&bytes).unwrap();
        let ids: Vec<i64> = parsed.pins.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[sqlx::test]
    async fn test_like_flow(pool: Pool<Postgres>) {
        let app = app(router::state(pool));
        let owner = signup_user(app.clone(), "ada", "+15550000001").await;
        let fan = signup_user(app.clone(), "grace", "+15550000002").await;

        let pin = add_pin(app.clone(), owner, 2.2945).await;

        let response = make_request(
            app.clone(),
            Method::POST,
            &format!("/{}/user/{fan}/like", pin.id),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = make_request(
            app.clone(),
            Method::GET,
            &format!("/{}/likes", pin.id),
            String::new(),
        )
        .await;
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: LikesResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.count, 1);
        assert_eq!(parsed.users[0].username, "grace");

        let response = make_request(
            app.clone(),
            Method::DELETE,
            &format!("/{}/user/{fan}/unlike", pin.id),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        // Liking a pin that does not exist is a 404.
        let response = make_request(
            app,
            Method::POST,
            &format!("/4242/user/{fan}/like"),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
