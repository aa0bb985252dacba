use axum::{Json, extract::State, http::StatusCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::router::Valid;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(
        length(min = 2, max = 32),
        custom(
            function = "crate::router::validate_username",
            message = "Username must be lowercase alphanumeric."
        )
    )]
    pub username: String,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be 1 to 100 characters long."
    ))]
    pub full_name: String,
    #[validate(length(
        min = 8,
        max = 255,
        message = "Password must contain at least 8 characters."
    ))]
    pub password: String,
    pub birthday: Option<NaiveDate>,
    #[validate(custom(
        function = "crate::router::validate_phone",
        message = "Phone number must be 7 to 15 digits."
    ))]
    pub phone_no: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub message: String,
    pub id: i64,
}

/// Handler to register a new user.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<Response>)> {
    let id = state
        .identity()
        .register(
            &body.username,
            &body.full_name,
            &body.password,
            body.birthday,
            &body.phone_no,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Response {
            message: "User registered successfully".to_owned(),
            id,
        }),
    ))
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;
    use crate::*;
    use axum::http::Method;
    use http_body_util::BodyExt;
    use serde_json::json;
    use sqlx::{Pool, Postgres};

    pub fn body(username: &str, phone_no: &str) -> Body {
        Body {
            username: username.into(),
            full_name: "Ada Lovelace".into(),
            password: "s3cret-pass".into(),
            birthday: Some("1815-12-10".parse().unwrap()),
            phone_no: phone_no.into(),
        }
    }

    #[sqlx::test]
    async fn test_signup_handler(pool: Pool<Postgres>) {
        let app = app(router::state(pool));

        let response = make_request(
            app,
            Method::POST,
            "/signup",
            json!(body("ada", "+15550000001")).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: Response = serde_json::from_slice(&bytes).unwrap();
        assert!(parsed.id > 0);
    }

    #[sqlx::test]
    async fn test_signup_duplicate_username(pool: Pool<Postgres>) {
        let app = app(router::state(pool));

        let response = make_request(
            app.clone(),
            Method::POST,
            "/signup",
            json!(body("ada", "+15550000001")).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = make_request(
            app,
            Method::POST,
            "/signup",
            json!(body("ada", "+15550000002")).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[sqlx::test]
    async fn test_signup_rejects_weak_body(pool: Pool<Postgres>) {
        let app = app(router::state(pool));

        let mut short_password = body("ada", "+15550000001");
        short_password.password = "short".into();
        let response = make_request(
            app.clone(),
            Method::POST,
            "/signup",
            json!(short_password).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = make_request(
            app,
            Method::POST,
            "/signup",
            json!(body("Ada Lovelace!", "+15550000001")).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
