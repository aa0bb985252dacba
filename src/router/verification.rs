//! Phone number verification through the SMS provider.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::router::Valid;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SendBody {
    #[validate(custom(
        function = "crate::router::validate_phone",
        message = "Phone number must be 7 to 15 digits."
    ))]
    pub phone_no: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct VerifyBody {
    #[validate(custom(
        function = "crate::router::validate_phone",
        message = "Phone number must be 7 to 15 digits."
    ))]
    pub phone_no: String,
    #[validate(length(min = 4, max = 10))]
    pub code: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub message: String,
}

/// Handler to send a one-time code.
pub async fn send(
    State(state): State<AppState>,
    Valid(body): Valid<SendBody>,
) -> Result<Json<Response>> {
    state.sms.send_code(&body.phone_no).await?;

    Ok(Json(Response {
        message: "Verification code sent".to_owned(),
    }))
}

/// Handler to check a one-time code.
pub async fn verify(
    State(state): State<AppState>,
    Valid(body): Valid<VerifyBody>,
) -> Result<Json<Response>> {
    if !state.sms.check_code(&body.phone_no, &body.code).await? {
        let mut errors = ValidationErrors::new();
        errors.add(
            "code",
            ValidationError::new("code")
                .with_message("Verification code is wrong or expired.".into()),
        );
        return Err(ServerError::Validation(errors));
    }

    Ok(Json(Response {
        message: "Phone number verified".to_owned(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::*;
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use sqlx::{Pool, Postgres};

    #[sqlx::test]
    async fn test_verify_code(pool: Pool<Postgres>) {
        let app = app(router::state(pool));

        let response = make_request(
            app.clone(),
            Method::POST,
            "/send-verification",
            json!({ "phone_no": "+15550000001" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        // The test verifier accepts exactly one code.
        let response = make_request(
            app.clone(),
            Method::POST,
            "/verify-code",
            json!({ "phone_no": "+15550000001", "code": "123456" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = make_request(
            app,
            Method::POST,
            "/verify-code",
            json!({ "phone_no": "+15550000001", "code": "654321" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
