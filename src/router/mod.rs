//! HTTP route handlers.

pub mod feed;
pub mod login;
pub mod pins;
pub mod relationships;
pub mod signup;
pub mod status;
pub mod users;
pub mod verification;

use std::sync::LazyLock;

use axum::Json;
use axum::extract::{FromRequest, Request};
use regex_lite::Regex;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::ServerError;

static USERNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9_.]*$").expect("username regex")
});
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("phone regex"));

/// Usernames are lowercase alphanumeric with `_` and `.` separators.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME.is_match(username) {
        Ok(())
    } else {
        Err(ValidationError::new("username"))
    }
}

/// Phone numbers are E.164-ish: optional `+`, 7 to 15 digits.
pub fn validate_phone(phone_no: &str) -> Result<(), ValidationError> {
    if PHONE.is_match(phone_no) {
        Ok(())
    } else {
        Err(ValidationError::new("phone_no"))
    }
}

/// Decode an optional base64 photo field.
pub fn decode_photo(
    photo: Option<&str>,
) -> Result<Option<Vec<u8>>, ServerError> {
    use base64::Engine;

    photo
        .map(|data| {
            base64::engine::general_purpose::STANDARD
                .decode(data)
                .map_err(|_| {
                    let mut errors = validator::ValidationErrors::new();
                    errors.add(
                        "photo",
                        ValidationError::new("photo")
                            .with_message("Photo must be base64 encoded.".into()),
                    );
                    ServerError::Validation(errors)
                })
        })
        .transpose()
}

/// Extractor running a body's validators right after deserialization.
pub struct Valid<T>(pub T);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = ServerError;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;

        Ok(Valid(value))
    }
}

/// Build an [`crate::AppState`] on fakes for handler tests.
#[cfg(test)]
pub(crate) fn state(pool: sqlx::Pool<sqlx::Postgres>) -> crate::AppState {
    use std::sync::Arc;

    crate::AppState {
        config: Arc::new(crate::config::Configuration::default()),
        db: crate::database::Database { postgres: pool },
        crypto: crate::crypto::cheap(),
        storage: Arc::new(crate::storage::InMemoryStorage::new()),
        sms: Arc::new(crate::sms::StaticVerifier { code: "123456" }),
        push: Arc::new(crate::push::DisabledPush),
    }
}
