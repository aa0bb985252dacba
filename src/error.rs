//! Error handler for pindrop.

use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sqlx::Error as SQLxError;
use thiserror::Error;
use validator::ValidationErrors;

pub type Result<T> = std::result::Result<T, ServerError>;

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Axum(#[from] JsonRejection),

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("{0}")]
    Conflict(String),

    #[error("invalid username or password")]
    InvalidCredential,

    #[error("{service} request failed")]
    ExternalService {
        service: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("SQL request failed: {0}")]
    Sql(SQLxError),

    #[error("internal server error, {details}")]
    Internal { details: String },
}

impl From<SQLxError> for ServerError {
    fn from(err: SQLxError) -> Self {
        match &err {
            SQLxError::RowNotFound => ServerError::NotFound { entity: "row" },
            SQLxError::Database(db) if db.is_unique_violation() => {
                ServerError::Conflict("resource already exists".into())
            },
            _ => ServerError::Sql(err),
        }
    }
}

/// Structure for error responses.
#[derive(Debug, Serialize)]
pub struct ResponseError {
    message: String,
    status: u16,
    errors: Option<Vec<FieldError>>,
}

impl ResponseError {
    /// Update error status code.
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code.as_u16();
        self
    }

    /// Update `message` field.
    pub fn message(mut self, message: &str) -> Self {
        self.message = message.into();
        self
    }

    /// Automatically add errors field.
    pub fn errors(mut self, errors: &ValidationErrors) -> Self {
        self.errors = Some(parse_validation_errors(errors));
        self
    }

    /// Transform [`ResponseError`] into axum [`Response`].
    pub fn into_response(self) -> std::result::Result<Response, axum::http::Error> {
        if let Ok(body) = serde_json::to_string(&self) {
            Response::builder()
                .status(self.status)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
        } else {
            Ok(internal_server_error())
        }
    }
}

impl Default for ResponseError {
    fn default() -> Self {
        Self {
            message: "Internal server error".to_owned(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            errors: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct FieldError {
    field: String,
    message: String,
}

fn parse_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| FieldError {
                field: field.to_string(),
                message: issue.to_string(),
            })
        })
        .collect()
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let response = ResponseError::default()
            .message(&self.to_string())
            .status(StatusCode::BAD_REQUEST);

        let response = match &self {
            ServerError::Validation(validation_errors) => response
                .message("There were validation errors with your request.")
                .errors(validation_errors),

            ServerError::Axum(err) => response.message(&err.body_text()),

            ServerError::NotFound { .. } => response.status(StatusCode::NOT_FOUND),

            ServerError::Conflict(_) => response.status(StatusCode::CONFLICT),

            ServerError::InvalidCredential => response,

            ServerError::ExternalService { service, source } => {
                tracing::error!(%service, error = %source, "external service failed");

                ResponseError::default()
            },

            ServerError::Sql(err) => {
                tracing::error!(error = %err, "SQL request failed");

                ResponseError::default()
            },

            ServerError::Internal { details } => {
                tracing::error!(%details, "server returned 500 status");

                ResponseError::default()
            },
        };

        response
            .into_response()
            .unwrap_or_else(|_| internal_server_error())
    }
}

fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(
            serde_json::json!({
                "message": "Internal server error",
                "status": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                "errors": null,
            })
            .to_string()
            .into(),
        )
        .unwrap_or_else(|_| Response::new("Internal server error".into()))
}
