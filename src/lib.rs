//! Pindrop is a REST backend for a social pin-dropping application.

#[forbid(unsafe_code)]
#[deny(missing_docs, unused_mut)]
mod crypto;
mod database;
pub mod error;
mod feed;
mod pin;
mod push;
mod relationship;
mod router;
mod sms;
mod storage;
mod user;

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, StatusCode, header};
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

pub use error::ServerError;

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    app.oneshot(
        Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub db: database::Database,
    pub crypto: Arc<crypto::Crypto>,
    pub storage: Arc<dyn storage::ObjectStorage>,
    pub sms: Arc<dyn sms::SmsVerifier>,
    pub push: Arc<dyn push::PushGateway>,
}

impl AppState {
    /// Identity service bound to this state.
    pub fn identity(&self) -> user::IdentityService {
        user::IdentityService::new(
            self.db.postgres.clone(),
            Arc::clone(&self.crypto),
            Arc::clone(&self.storage),
        )
    }

    /// Relationship service bound to this state.
    pub fn relationships(&self) -> relationship::RelationshipService {
        relationship::RelationshipService::new(
            self.db.postgres.clone(),
            Arc::clone(&self.push),
        )
    }

    /// Pin service bound to this state.
    pub fn pins(&self) -> pin::PinService {
        pin::PinService::new(
            self.db.postgres.clone(),
            Arc::clone(&self.storage),
            Arc::clone(&self.push),
        )
    }

    /// Feed service bound to this state.
    pub fn feed(&self) -> feed::FeedService {
        feed::FeedService::new(self.db.postgres.clone(), &self.config.feed)
    }
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Remove sensitive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
                .allow_headers(Any),
        );

    // The first path segment parameter is uniformly `{id}`; handlers bind it
    // positionally (a user id or a pin id depending on the route).
    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        // Account routes.
        .route("/signup", post(router::signup::handler))
        .route("/login", post(router::login::handler))
        .route("/send-verification", post(router::verification::send))
        .route("/verify-code", post(router::verification::verify))
        .route("/username_exists/{username}", get(router::users::username_exists))
        .route("/phone_no_exists/{phone_no}", get(router::users::phone_exists))
        .route("/search/{query}", get(router::users::search))
        .route("/user/{id}/token", post(router::users::device_token))
        .route("/{id}/info", get(router::users::info))
        .route("/{id}/update", put(router::users::update))
        .route("/{id}/update_profile_pic", put(router::users::update_profile_pic))
        // Pin routes.
        .route("/{id}/pins", get(router::pins::list))
        .route("/{id}/pin/add", post(router::pins::add))
        .route("/{id}/pin/{pin_id}/info", get(router::pins::info))
        .route("/{id}/pin/{pin_id}/update", put(router::pins::update))
        .route("/{id}/pin/{pin_id}/update_loc", patch(router::pins::update_loc))
        .route("/{id}/pin/{pin_id}/delete", delete(router::pins::remove))
        .route("/{id}/likes", get(router::pins::likes))
        .route("/{id}/user/{user_id}/like", post(router::pins::like))
        .route("/{id}/user/{user_id}/unlike", delete(router::pins::unlike))
        // Relationship routes.
        .route("/{id}/requests", get(router::relationships::requests))
        .route("/{id}/request/{target_id}/status", get(router::relationships::status))
        .route("/{id}/request/{target_id}/create", post(router::relationships::create))
        .route("/{id}/request/{target_id}/accept", patch(router::relationships::accept))
        .route("/{id}/request/{target_id}/delete", delete(router::relationships::remove))
        .route("/{id}/friends", get(router::relationships::friends))
        .route("/{id}/friends/recommended", get(router::relationships::recommended))
        // Feed routes.
        .route("/{id}/pins/public", get(router::feed::public))
        .route("/{id}/pins/friends", get(router::feed::friends))
        .route("/{id}/pins/tagged", get(router::feed::tagged))
        .with_state(state)
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state() -> Result<AppState, Box<dyn std::error::Error>>
{
    // read configuration file. let it in memory.
    let config = config::Configuration::default().read()?;

    let db = match config.postgres {
        Some(ref config) => {
            database::Database::new(
                &config.address,
                &config
                    .username
                    .clone()
                    .unwrap_or(database::DEFAULT_CREDENTIALS.into()),
                &config
                    .password
                    .clone()
                    .unwrap_or(database::DEFAULT_CREDENTIALS.into()),
                &config
                    .database
                    .clone()
                    .unwrap_or(database::DEFAULT_DATABASE_NAME.into()),
                config.pool_size.unwrap_or(database::DEFAULT_POOL_SIZE),
            )
            .await?
        },
        None => {
            tracing::error!("missing `postgres` entry on `config.yaml` file");
            std::process::exit(0);
        },
    };

    // execute migrations scripts on start.
    sqlx::migrate!().run(&db.postgres).await?;

    let crypto = Arc::new(crypto::Crypto::new(config.argon2.clone())?);

    let storage: Arc<dyn storage::ObjectStorage> = match &config.storage {
        Some(cfg) => Arc::new(storage::HttpObjectStorage::new(cfg)),
        None => {
            tracing::warn!(
                "missing `storage` entry on `config.yaml` file, \
                 photos are kept in process memory"
            );
            Arc::new(storage::InMemoryStorage::new())
        },
    };

    let sms: Arc<dyn sms::SmsVerifier> = match &config.sms {
        Some(cfg) => Arc::new(sms::TwilioVerifier::new(cfg)),
        None => {
            tracing::warn!("missing `sms` entry on `config.yaml` file");
            Arc::new(sms::DisabledSms)
        },
    };

    let push: Arc<dyn push::PushGateway> = match &config.push {
        Some(cfg) => Arc::new(push::HttpPushGateway::new(cfg)),
        None => {
            tracing::warn!("missing `push` entry on `config.yaml` file");
            Arc::new(push::DisabledPush)
        },
    };

    Ok(AppState {
        config,
        db,
        crypto,
        storage,
        sms,
        push,
    })
}
