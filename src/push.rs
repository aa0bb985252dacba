//! Best-effort push notification delivery.
//!
//! Callers on a critical path must swallow delivery failures; see
//! [`PushGateway::notify_best_effort`].

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::config::Push as PushConfig;
use crate::error::{Result, ServerError};

/// Push delivery keyed by a per-user device token.
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Deliver one notification.
    async fn notify(
        &self,
        device_token: &str,
        title: &str,
        body: &str,
    ) -> Result<()>;

    /// Deliver one notification, logging instead of failing.
    async fn notify_best_effort(
        &self,
        device_token: &str,
        title: &str,
        body: &str,
    ) {
        if let Err(err) = self.notify(device_token, title, body).await {
            tracing::warn!(error = %err, "push notification not delivered");
        }
    }
}

fn push_error(source: reqwest::Error) -> ServerError {
    ServerError::ExternalService {
        service: "push",
        source: Box::new(source),
    }
}

/// FCM-style HTTP gateway client.
pub struct HttpPushGateway {
    http: Client,
    endpoint: String,
    server_key: String,
}

impl HttpPushGateway {
    /// Create a new [`HttpPushGateway`].
    ///
    /// The server key comes from the configuration or, failing that, the
    /// `PUSH_SERVER_KEY` environment variable.
    pub fn new(config: &PushConfig) -> Self {
        let server_key = config
            .server_key
            .clone()
            .or_else(|| std::env::var("PUSH_SERVER_KEY").ok())
            .unwrap_or_default();

        Self {
            http: Client::new(),
            endpoint: config.endpoint.clone(),
            server_key,
        }
    }
}

#[async_trait]
impl PushGateway for HttpPushGateway {
    async fn notify(
        &self,
        device_token: &str,
        title: &str,
        body: &str,
    ) -> Result<()> {
        self.http
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&json!({
                "to": device_token,
                "notification": { "title": title, "body": body },
            }))
            .send()
            .await
            .map_err(push_error)?
            .error_for_status()
            .map_err(push_error)?;

        Ok(())
    }
}

/// Used when no `push` entry is configured.
pub struct DisabledPush;

#[async_trait]
impl PushGateway for DisabledPush {
    async fn notify(
        &self,
        _device_token: &str,
        title: &str,
        _body: &str,
    ) -> Result<()> {
        tracing::debug!(%title, "push provider not configured, dropping");

        Ok(())
    }
}

/// Gateway recording every delivery.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingPush {
    pub sent: std::sync::Mutex<Vec<(String, String, String)>>,
}

#[cfg(test)]
#[async_trait]
impl PushGateway for RecordingPush {
    async fn notify(
        &self,
        device_token: &str,
        title: &str,
        body: &str,
    ) -> Result<()> {
        self.sent.lock().unwrap().push((
            device_token.to_owned(),
            title.to_owned(),
            body.to_owned(),
        ));

        Ok(())
    }
}
