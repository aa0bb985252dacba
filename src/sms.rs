//! SMS one-time-code verification provider.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::Sms as SmsConfig;
use crate::error::{Result, ServerError};

const APPROVED: &str = "approved";

/// One-time-code delivery and verification.
#[async_trait]
pub trait SmsVerifier: Send + Sync {
    /// Send a verification code to `phone_no`.
    async fn send_code(&self, phone_no: &str) -> Result<()>;

    /// Check a code previously sent to `phone_no`.
    async fn check_code(&self, phone_no: &str, code: &str) -> Result<bool>;
}

fn sms_error(source: reqwest::Error) -> ServerError {
    ServerError::ExternalService {
        service: "sms",
        source: Box::new(source),
    }
}

#[derive(Debug, Deserialize)]
struct VerificationResponse {
    status: String,
}

/// Twilio Verify REST client.
pub struct TwilioVerifier {
    http: Client,
    account_sid: String,
    auth_token: String,
    verify_service: String,
}

impl TwilioVerifier {
    /// Create a new [`TwilioVerifier`].
    ///
    /// The auth token comes from the configuration or, failing that, the
    /// `SMS_AUTH_TOKEN` environment variable.
    pub fn new(config: &SmsConfig) -> Self {
        let auth_token = config
            .auth_token
            .clone()
            .or_else(|| std::env::var("SMS_AUTH_TOKEN").ok())
            .unwrap_or_default();

        Self {
            http: Client::new(),
            account_sid: config.account_sid.clone(),
            auth_token,
            verify_service: config.verify_service.clone(),
        }
    }

    fn service_url(&self, resource: &str) -> String {
        format!(
            "https://verify.twilio.com/v2/Services/{}/{resource}",
            self.verify_service
        )
    }
}

#[async_trait]
impl SmsVerifier for TwilioVerifier {
    async fn send_code(&self, phone_no: &str) -> Result<()> {
        self.http
            .post(self.service_url("Verifications"))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", phone_no), ("Channel", "sms")])
            .send()
            .await
            .map_err(sms_error)?
            .error_for_status()
            .map_err(sms_error)?;

        Ok(())
    }

    async fn check_code(&self, phone_no: &str, code: &str) -> Result<bool> {
        let response = self
            .http
            .post(self.service_url("VerificationCheck"))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", phone_no), ("Code", code)])
            .send()
            .await
            .map_err(sms_error)?
            .error_for_status()
            .map_err(sms_error)?
            .json::<VerificationResponse>()
            .await
            .map_err(sms_error)?;

        Ok(response.status == APPROVED)
    }
}

/// Used when no `sms` entry is configured: sends nothing, approves nothing.
pub struct DisabledSms;

#[async_trait]
impl SmsVerifier for DisabledSms {
    async fn send_code(&self, phone_no: &str) -> Result<()> {
        tracing::warn!(%phone_no, "sms provider not configured, code not sent");

        Ok(())
    }

    async fn check_code(&self, _phone_no: &str, _code: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Verifier accepting one fixed code.
#[cfg(test)]
pub struct StaticVerifier {
    pub code: &'static str,
}

#[cfg(test)]
#[async_trait]
impl SmsVerifier for StaticVerifier {
    async fn send_code(&self, _phone_no: &str) -> Result<()> {
        Ok(())
    }

    async fn check_code(&self, _phone_no: &str, code: &str) -> Result<bool> {
        Ok(code == self.code)
    }
}
