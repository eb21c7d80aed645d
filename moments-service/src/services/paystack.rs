//! Paystack payment provider client.
//!
//! Implements transaction initialization, the verify endpoint, and webhook
//! signature verification (HMAC-SHA512 of the raw body with the secret key).

use anyhow::{anyhow, Result};
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::Sha512;

use crate::config::PaystackConfig;

#[derive(Clone)]
pub struct PaystackClient {
    client: Client,
    config: PaystackConfig,
}

/// Request body for `POST /transaction/initialize`.
#[derive(Debug, Serialize)]
struct InitializeRequest<'a> {
    email: &'a str,
    /// Amount in the smallest currency unit (kobo).
    amount: i64,
    currency: &'a str,
    reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_url: Option<&'a str>,
}

/// Paystack's standard response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    message: String,
    data: Option<T>,
}

/// Checkout handoff returned by initialization.
#[derive(Debug, Deserialize)]
pub struct Authorization {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// Charge state as reported by the verify endpoint and webhook payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct Charge {
    pub id: i64,
    pub reference: String,
    /// "success", "failed", "abandoned", ...
    pub status: String,
    pub amount: i64,
    pub currency: String,
    pub channel: Option<String>,
    pub paid_at: Option<String>,
}

/// A webhook event; only `charge.success` is acted on.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub data: Charge,
}

impl PaystackClient {
    pub fn new(config: PaystackConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.secret_key.expose_secret().is_empty()
    }

    /// Create a checkout session for `reference`.
    pub async fn initialize_transaction(
        &self,
        email: &str,
        amount: i64,
        currency: &str,
        reference: &str,
        callback_url: Option<&str>,
    ) -> Result<Authorization> {
        if !self.is_configured() {
            return Err(anyhow!("Paystack secret key not configured"));
        }

        let url = format!("{}/transaction/initialize", self.config.api_base_url);
        let request = InitializeRequest {
            email,
            amount,
            currency,
            reference,
            callback_url,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(status = %status, "Paystack initialize response");

        if !status.is_success() {
            return Err(anyhow!("Paystack initialize failed ({}): {}", status, body));
        }

        let envelope: Envelope<Authorization> = serde_json::from_str(&body)?;
        if !envelope.status {
            return Err(anyhow!("Paystack initialize rejected: {}", envelope.message));
        }
        envelope
            .data
            .ok_or_else(|| anyhow!("Paystack initialize returned no data"))
    }

    /// Ask Paystack for the final state of a charge.
    pub async fn verify_transaction(&self, reference: &str) -> Result<Charge> {
        if !self.is_configured() {
            return Err(anyhow!("Paystack secret key not configured"));
        }

        let url = format!(
            "{}/transaction/verify/{}",
            self.config.api_base_url,
            urlencoding::encode(reference)
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(status = %status, reference = %reference, "Paystack verify response");

        if !status.is_success() {
            return Err(anyhow!("Paystack verify failed ({}): {}", status, body));
        }

        let envelope: Envelope<Charge> = serde_json::from_str(&body)?;
        if !envelope.status {
            return Err(anyhow!("Paystack verify rejected: {}", envelope.message));
        }
        envelope
            .data
            .ok_or_else(|| anyhow!("Paystack verify returned no data"))
    }

    /// Verify the `x-paystack-signature` header: HMAC-SHA512 of the raw
    /// request body keyed with the secret key, hex-encoded.
    pub fn verify_webhook_signature(&self, body: &str, signature: &str) -> Result<bool> {
        let expected = self.compute_signature(body)?;
        Ok(expected == signature)
    }

    pub fn parse_webhook_event(&self, body: &str) -> Result<WebhookEvent> {
        let event: WebhookEvent = serde_json::from_str(body)?;
        Ok(event)
    }

    fn compute_signature(&self, payload: &str) -> Result<String> {
        type HmacSha512 = Hmac<Sha512>;
        let mut mac =
            HmacSha512::new_from_slice(self.config.secret_key.expose_secret().as_bytes())
                .map_err(|_| anyhow!("Invalid key length"))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}
