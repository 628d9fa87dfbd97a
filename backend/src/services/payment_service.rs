//! Payment provider client: hosted checkout sessions and webhook events.
//!
//! The provider is reached over its form-encoded REST API with a bearer
//! secret key. Webhook payloads are authenticated with the provider's
//! timestamped HMAC-SHA256 signature scheme before any event is applied.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age of a signed webhook payload, in seconds.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// A webhook event envelope. Only the event type and raw object are decoded
/// here; per-event payloads are extracted by the handler.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

/// Checkout session object carried by `checkout.session.completed`.
#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    /// Our user id, passed through checkout as the client reference
    pub client_reference_id: Option<String>,
    pub customer: Option<String>,
    pub subscription: Option<String>,
    /// Session expiry as epoch seconds; used as the period-end fallback
    pub expires_at: Option<i64>,
}

/// Subscription object carried by `customer.subscription.updated` / `.deleted`.
#[derive(Debug, Deserialize)]
pub struct ProviderSubscription {
    pub id: String,
    pub status: String,
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionResponse {
    url: Option<String>,
}

/// HTTP client for the payment provider.
pub struct PaymentClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
    public_url: String,
}

impl PaymentClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.payment_base_url.trim_end_matches('/').to_string(),
            secret_key: config.payment_secret_key.clone(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a hosted subscription-checkout session and return its URL.
    ///
    /// The user id rides along as `client_reference_id` so the completion
    /// webhook can attribute the purchase.
    pub async fn create_checkout_session(
        &self,
        user_id: Uuid,
        customer_email: &str,
        price_id: &str,
    ) -> Result<String> {
        let url = format!("{}/v1/checkout/sessions", self.base_url);

        let params: Vec<(&str, String)> = vec![
            ("line_items[0][price]", price_id.to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("mode", "subscription".to_string()),
            ("success_url", format!("{}/?success=true", self.public_url)),
            (
                "cancel_url",
                format!("{}/pricing?canceled=true", self.public_url),
            ),
            ("client_reference_id", user_id.to_string()),
            ("customer_email", customer_email.to_string()),
        ];

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Payment(format!(
                "checkout session creation returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let session: CheckoutSessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Payment(format!("invalid provider response: {}", e)))?;

        session
            .url
            .ok_or_else(|| AppError::Payment("checkout session has no URL".to_string()))
    }
}

/// Verify a webhook signature header of the form `t=<unix>,v1=<hex>` against
/// the raw request body.
///
/// The signed payload is `"{t}.{body}"`; the MAC comparison is constant-time
/// and the timestamp must be within the tolerance window in either direction.
pub fn verify_webhook_signature(secret: &str, header: &str, body: &str) -> Result<()> {
    verify_webhook_signature_at(secret, header, body, Utc::now().timestamp())
}

fn verify_webhook_signature_at(secret: &str, header: &str, body: &str, now: i64) -> Result<()> {
    let mut timestamp: Option<i64> = None;
    let mut signature: Option<Vec<u8>> = None;

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signature = hex::decode(value).ok(),
            _ => {}
        }
    }

    let (timestamp, signature) = match (timestamp, signature) {
        (Some(t), Some(s)) => (t, s),
        _ => {
            return Err(AppError::Validation(
                "Malformed webhook signature header".to_string(),
            ))
        }
    };

    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(AppError::Validation(
            "Webhook signature timestamp outside tolerance".to_string(),
        ));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("HMAC key error: {}", e)))?;
    mac.update(format!("{}.{}", timestamp, body).as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AppError::Validation("Invalid webhook signature".to_string()))
}
