//! Payment-provider webhook handler.
//!
//! The endpoint is unauthenticated but every payload must carry a valid
//! timestamped HMAC signature. Events reconcile the stored subscription rows;
//! unknown event types are acknowledged untouched so the provider does not
//! retry them.

use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde_json::json;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::services::metrics_service;
use crate::services::payment_service::{
    verify_webhook_signature, CheckoutSession, ProviderSubscription, WebhookEvent,
};
use crate::services::subscription_service::SubscriptionService;

/// Signature header set by the payment provider.
pub const SIGNATURE_HEADER: &str = "payment-signature";

#[derive(OpenApi)]
#[openapi(paths(payment_webhook))]
pub struct WebhooksApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new().route("/payment", post(payment_webhook))
}

/// POST /api/v1/webhooks/payment
#[utoipa::path(
    post,
    path = "/payment",
    context_path = "/api/v1/webhooks",
    tag = "webhooks",
    responses(
        (status = 200, description = "Event processed or acknowledged"),
        (status = 400, description = "Missing or invalid signature"),
    ),
)]
pub async fn payment_webhook(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<serde_json::Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Validation("Missing webhook signature".to_string()))?;

    verify_webhook_signature(&state.config.payment_webhook_secret, signature, &body)?;

    let event: WebhookEvent = serde_json::from_str(&body)
        .map_err(|e| AppError::Validation(format!("Malformed webhook payload: {}", e)))?;

    metrics_service::record_webhook_event(&event.event_type);

    let subscriptions = SubscriptionService::new(state.db.clone());

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSession = serde_json::from_value(event.data.object)
                .map_err(|e| AppError::Validation(format!("Malformed checkout session: {}", e)))?;

            match user_id_from_session(&session) {
                Some(user_id) => {
                    subscriptions
                        .apply_checkout_completed(
                            user_id,
                            session.customer.as_deref(),
                            session.subscription.as_deref(),
                            session.expires_at,
                        )
                        .await?;
                }
                // Sessions opened outside our checkout flow carry no user
                // reference; acknowledge so the provider stops retrying
                None => {
                    tracing::warn!("Checkout session without usable client_reference_id, skipped");
                }
            }
        }
        "customer.subscription.updated" | "customer.subscription.deleted" => {
            let subscription: ProviderSubscription = serde_json::from_value(event.data.object)
                .map_err(|e| {
                    AppError::Validation(format!("Malformed subscription object: {}", e))
                })?;

            subscriptions
                .apply_subscription_update(
                    &subscription.id,
                    &subscription.status,
                    subscription.current_period_end,
                )
                .await?;
        }
        other => {
            tracing::debug!(event_type = other, "Ignoring unhandled webhook event");
        }
    }

    Ok(Json(json!({"received": true})))
}

fn user_id_from_session(session: &CheckoutSession) -> Option<Uuid> {
    session
        .client_reference_id
        .as_deref()
        .and_then(|id| Uuid::parse_str(id).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(client_reference_id: Option<&str>) -> CheckoutSession {
        serde_json::from_value(json!({
            "client_reference_id": client_reference_id,
            "customer": "cus_1",
            "subscription": "sub_1",
            "expires_at": 1_700_000_000
        }))
        .unwrap()
    }

    #[test]
    fn test_user_id_parses_from_reference() {
        let id = Uuid::new_v4();
        assert_eq!(
            user_id_from_session(&session(Some(&id.to_string()))),
            Some(id)
        );
    }

    #[test]
    fn test_missing_reference_yields_none() {
        assert!(user_id_from_session(&session(None)).is_none());
    }

    #[test]
    fn test_non_uuid_reference_yields_none() {
        assert!(user_id_from_session(&session(Some("customer-42"))).is_none());
    }
}
