//! Billing API handlers: checkout session creation and subscription status.

use axum::{
    extract::{Extension, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::api::middleware::auth::AuthUser;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::subscription::Subscription;
use crate::services::subscription_service::SubscriptionService;

#[derive(OpenApi)]
#[openapi(
    paths(create_checkout, get_subscription),
    components(schemas(CheckoutRequest, CheckoutResponse, SubscriptionStatusResponse, Subscription))
)]
pub struct BillingApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/checkout", post(create_checkout))
        .route("/subscription", get(get_subscription))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    /// Provider price identifier for the subscription plan
    pub price_id: String,
}

/// Hosted checkout session the client should redirect to.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub url: String,
}

/// POST /api/v1/billing/checkout
#[utoipa::path(
    post,
    path = "/checkout",
    context_path = "/api/v1/billing",
    tag = "billing",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Checkout session created", body = CheckoutResponse),
        (status = 502, description = "Payment provider unavailable"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn create_checkout(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let price_id = payload.price_id.trim();
    if price_id.is_empty() {
        return Err(AppError::Validation("price_id is required".to_string()));
    }

    let url = state
        .payments
        .create_checkout_session(auth.user_id, &auth.email, price_id)
        .await?;

    tracing::info!(user_id = %auth.user_id, "Checkout session created");
    Ok(Json(CheckoutResponse { url }))
}

/// Current subscription state for the caller's profile page.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionStatusResponse {
    /// Whether the caller may run analyses right now
    pub entitled: bool,
    pub subscription: Option<Subscription>,
}

/// GET /api/v1/billing/subscription
#[utoipa::path(
    get,
    path = "/subscription",
    context_path = "/api/v1/billing",
    tag = "billing",
    responses((status = 200, description = "Subscription status", body = SubscriptionStatusResponse)),
    security(("bearer_auth" = [])),
)]
pub async fn get_subscription(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<SubscriptionStatusResponse>> {
    let service = SubscriptionService::new(state.db.clone());
    let subscription = service.get_for_user(auth.user_id).await?;
    let entitled = subscription
        .as_ref()
        .map(|s| s.is_entitled(chrono::Utc::now()))
        .unwrap_or(false);

    Ok(Json(SubscriptionStatusResponse {
        entitled,
        subscription,
    }))
}
