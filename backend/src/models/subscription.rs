//! Subscription model reconciled from payment-provider webhooks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Subscription statuses that entitle access to contract analysis.
pub const ENTITLED_STATUSES: &[&str] = &["active", "trialing"];

/// A user's subscription row. At most one per user; webhook events upsert it.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider_customer_id: Option<String>,
    pub provider_subscription_id: Option<String>,
    /// Provider status verbatim: "active", "trialing", "past_due", "canceled", ...
    pub status: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether this subscription entitles the user to run analyses right now.
    ///
    /// The status must be one of the entitled statuses and the billing period,
    /// when known, must not have ended.
    pub fn is_entitled(&self, now: DateTime<Utc>) -> bool {
        if !ENTITLED_STATUSES.contains(&self.status.as_str()) {
            return false;
        }
        match self.current_period_end {
            Some(end) => end >= now,
            None => true,
        }
    }
}
