//! Subscription storage and webhook reconciliation.
//!
//! The payment provider is the source of truth; webhook events land here and
//! are folded into the single subscription row each user owns.

use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::subscription::Subscription;

/// Period-end fallback applied when a completed checkout session carries no
/// expiry: one billing cycle from now.
const FALLBACK_PERIOD_DAYS: i64 = 30;

/// Service for subscription rows.
pub struct SubscriptionService {
    db: PgPool,
}

impl SubscriptionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Fetch a user's subscription, if any.
    pub async fn get_for_user(&self, user_id: Uuid) -> Result<Option<Subscription>> {
        let subscription: Option<Subscription> = sqlx::query_as(
            r#"
            SELECT id, user_id, provider_customer_id, provider_subscription_id,
                   status, current_period_end, created_at, updated_at
            FROM subscriptions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(subscription)
    }

    /// Whether the user currently holds an entitled subscription.
    pub async fn is_entitled(&self, user_id: Uuid) -> Result<bool> {
        Ok(self
            .get_for_user(user_id)
            .await?
            .map(|s| s.is_entitled(Utc::now()))
            .unwrap_or(false))
    }

    /// Reconcile a completed checkout session: upsert the user's subscription
    /// as active, recording the provider's customer and subscription ids.
    pub async fn apply_checkout_completed(
        &self,
        user_id: Uuid,
        customer_id: Option<&str>,
        subscription_id: Option<&str>,
        session_expires_at: Option<i64>,
    ) -> Result<()> {
        let period_end = period_end_from_epoch(session_expires_at)
            .unwrap_or_else(|| Utc::now() + Duration::days(FALLBACK_PERIOD_DAYS));

        sqlx::query(
            r#"
            INSERT INTO subscriptions
                (user_id, provider_customer_id, provider_subscription_id, status, current_period_end)
            VALUES ($1, $2, $3, 'active', $4)
            ON CONFLICT (user_id) DO UPDATE SET
                provider_customer_id = EXCLUDED.provider_customer_id,
                provider_subscription_id = EXCLUDED.provider_subscription_id,
                status = 'active',
                current_period_end = EXCLUDED.current_period_end,
                updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(customer_id)
        .bind(subscription_id)
        .bind(period_end)
        .execute(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(%user_id, "Subscription activated from checkout");
        Ok(())
    }

    /// Reconcile a provider subscription update or deletion: set the new
    /// status and period end on the matching row. Returns the number of rows
    /// touched (one for known subscriptions, zero for strangers).
    pub async fn apply_subscription_update(
        &self,
        provider_subscription_id: &str,
        status: &str,
        current_period_end: Option<i64>,
    ) -> Result<u64> {
        let period_end = period_end_from_epoch(current_period_end);

        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $2,
                current_period_end = COALESCE($3, current_period_end),
                updated_at = now()
            WHERE provider_subscription_id = $1
            "#,
        )
        .bind(provider_subscription_id)
        .bind(status)
        .bind(period_end)
        .execute(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let rows = result.rows_affected();
        if rows == 0 {
            tracing::warn!(
                provider_subscription_id,
                "Subscription event for unknown subscription"
            );
        } else {
            tracing::info!(provider_subscription_id, status, "Subscription updated");
        }
        Ok(rows)
    }
}

/// Convert a provider epoch-seconds timestamp into a UTC datetime.
fn period_end_from_epoch(epoch: Option<i64>) -> Option<DateTime<Utc>> {
    epoch.and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_conversion() {
        let dt = period_end_from_epoch(Some(1_767_225_600)).unwrap();
        assert_eq!(dt.timestamp(), 1_767_225_600);
    }

    #[test]
    fn test_missing_epoch_is_none() {
        assert!(period_end_from_epoch(None).is_none());
    }

    #[test]
    fn test_out_of_range_epoch_is_none() {
        assert!(period_end_from_epoch(Some(i64::MAX)).is_none());
    }
}
