//! Background task scheduler.
//!
//! Runs periodic housekeeping: purging stale password-reset tokens and
//! refreshing database-derived metric gauges.

use sqlx::PgPool;
use tokio::time::{interval, Duration};

use crate::config::Config;
use crate::services::auth_service::AuthService;
use crate::services::metrics_service;

/// Database gauge stats for Prometheus metrics.
#[derive(Debug, sqlx::FromRow)]
struct GaugeStats {
    pub users: i64,
    pub analyses: i64,
}

/// Spawn all background tasks (fire-and-forget).
pub fn spawn_all(db: PgPool, config: Config) {
    // Stale reset-token purge (hourly)
    {
        let db = db.clone();
        let config = config.clone();
        tokio::spawn(async move {
            // Initial delay to let the server start up
            tokio::time::sleep(Duration::from_secs(30)).await;
            let service = AuthService::new(db, &config);
            let mut ticker = interval(Duration::from_secs(3600)); // 1 hour

            loop {
                ticker.tick().await;
                match service.purge_stale_reset_tokens().await {
                    Ok(0) => {}
                    Ok(removed) => {
                        tracing::info!(removed, "Purged stale password reset tokens");
                    }
                    Err(e) => {
                        tracing::warn!("Reset token purge failed: {}", e);
                    }
                }
            }
        });
    }

    // Gauge metrics updater (every 5 minutes)
    {
        let db = db.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            let mut ticker = interval(Duration::from_secs(300)); // 5 minutes

            loop {
                ticker.tick().await;
                if let Err(e) = update_gauge_metrics(&db).await {
                    tracing::warn!("Failed to update gauge metrics: {}", e);
                }
            }
        });
    }

    tracing::info!("Background schedulers started: token purge, metrics gauges");
}

/// Update Prometheus gauge metrics from database state.
async fn update_gauge_metrics(db: &PgPool) -> crate::error::Result<()> {
    let stats = sqlx::query_as::<_, GaugeStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users) as users,
            (SELECT COUNT(*) FROM analyses) as analyses
        "#,
    )
    .fetch_one(db)
    .await
    .map_err(|e| crate::error::AppError::Database(e.to_string()))?;

    metrics_service::set_usage_gauges(stats.users, stats.analyses);

    Ok(())
}
