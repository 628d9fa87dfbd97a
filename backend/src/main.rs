//! LeaseGuard backend entry point.

mod api;
mod config;
mod db;
mod error;
mod models;
mod services;

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api::AppState;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::services::ai_service::AiClient;
use crate::services::email_service::EmailService;
use crate::services::payment_service::PaymentClient;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,leaseguard_backend=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let db = db::connect(&config.database_url).await?;

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| AppError::Config(format!("metrics recorder setup failed: {}", e)))?;

    services::scheduler_service::spawn_all(db.clone(), config.clone());

    let state = Arc::new(AppState {
        ai: AiClient::new(&config),
        payments: PaymentClient::new(&config),
        mailer: EmailService::new(&config)?,
        db,
        metrics,
        config,
    });

    let addr = format!("0.0.0.0:{}", state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr, "LeaseGuard API listening");

    axum::serve(listener, api::router(state))
        .await
        .map_err(|e| AppError::Internal(format!("server error: {}", e)))?;

    Ok(())
}
