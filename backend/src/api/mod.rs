//! HTTP API: shared state, router assembly and middleware wiring.

pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod validation;

use std::sync::Arc;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::services::ai_service::AiClient;
use crate::services::email_service::EmailService;
use crate::services::payment_service::PaymentClient;

/// Application state shared by all handlers.
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub ai: AiClient,
    pub payments: PaymentClient,
    pub mailer: EmailService,
    pub metrics: PrometheusHandle,
}

pub type SharedState = Arc<AppState>;

/// Assemble the full application router.
pub fn router(state: SharedState) -> Router {
    // Everything behind the bearer-token middleware
    let protected = Router::new()
        .nest("/analyses", handlers::analyses::router())
        .nest("/billing", handlers::billing::router())
        .route("/auth/me", get(handlers::auth::me))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    let public = Router::new()
        .nest("/auth", handlers::auth::router())
        .nest("/webhooks", handlers::webhooks::router());

    Router::new()
        .merge(handlers::health::router())
        .route("/metrics", get(render_metrics))
        .merge(
            SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::build_openapi()),
        )
        .nest("/api/v1", public.merge(protected))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /metrics - Prometheus exposition format.
async fn render_metrics(
    axum::extract::State(state): axum::extract::State<SharedState>,
) -> String {
    state.metrics.render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use metrics_exporter_prometheus::PrometheusBuilder;

    /// Full router over a lazy (never connected) pool. Only paths that fail
    /// before touching the database are exercised here; storage-backed flows
    /// are covered by the service tests.
    fn test_server() -> TestServer {
        let config = Config {
            database_url: "postgres://localhost/unused".to_string(),
            port: 0,
            public_url: "http://localhost".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_ttl_secs: 3600,
            ai_base_url: "http://unused".to_string(),
            ai_api_key: "k".to_string(),
            ai_model: "m".to_string(),
            payment_base_url: "http://unused".to_string(),
            payment_secret_key: "sk".to_string(),
            payment_webhook_secret: "whsec".to_string(),
            smtp_host: "localhost".to_string(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_from: "no-reply@test".to_string(),
        };
        let db = PgPool::connect_lazy(&config.database_url).unwrap();
        let state = Arc::new(AppState {
            ai: AiClient::new(&config),
            payments: PaymentClient::new(&config),
            mailer: EmailService::new(&config).unwrap(),
            db,
            metrics: PrometheusBuilder::new().build_recorder().handle(),
            config,
        });
        TestServer::new(router(state)).unwrap()
    }

    #[tokio::test]
    async fn test_protected_route_without_token_is_unauthorized() {
        let server = test_server();
        let response = server.get("/api/v1/analyses").await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_protected_route_with_garbage_token_is_unauthorized() {
        let server = test_server();
        let response = server
            .get("/api/v1/billing/subscription")
            .add_header("authorization", "Bearer not.a.jwt")
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_webhook_without_signature_is_rejected() {
        let server = test_server();
        let response = server
            .post("/api/v1/webhooks/payment")
            .text(r#"{"type":"checkout.session.completed"}"#)
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_with_bad_signature_is_rejected() {
        let server = test_server();
        let response = server
            .post("/api/v1/webhooks/payment")
            .add_header("payment-signature", "t=100,v1=deadbeef")
            .text("{}")
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_with_invalid_email_is_rejected_before_storage() {
        let server = test_server();
        let response = server
            .post("/api/v1/auth/register")
            .json(&serde_json::json!({"email": "not-an-email", "password": "longenough"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let server = test_server();
        let response = server.get("/api/v1/nope").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_renders() {
        let server = test_server();
        let response = server.get("/metrics").await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let server = test_server();
        let response = server.get("/api-docs/openapi.json").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let doc: serde_json::Value = response.json();
        assert_eq!(doc["info"]["title"], "LeaseGuard API");
    }
}
