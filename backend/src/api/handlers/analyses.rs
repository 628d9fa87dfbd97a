//! Contract analysis API handlers.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::middleware::auth::AuthUser;
use crate::api::validation::{validate_attachment, validate_contract_text};
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::analysis::{AnalysisRecord, AnalysisSummary};
use crate::services::ai_service::ContractInput;
use crate::services::analysis_service::AnalysisService;
use crate::services::metrics_service;
use crate::services::subscription_service::SubscriptionService;

#[derive(OpenApi)]
#[openapi(
    paths(analyze, list_analyses, get_analysis, delete_analysis),
    components(schemas(AnalyzeRequest, AttachmentPayload, AnalysisRecord, AnalysisSummary))
)]
pub struct AnalysesApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_analyses).post(analyze))
        .route("/:id", get(get_analysis).delete(delete_analysis))
}

/// Default history title when the client supplies none, per input kind.
/// Matches the titles the product has always written.
const DEFAULT_TEXT_TITLE: &str = "Contrato de Texto";
const DEFAULT_ATTACHMENT_TITLE: &str = "Análise de Arquivo";

/// An uploaded contract document, base64-encoded.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AttachmentPayload {
    pub mime_type: String,
    pub data: String,
}

/// Analysis request: pasted contract text or an uploaded document.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    /// Optional history title; defaulted per input kind when absent
    pub title: Option<String>,
    /// Pasted contract text (minimum 50 characters)
    pub content: Option<String>,
    /// Uploaded contract document
    pub attachment: Option<AttachmentPayload>,
}

/// POST /api/v1/analyses
#[utoipa::path(
    post,
    path = "",
    context_path = "/api/v1/analyses",
    tag = "analyses",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Analysis report", body = AnalysisRecord),
        (status = 400, description = "Invalid contract input"),
        (status = 402, description = "No entitled subscription"),
        (status = 502, description = "AI provider unavailable"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn analyze(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisRecord>> {
    let (input, input_kind) = contract_input(&payload)?;

    // Entitlement is checked before any provider spend
    let subscriptions = SubscriptionService::new(state.db.clone());
    if !subscriptions.is_entitled(auth.user_id).await? {
        metrics_service::record_analysis_rejected("subscription");
        return Err(AppError::SubscriptionRequired(
            "An active subscription is required to run analyses".to_string(),
        ));
    }

    let report = state.ai.analyze_contract(&input).await?;

    let (title, stored_content) = match &input {
        ContractInput::Text(text) => (
            payload.title.as_deref().unwrap_or(DEFAULT_TEXT_TITLE),
            text.clone(),
        ),
        ContractInput::Attachment { mime_type, .. } => (
            payload.title.as_deref().unwrap_or(DEFAULT_ATTACHMENT_TITLE),
            // Raw document bytes are not kept; the history row records what
            // was analyzed
            format!("[documento anexado: {}]", mime_type),
        ),
    };

    let record = AnalysisService::new(state.db.clone())
        .save(auth.user_id, title, &stored_content, &report)
        .await?;

    metrics_service::record_analysis(input_kind);
    tracing::info!(user_id = %auth.user_id, analysis_id = %record.id, input_kind, "Analysis completed");

    Ok(Json(record))
}

/// Resolve the request into exactly one contract input.
fn contract_input(payload: &AnalyzeRequest) -> Result<(ContractInput, &'static str)> {
    match (&payload.content, &payload.attachment) {
        (Some(_), Some(_)) => Err(AppError::Validation(
            "Provide either contract text or an attachment, not both".to_string(),
        )),
        (Some(text), None) => {
            let text = validate_contract_text(text)?;
            Ok((ContractInput::Text(text), "text"))
        }
        (None, Some(attachment)) => {
            validate_attachment(&attachment.mime_type, &attachment.data)?;
            Ok((
                ContractInput::Attachment {
                    mime_type: attachment.mime_type.clone(),
                    data: attachment.data.trim().to_string(),
                },
                "attachment",
            ))
        }
        (None, None) => Err(AppError::Validation(
            "Provide contract text or an attachment".to_string(),
        )),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// GET /api/v1/analyses
#[utoipa::path(
    get,
    path = "",
    context_path = "/api/v1/analyses",
    tag = "analyses",
    params(("limit" = Option<i64>, Query, description = "Maximum entries to return")),
    responses((status = 200, description = "Analysis history, newest first", body = [AnalysisSummary])),
    security(("bearer_auth" = [])),
)]
pub async fn list_analyses(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<AnalysisSummary>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let records = AnalysisService::new(state.db.clone())
        .list_for_user(auth.user_id, limit)
        .await?;
    Ok(Json(records))
}

/// GET /api/v1/analyses/:id
#[utoipa::path(
    get,
    path = "/{id}",
    context_path = "/api/v1/analyses",
    tag = "analyses",
    params(("id" = Uuid, Path, description = "Analysis id")),
    responses(
        (status = 200, description = "Full analysis record", body = AnalysisRecord),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn get_analysis(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisRecord>> {
    let record = AnalysisService::new(state.db.clone())
        .get(auth.user_id, id)
        .await?;
    Ok(Json(record))
}

/// DELETE /api/v1/analyses/:id
#[utoipa::path(
    delete,
    path = "/{id}",
    context_path = "/api/v1/analyses",
    tag = "analyses",
    params(("id" = Uuid, Path, description = "Analysis id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn delete_analysis(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    AnalysisService::new(state.db.clone())
        .delete(auth.user_id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
