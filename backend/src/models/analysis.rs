//! Saved contract analysis records.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A completed analysis stored in the user's history.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub contract_title: String,
    pub contract_content: String,
    /// Markdown risk report produced by the AI provider
    pub analysis_report: String,
    pub created_at: DateTime<Utc>,
}

/// History listing entry. Omits the full contract text and report body to keep
/// list responses small; the detail endpoint returns the complete record.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct AnalysisSummary {
    pub id: Uuid,
    pub contract_title: String,
    pub created_at: DateTime<Utc>,
}
