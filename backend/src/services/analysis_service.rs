//! Analysis history storage.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::analysis::{AnalysisRecord, AnalysisSummary};

/// Service for saved analysis records. All reads and writes are scoped to the
/// owning user.
pub struct AnalysisService {
    db: PgPool,
}

impl AnalysisService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Persist a completed analysis.
    pub async fn save(
        &self,
        user_id: Uuid,
        title: &str,
        content: &str,
        report: &str,
    ) -> Result<AnalysisRecord> {
        let record: AnalysisRecord = sqlx::query_as(
            r#"
            INSERT INTO analyses (user_id, contract_title, contract_content, analysis_report)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, contract_title, contract_content, analysis_report, created_at
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(content)
        .bind(report)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(record)
    }

    /// List a user's analyses, newest first.
    pub async fn list_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<AnalysisSummary>> {
        let records: Vec<AnalysisSummary> = sqlx::query_as(
            r#"
            SELECT id, contract_title, created_at
            FROM analyses
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(records)
    }

    /// Fetch one record. Other users' records look like missing ones.
    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<AnalysisRecord> {
        let record: Option<AnalysisRecord> = sqlx::query_as(
            r#"
            SELECT id, user_id, contract_title, contract_content, analysis_report, created_at
            FROM analyses
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        record.ok_or_else(|| AppError::NotFound("Analysis not found".to_string()))
    }

    /// Delete one of the user's records.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM analyses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Analysis not found".to_string()));
        }
        Ok(())
    }

    /// Count of stored analyses, for the metrics gauge.
    pub async fn count_all(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM analyses")
            .fetch_one(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count)
    }
}
