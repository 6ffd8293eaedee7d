use crate::config::Config;
use crate::errors::AppError;
use crate::export::ExportedTable;
use crate::model::LeadModel;
use crate::models::*;
use crate::pipeline::{LeadPipeline, RunOutcome, Step};
use crate::progress::LogProgress;
use crate::services::ProviderCaches;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Provider response caches, shared by every run.
    pub caches: ProviderCaches,
    /// Pretrained lead model, loaded once at startup.
    pub model: Arc<dyn LeadModel>,
}

impl AppState {
    /// Builds the collaborators for a single upload.
    fn pipeline(&self) -> Result<LeadPipeline, AppError> {
        LeadPipeline::from_config(
            &self.config,
            &self.caches,
            self.model.clone(),
            Arc::new(LogProgress),
        )
    }
}

/// Health check endpoint.
///
/// Returns the service status and version.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "lead-scoring-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Parses an uploaded CSV body.
fn read_upload(body: &[u8]) -> Result<LeadTable, AppError> {
    let table = LeadTable::from_csv(body)?;
    tracing::info!(
        "Upload parsed: {} rows, columns {:?}",
        table.len(),
        table.columns()
    );
    Ok(table)
}

fn string_counts(outcome: &RunOutcome) -> BTreeMap<String, usize> {
    outcome
        .status_counts()
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn csv_response(exported: ExportedTable, run_id: &uuid::Uuid) -> Result<Response, AppError> {
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        exported.filename
    ))
    .map_err(|e| AppError::InternalError(format!("Invalid content disposition: {}", e)))?;
    let checksum = HeaderValue::from_str(&exported.checksum)
        .map_err(|e| AppError::InternalError(format!("Invalid checksum header: {}", e)))?;
    let run_id = HeaderValue::from_str(&run_id.to_string())
        .map_err(|e| AppError::InternalError(format!("Invalid run id header: {}", e)))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
            (header::CONTENT_DISPOSITION, disposition),
            (HeaderName::from_static("x-export-sha256"), checksum),
            (HeaderName::from_static("x-run-id"), run_id),
        ],
        exported.bytes,
    )
        .into_response())
}

/// POST /api/v1/leads/validate
///
/// Validates every email of the uploaded CSV and returns one status per row.
pub async fn validate_leads(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ValidationResponse>, AppError> {
    tracing::info!("POST /leads/validate - {} bytes", body.len());

    let mut table = read_upload(&body)?;
    let outcome = state.pipeline()?.run_until(&mut table, Step::Validate).await?;

    let rows = table
        .rows()
        .iter()
        .zip(&outcome.statuses)
        .enumerate()
        .map(|(idx, (row, status))| EmailStatusRow {
            row: idx + 1,
            email: row.get(EMAIL).map(str::to_string),
            email_status: *status,
        })
        .collect();

    Ok(Json(ValidationResponse {
        run_id: outcome.run_id,
        timestamp: chrono::Utc::now().to_rfc3339(),
        counts: string_counts(&outcome),
        rows,
    }))
}

/// POST /api/v1/leads/enrich
///
/// Validates and enriches the uploaded CSV, returning the widened table as CSV.
pub async fn enrich_leads(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, AppError> {
    tracing::info!("POST /leads/enrich - {} bytes", body.len());

    let mut table = read_upload(&body)?;
    let outcome = state.pipeline()?.run_until(&mut table, Step::Enrich).await?;
    let exported = crate::export::export_csv(&table)?;

    csv_response(exported, &outcome.run_id)
}

/// POST /api/v1/leads/score
///
/// Runs the full workflow and returns the scores per row as JSON.
pub async fn score_leads(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ScoreResponse>, AppError> {
    tracing::info!("POST /leads/score - {} bytes", body.len());

    let mut table = read_upload(&body)?;
    let outcome = state.pipeline()?.run_until(&mut table, Step::Score).await?;

    let rows = table
        .rows()
        .iter()
        .zip(outcome.statuses.iter().zip(&outcome.scores))
        .enumerate()
        .map(|(idx, (row, (status, score)))| ScoreRow {
            row: idx + 1,
            email: row.get(EMAIL).map(str::to_string),
            email_status: *status,
            lead_score: score.lead_score,
            adjusted_score: score.adjusted_score,
        })
        .collect();

    Ok(Json(ScoreResponse {
        run_id: outcome.run_id,
        timestamp: chrono::Utc::now().to_rfc3339(),
        counts: string_counts(&outcome),
        rows,
    }))
}

/// POST /api/v1/leads/export
///
/// Runs the full workflow and returns `scored_leads.csv` as a download.
pub async fn export_leads(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, AppError> {
    tracing::info!("POST /leads/export - {} bytes", body.len());

    let mut table = read_upload(&body)?;
    let (outcome, exported) = state.pipeline()?.run_and_export(&mut table).await?;

    csv_response(exported, &outcome.run_id)
}

/// Lead workflow routes, without the transport layers added in `main`.
pub fn lead_routes() -> axum::Router<Arc<AppState>> {
    use axum::routing::post;

    axum::Router::new()
        .route("/api/v1/leads/validate", post(validate_leads))
        .route("/api/v1/leads/enrich", post(enrich_leads))
        .route("/api/v1/leads/score", post(score_leads))
        .route("/api/v1/leads/export", post(export_leads))
}
