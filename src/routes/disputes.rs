use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::instrument;

use crate::clients::openai::DisputeContext;
use crate::error::{storage_error, ApiError};
use crate::models::{Dispute, DisputePatch, NewDispute, DISPUTE_RESOLVED};
use crate::state::AppState;
use crate::storage::StorageError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/disputes", get(list_disputes).post(create_dispute))
        .route("/disputes/:id/resolve", patch(resolve_dispute))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDisputesQuery {
    job_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    winner: Option<String>,
    resolution: Option<String>,
}

#[instrument(skip(state))]
async fn list_disputes(
    State(state): State<AppState>,
    Query(q): Query<ListDisputesQuery>,
) -> Result<Json<Vec<Dispute>>, ApiError> {
    let disputes = state
        .storage
        .get_disputes(q.job_id.as_deref())
        .await
        .map_err(storage_error("Failed to fetch disputes"))?;
    Ok(Json(disputes))
}

/// Create a dispute and synchronously ask the LLM adapter for a ruling; the
/// recommendation (or its documented fallback) is stored on the record
/// before the response goes out.
#[instrument(skip(state, body))]
async fn create_dispute(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Dispute>), ApiError> {
    let insert: NewDispute = serde_json::from_value(body)
        .map_err(|_| ApiError::bad_request("Failed to create dispute"))?;

    let mut dispute = state.storage.create_dispute(insert).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to create dispute");
        ApiError::bad_request("Failed to create dispute")
    })?;

    let job = state
        .storage
        .get_job(&dispute.job_id)
        .await
        .map_err(storage_error("Failed to create dispute"))?;
    if let Some(job) = job {
        let ruling = state
            .ai
            .resolve_dispute(&DisputeContext {
                job_title: job.title,
                reason: dispute.reason.clone(),
                client_evidence: dispute.evidence.clone().unwrap_or_default(),
                freelancer_evidence: None,
            })
            .await;
        let recommendation = serde_json::to_string(&ruling)
            .map_err(|_| ApiError::bad_request("Failed to create dispute"))?;

        dispute = state
            .storage
            .update_dispute(
                &dispute.id,
                DisputePatch {
                    ai_recommendation: Some(recommendation),
                    ..Default::default()
                },
            )
            .await
            .map_err(storage_error("Failed to create dispute"))?;
    }

    Ok((StatusCode::CREATED, Json(dispute)))
}

#[instrument(skip(state, body))]
async fn resolve_dispute(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ResolveRequest>,
) -> Result<Json<Dispute>, ApiError> {
    let dispute = state
        .storage
        .update_dispute(
            &id,
            DisputePatch {
                status: Some(DISPUTE_RESOLVED.into()),
                winner: body.winner,
                resolution: body.resolution,
                resolved_at: Some(OffsetDateTime::now_utc()),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| match e {
            StorageError::NotFound(_) => ApiError::not_found("Dispute not found"),
            other => {
                tracing::error!(error = %other, "Failed to resolve dispute");
                ApiError::bad_request("Failed to resolve dispute")
            }
        })?;
    Ok(Json(dispute))
}
