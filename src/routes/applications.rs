use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tracing::instrument;

use crate::error::{storage_error, ApiError};
use crate::models::{
    Application, ApplicationPatch, JobPatch, NewApplication, APPLICATION_ACCEPTED,
    JOB_IN_PROGRESS,
};
use crate::state::AppState;
use crate::storage::StorageError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/applications", post(create_application))
        .route("/applications/:id", axum::routing::patch(update_application))
}

#[instrument(skip(state, body))]
async fn create_application(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Application>), ApiError> {
    let insert: NewApplication = serde_json::from_value(body)
        .map_err(|_| ApiError::bad_request("Failed to create application"))?;

    // One application per (job, freelancer) pair.
    let existing = state
        .storage
        .find_application(&insert.job_id, &insert.freelancer_id)
        .await
        .map_err(storage_error("Failed to create application"))?;
    if existing.is_some() {
        return Err(ApiError::conflict(
            "Application already submitted for this job",
        ));
    }

    let application = state
        .storage
        .create_application(insert)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create application");
            ApiError::bad_request("Failed to create application")
        })?;

    Ok((StatusCode::CREATED, Json(application)))
}

/// Accepting an application also moves the parent job to `in_progress` and
/// assigns the freelancer; the two writes are sequential, not atomic.
#[instrument(skip(state, body))]
async fn update_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Application>, ApiError> {
    let patch: ApplicationPatch = serde_json::from_value(body)
        .map_err(|_| ApiError::bad_request("Failed to update application"))?;
    let accepted = patch.status.as_deref() == Some(APPLICATION_ACCEPTED);

    let application = state
        .storage
        .update_application(&id, patch)
        .await
        .map_err(|e| match e {
            StorageError::NotFound(_) => ApiError::not_found("Application not found"),
            other => {
                tracing::error!(error = %other, "Failed to update application");
                ApiError::bad_request("Failed to update application")
            }
        })?;

    if accepted {
        state
            .storage
            .update_job(
                &application.job_id,
                JobPatch {
                    assigned_freelancer_id: Some(application.freelancer_id.clone()),
                    status: Some(JOB_IN_PROGRESS.into()),
                    ..Default::default()
                },
            )
            .await
            .map_err(storage_error("Failed to update application"))?;
    }

    Ok(Json(application))
}
