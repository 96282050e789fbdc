use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::instrument;

use super::fan_out;
use crate::clients::openai::WorkSummary;
use crate::error::{storage_error, ApiError};
use crate::models::{
    Application, Job, JobPatch, NewJob, NewWorkNft, User, UserPatch, JOB_COMPLETED,
    JOB_IN_PROGRESS, JOB_OPEN,
};
use crate::state::AppState;
use crate::storage::{JobFilter, StorageError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/active", get(active_jobs))
        .route("/jobs/:id", get(get_job).patch(update_job))
        .route("/jobs/:job_id/complete", post(complete_job))
        .route("/jobs/:job_id/ai-match", post(ai_match))
}

// --- dto ---

#[derive(Debug, Deserialize)]
struct ListJobsQuery {
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateJob {
    client_id: String,
    title: String,
    description: String,
    category: String,
    budget: Decimal,
    #[serde(default = "default_currency")]
    currency: String,
    deadline: String,
    skills: Vec<String>,
}

fn default_currency() -> String {
    "USDC".into()
}

#[derive(Debug, Serialize)]
struct JobListItem {
    #[serde(flatten)]
    job: Job,
    client: Option<User>,
    #[serde(rename = "_count")]
    count: ApplicationCount,
}

#[derive(Debug, Serialize)]
struct ApplicationCount {
    applications: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActiveJobItem {
    #[serde(flatten)]
    job: Job,
    client: Option<User>,
    assigned_freelancer: Option<User>,
}

#[derive(Debug, Serialize)]
struct JobDetails {
    #[serde(flatten)]
    job: Job,
    client: Option<User>,
    applications: Vec<ApplicationWithFreelancer>,
}

#[derive(Debug, Serialize)]
struct ApplicationWithFreelancer {
    #[serde(flatten)]
    application: Application,
    freelancer: Option<User>,
}

#[derive(Debug, Serialize)]
struct CompletedJob {
    job: Job,
    nft: crate::models::WorkNft,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AiMatchRequest {
    freelancer_skills: Vec<String>,
    #[serde(default)]
    nfts: Vec<WorkSummary>,
}

// --- handlers ---

#[instrument(skip(state))]
async fn list_jobs(
    State(state): State<AppState>,
    Query(q): Query<ListJobsQuery>,
) -> Result<Json<Vec<JobListItem>>, ApiError> {
    // "All Categories" is the front end's unfiltered sentinel.
    let category = q.category.filter(|c| c != "All Categories");
    let jobs = state
        .storage
        .get_jobs(JobFilter {
            category,
            status: Some(JOB_OPEN.into()),
        })
        .await
        .map_err(storage_error("Failed to fetch jobs"))?;

    let storage = state.storage.clone();
    let items = fan_out(jobs, |job| {
        let storage = storage.clone();
        async move {
            let client = storage.get_user(&job.client_id).await?;
            let applications = storage.get_applications(&job.id).await?;
            Ok(JobListItem {
                job,
                client,
                count: ApplicationCount {
                    applications: applications.len(),
                },
            })
        }
    })
    .await
    .map_err(storage_error("Failed to fetch jobs"))?;

    Ok(Json(items))
}

#[instrument(skip(state))]
async fn active_jobs(State(state): State<AppState>) -> Result<Json<Vec<ActiveJobItem>>, ApiError> {
    let jobs = state
        .storage
        .get_jobs(JobFilter::status(JOB_IN_PROGRESS))
        .await
        .map_err(storage_error("Failed to fetch active jobs"))?;

    let storage = state.storage.clone();
    let items = fan_out(jobs, |job| {
        let storage = storage.clone();
        async move {
            let client = storage.get_user(&job.client_id).await?;
            let assigned_freelancer = match &job.assigned_freelancer_id {
                Some(id) => storage.get_user(id).await?,
                None => None,
            };
            Ok(ActiveJobItem {
                job,
                client,
                assigned_freelancer,
            })
        }
    })
    .await
    .map_err(storage_error("Failed to fetch active jobs"))?;

    Ok(Json(items))
}

#[instrument(skip(state))]
async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobDetails>, ApiError> {
    let job = state
        .storage
        .get_job(&id)
        .await
        .map_err(storage_error("Failed to fetch job"))?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    let client = state
        .storage
        .get_user(&job.client_id)
        .await
        .map_err(storage_error("Failed to fetch job"))?;
    let applications = state
        .storage
        .get_applications(&job.id)
        .await
        .map_err(storage_error("Failed to fetch job"))?;

    let storage = state.storage.clone();
    let applications = fan_out(applications, |application| {
        let storage = storage.clone();
        async move {
            let freelancer = storage.get_user(&application.freelancer_id).await?;
            Ok(ApplicationWithFreelancer {
                application,
                freelancer,
            })
        }
    })
    .await
    .map_err(storage_error("Failed to fetch job"))?;

    Ok(Json(JobDetails {
        job,
        client,
        applications,
    }))
}

#[instrument(skip(state, body))]
async fn create_job(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let body: CreateJob = serde_json::from_value(body)
        .map_err(|_| ApiError::bad_request("Failed to create job"))?;
    let deadline =
        parse_deadline(&body.deadline).ok_or_else(|| ApiError::bad_request("Failed to create job"))?;

    let job = state
        .storage
        .create_job(NewJob {
            client_id: body.client_id,
            title: body.title,
            description: body.description,
            category: body.category,
            budget: body.budget,
            currency: body.currency,
            deadline,
            skills: body.skills,
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create job");
            ApiError::bad_request("Failed to create job")
        })?;

    Ok((StatusCode::CREATED, Json(job)))
}

#[instrument(skip(state, body))]
async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Job>, ApiError> {
    let patch: JobPatch = serde_json::from_value(body)
        .map_err(|_| ApiError::bad_request("Failed to update job"))?;
    let job = state.storage.update_job(&id, patch).await.map_err(|e| match e {
        StorageError::NotFound(_) => ApiError::not_found("Job not found"),
        other => {
            tracing::error!(error = %other, "Failed to update job");
            ApiError::bad_request("Failed to update job")
        }
    })?;
    Ok(Json(job))
}

/// Complete a job: mark it done, mint the completion certificate and fold
/// the payout into the freelancer's persisted totals.
#[instrument(skip(state))]
async fn complete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<CompletedJob>, ApiError> {
    let job = state
        .storage
        .get_job(&job_id)
        .await
        .map_err(storage_error("Failed to complete job"))?;
    let Some(job) = job else {
        return Err(ApiError::bad_request("Invalid job state"));
    };
    let Some(freelancer_id) = job.assigned_freelancer_id.clone() else {
        return Err(ApiError::bad_request("Invalid job state"));
    };

    let job = state
        .storage
        .update_job(
            &job_id,
            JobPatch {
                status: Some(JOB_COMPLETED.into()),
                completed_at: Some(OffsetDateTime::now_utc()),
                ..Default::default()
            },
        )
        .await
        .map_err(storage_error("Failed to complete job"))?;

    let nft = state
        .storage
        .create_work_nft(NewWorkNft {
            job_id: job.id.clone(),
            freelancer_id: freelancer_id.clone(),
            client_id: job.client_id.clone(),
            job_title: job.title.clone(),
            rating: 5,
            amount: job.budget,
            currency: job.currency.clone(),
        })
        .await
        .map_err(storage_error("Failed to complete job"))?;

    let freelancer = state
        .storage
        .get_user(&freelancer_id)
        .await
        .map_err(storage_error("Failed to complete job"))?;
    if let Some(freelancer) = freelancer {
        state
            .storage
            .update_user(
                &freelancer.id,
                UserPatch {
                    total_earned: Some(freelancer.total_earned + job.budget),
                    completed_jobs: Some(freelancer.completed_jobs + 1),
                    ..Default::default()
                },
            )
            .await
            .map_err(storage_error("Failed to complete job"))?;
    }

    Ok(Json(CompletedJob { job, nft }))
}

#[instrument(skip(state, body))]
async fn ai_match(
    State(state): State<AppState>,
    Path(_job_id): Path<String>,
    Json(body): Json<AiMatchRequest>,
) -> Result<Json<Value>, ApiError> {
    let jobs = state
        .storage
        .get_jobs(JobFilter::status(JOB_OPEN))
        .await
        .map_err(storage_error("Failed to perform AI matching"))?;

    let briefs: Vec<_> = jobs
        .into_iter()
        .map(|job| crate::clients::openai::JobBrief {
            id: job.id,
            title: job.title,
            description: job.description,
            skills: job.skills,
            category: job.category,
        })
        .collect();

    let matches = state
        .ai
        .match_jobs(&body.freelancer_skills, &body.nfts, &briefs)
        .await;
    Ok(Json(serde_json::json!({ "matches": matches })))
}

/// Accept a full RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight
/// UTC), the two shapes the front end sends.
fn parse_deadline(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(dt);
    }
    let date_only = format_description!("[year]-[month]-[day]");
    time::Date::parse(raw, &date_only)
        .ok()
        .map(|d| d.midnight().assume_utc())
}
