use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use super::fan_out;
use crate::error::{storage_error, ApiError};
use crate::models::{Message, NewMessage, User};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages", post(create_message))
        .route("/messages/:job_id", get(list_messages))
}

#[derive(Debug, Serialize)]
struct MessageWithSender {
    #[serde(flatten)]
    message: Message,
    sender: Option<User>,
}

#[instrument(skip(state))]
async fn list_messages(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Vec<MessageWithSender>>, ApiError> {
    let messages = state
        .storage
        .get_messages(&job_id)
        .await
        .map_err(storage_error("Failed to fetch messages"))?;

    let storage = state.storage.clone();
    let items = fan_out(messages, |message| {
        let storage = storage.clone();
        async move {
            let sender = storage.get_user(&message.sender_id).await?;
            Ok(MessageWithSender { message, sender })
        }
    })
    .await
    .map_err(storage_error("Failed to fetch messages"))?;

    Ok(Json(items))
}

#[instrument(skip(state, body))]
async fn create_message(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let insert: NewMessage = serde_json::from_value(body)
        .map_err(|_| ApiError::bad_request("Failed to create message"))?;
    let message = state.storage.create_message(insert).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to create message");
        ApiError::bad_request("Failed to create message")
    })?;
    Ok((StatusCode::CREATED, Json(message)))
}
