use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::instrument;

use super::fan_out;
use crate::error::{storage_error, ApiError};
use crate::models::{User, WorkNft};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/:wallet_address", get(get_user_by_wallet))
        .route("/stats", get(stats))
}

#[derive(Debug, Serialize)]
struct UserProfile {
    #[serde(flatten)]
    user: User,
    nfts: Vec<NftWithClient>,
}

#[derive(Debug, Serialize)]
struct NftWithClient {
    #[serde(flatten)]
    nft: WorkNft,
    client: Option<User>,
}

#[instrument(skip(state))]
async fn get_user_by_wallet(
    State(state): State<AppState>,
    Path(wallet_address): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .storage
        .get_user_by_wallet(&wallet_address)
        .await
        .map_err(storage_error("Failed to fetch user"))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let nfts = state
        .storage
        .get_work_nfts(&user.id)
        .await
        .map_err(storage_error("Failed to fetch user"))?;

    let storage = state.storage.clone();
    let nfts = fan_out(nfts, |nft| {
        let storage = storage.clone();
        async move {
            let client = storage.get_user(&nft.client_id).await?;
            Ok(NftWithClient { nft, client })
        }
    })
    .await
    .map_err(storage_error("Failed to fetch user"))?;

    Ok(Json(UserProfile { user, nfts }))
}

/// Demo dashboard numbers; the original served these as constants.
async fn stats() -> Json<Value> {
    Json(json!({
        "totalEarned": 2450.50,
        "totalSpent": 0,
        "activeContracts": 3,
        "completedJobs": 12,
        "reputationScore": 95,
        "rating": 4.8,
    }))
}
