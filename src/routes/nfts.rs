use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::instrument;

use super::fan_out;
use crate::error::{storage_error, ApiError};
use crate::models::{User, WorkNft};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/nfts/recent", get(recent_nfts))
        .route("/nfts/:user_id", get(user_nfts))
}

#[derive(Debug, Serialize)]
struct NftWithClient {
    #[serde(flatten)]
    nft: WorkNft,
    client: Option<User>,
}

/// Placeholder feed; the original never populated it.
async fn recent_nfts() -> Json<Vec<WorkNft>> {
    Json(Vec::new())
}

#[instrument(skip(state))]
async fn user_nfts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<NftWithClient>>, ApiError> {
    let nfts = state
        .storage
        .get_work_nfts(&user_id)
        .await
        .map_err(storage_error("Failed to fetch user NFTs"))?;

    let storage = state.storage.clone();
    let items = fan_out(nfts, |nft| {
        let storage = storage.clone();
        async move {
            let client = storage.get_user(&nft.client_id).await?;
            Ok(NftWithClient { nft, client })
        }
    })
    .await
    .map_err(storage_error("Failed to fetch user NFTs"))?;

    Ok(Json(items))
}
