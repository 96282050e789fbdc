use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::instrument;

use crate::clients::sideshift::{Conversion, Quote, Shift};
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sideshift/coins", get(coins))
        .route("/sideshift/quote", get(quote))
        .route("/sideshift/shift", post(create_shift))
        .route("/sideshift/shift/:id", get(shift_status))
        .route("/sideshift/convert", post(convert))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteQuery {
    deposit_coin: Option<String>,
    settle_coin: Option<String>,
    deposit_amount: Option<String>,
    settle_amount: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShiftRequest {
    quote_id: Option<String>,
    settle_address: Option<String>,
    affiliate_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConvertRequest {
    from_coin: Option<String>,
    amount: Option<String>,
    #[serde(default = "default_to_coin")]
    to_coin: String,
}

fn default_to_coin() -> String {
    "USDC".into()
}

#[instrument(skip(state))]
async fn coins(State(state): State<AppState>) -> Json<Value> {
    let coins = state.swap.get_available_coins().await;
    Json(json!({ "coins": coins }))
}

#[instrument(skip(state))]
async fn quote(
    State(state): State<AppState>,
    Query(q): Query<QuoteQuery>,
) -> Result<Json<Quote>, ApiError> {
    let (Some(deposit_coin), Some(settle_coin)) = (q.deposit_coin, q.settle_coin) else {
        return Err(ApiError::bad_request(
            "depositCoin and settleCoin are required",
        ));
    };

    let quote = state
        .swap
        .get_quote(
            &deposit_coin,
            &settle_coin,
            q.deposit_amount.as_deref(),
            q.settle_amount.as_deref(),
        )
        .await
        .ok_or_else(|| ApiError::not_found("Quote not available"))?;
    Ok(Json(quote))
}

#[instrument(skip(state))]
async fn create_shift(
    State(state): State<AppState>,
    Json(body): Json<ShiftRequest>,
) -> Result<Json<Shift>, ApiError> {
    let (Some(quote_id), Some(settle_address)) = (body.quote_id, body.settle_address) else {
        return Err(ApiError::bad_request(
            "quoteId and settleAddress are required",
        ));
    };

    let shift = state
        .swap
        .create_fixed_shift(&quote_id, &settle_address, body.affiliate_id.as_deref())
        .await
        .ok_or_else(|| ApiError::internal("Failed to create shift"))?;
    Ok(Json(shift))
}

#[instrument(skip(state))]
async fn shift_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Shift>, ApiError> {
    let shift = state
        .swap
        .get_shift_status(&id)
        .await
        .ok_or_else(|| ApiError::not_found("Shift not found"))?;
    Ok(Json(shift))
}

#[instrument(skip(state))]
async fn convert(
    State(state): State<AppState>,
    Json(body): Json<ConvertRequest>,
) -> Result<Json<Conversion>, ApiError> {
    let (Some(from_coin), Some(amount)) = (body.from_coin, body.amount) else {
        return Err(ApiError::bad_request("fromCoin and amount are required"));
    };

    let conversion = state
        .swap
        .convert_to_base_currency(&from_coin, &amount, &body.to_coin)
        .await
        .ok_or_else(|| ApiError::internal("Failed to convert currency"))?;
    Ok(Json(conversion))
}
