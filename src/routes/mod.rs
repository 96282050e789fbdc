//! REST surface under `/api`: one handler per endpoint, each a short
//! sequence of storage calls plus optional third-party adapter calls.

pub mod applications;
pub mod disputes;
pub mod jobs;
pub mod messages;
pub mod nfts;
pub mod swap;
pub mod users;

use axum::Router;
use futures_util::stream::{self, StreamExt, TryStreamExt};

use crate::state::AppState;
use crate::storage;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(jobs::router())
        .merge(applications::router())
        .merge(messages::router())
        .merge(disputes::router())
        .merge(nfts::router())
        .merge(users::router())
        .merge(swap::router())
}

/// Cap on concurrent per-row lookups when attaching related records to a
/// listing.
const ENRICH_CONCURRENCY: usize = 8;

/// Bounded, order-preserving fan-out: one lookup future per row, at most
/// [`ENRICH_CONCURRENCY`] in flight.
pub(crate) async fn fan_out<T, U, F, Fut>(items: Vec<T>, f: F) -> storage::Result<Vec<U>>
where
    F: FnMut(T) -> Fut,
    Fut: std::future::Future<Output = storage::Result<U>>,
{
    stream::iter(items)
        .map(f)
        .buffered(ENRICH_CONCURRENCY)
        .try_collect()
        .await
}
