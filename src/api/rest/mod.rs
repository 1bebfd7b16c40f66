pub mod communities;
pub mod users;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::error::AppError;
use crate::models::community::Community;
use crate::models::user::User;
use crate::state::AppState;
use crate::store::Collection;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(users::router())
        .merge(communities::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Runs a synchronous core operation on the blocking pool.
pub(crate) async fn blocking<T, F>(state: Arc<AppState>, op: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> Result<T, AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(&state))
        .await
        .map_err(|err| AppError::Internal(format!("blocking task failed: {err}")))?
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    farmers: usize,
    vendors: usize,
    communities: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, AppError> {
    let response = blocking(state, |state| {
        let farmers: Vec<User> = state.store.load(Collection::Farmers)?;
        let vendors: Vec<User> = state.store.load(Collection::Vendors)?;
        let communities: Vec<Community> = state.store.load(Collection::Communities)?;

        Ok(HealthResponse {
            status: "ok",
            farmers: farmers.len(),
            vendors: vendors.len(),
            communities: communities.len(),
        })
    })
    .await?;

    Ok(Json(response))
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
