use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::rest::blocking;
use crate::engine::chat::list_user_communities;
use crate::engine::registration::{get_user, list_users, login_lookup, register};
use crate::error::AppError;
use crate::models::community::CommunitySummary;
use crate::models::user::{Role, User};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(register_user))
        .route("/users/:role", get(list_role_users))
        .route("/lookup/:role", get(lookup_user))
        .route("/users/:role/:id", get(get_role_user))
        .route("/users/:role/:id/communities", get(user_communities))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub role: Role,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize)]
pub struct LookupQuery {
    pub name: String,
}

#[derive(Serialize)]
pub struct UserIdResponse {
    pub id: Uuid,
}

async fn register_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<UserIdResponse>, AppError> {
    let Json(payload) = payload?;
    let id = blocking(state, move |state| {
        register(
            state,
            payload.role,
            &payload.name,
            payload.latitude,
            payload.longitude,
        )
    })
    .await?;

    Ok(Json(UserIdResponse { id }))
}

async fn list_role_users(
    State(state): State<Arc<AppState>>,
    role: Result<Path<Role>, PathRejection>,
) -> Result<Json<Vec<User>>, AppError> {
    let Path(role) = role?;
    let users = blocking(state, move |state| list_users(state, role)).await?;
    Ok(Json(users))
}

async fn lookup_user(
    State(state): State<Arc<AppState>>,
    role: Result<Path<Role>, PathRejection>,
    query: Result<Query<LookupQuery>, QueryRejection>,
) -> Result<Json<UserIdResponse>, AppError> {
    let Path(role) = role?;
    let Query(query) = query?;
    let id = blocking(state, move |state| login_lookup(state, role, &query.name)).await?;
    Ok(Json(UserIdResponse { id }))
}

async fn get_role_user(
    State(state): State<Arc<AppState>>,
    path: Result<Path<(Role, Uuid)>, PathRejection>,
) -> Result<Json<User>, AppError> {
    let Path((role, id)) = path?;
    let user = blocking(state, move |state| get_user(state, id, role)).await?;
    Ok(Json(user))
}

async fn user_communities(
    State(state): State<Arc<AppState>>,
    path: Result<Path<(Role, Uuid)>, PathRejection>,
) -> Result<Json<Vec<CommunitySummary>>, AppError> {
    let Path((role, id)) = path?;
    let communities = blocking(state, move |state| list_user_communities(state, id, role)).await?;
    Ok(Json(communities))
}
