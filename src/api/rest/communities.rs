use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::blocking;
use crate::engine::chat::{get_community, post_attachment, post_message};
use crate::error::AppError;
use crate::models::community::{Attachment, Community, Message};
use crate::models::user::Role;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/communities/:id", get(get_community_detail))
        .route("/communities/:id/messages", post(create_message))
}

/// The sender's display name is taken from their user record.
#[derive(Deserialize)]
pub struct PostMessageRequest {
    pub sender_id: Uuid,
    pub sender_role: Role,
    #[serde(default)]
    pub content: String,
    pub attachment: Option<Attachment>,
}

async fn get_community_detail(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Community>, AppError> {
    let Path(id) = id?;
    let community = blocking(state, move |state| get_community(state, id)).await?;
    Ok(Json(community))
}

async fn create_message(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<PostMessageRequest>, JsonRejection>,
) -> Result<Json<Message>, AppError> {
    let Path(id) = id?;
    let Json(payload) = payload?;

    let message = blocking(state, move |state| match payload.attachment {
        Some(attachment) => post_attachment(
            state,
            id,
            payload.sender_id,
            payload.sender_role,
            &payload.content,
            attachment,
        ),
        None => post_message(
            state,
            id,
            payload.sender_id,
            payload.sender_role,
            &payload.content,
        ),
    })
    .await?;

    Ok(Json(message))
}
