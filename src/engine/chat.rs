use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::registration::get_user;
use crate::error::AppError;
use crate::models::community::{Attachment, Community, CommunitySummary, Message, MessageKind};
use crate::models::user::Role;
use crate::state::AppState;
use crate::store::Collection;

/// Largest accepted attachment payload, in encoded bytes.
pub const MAX_ATTACHMENT_BYTES: usize = 2 * 1024 * 1024;

/// Appends a text message to a community thread.
///
/// The sender must be a registered user of `sender_role` and a member of the
/// community; the stored sender name comes from the user record. Nothing is
/// written when any check fails.
pub fn post_message(
    state: &AppState,
    community_id: Uuid,
    sender_id: Uuid,
    sender_role: Role,
    content: &str,
) -> Result<Message, AppError> {
    if content.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "message content cannot be empty".to_string(),
        ));
    }

    append_message(state, community_id, sender_id, sender_role, content, None)
}

/// Appends an image or voice message. `caption` may be empty.
pub fn post_attachment(
    state: &AppState,
    community_id: Uuid,
    sender_id: Uuid,
    sender_role: Role,
    caption: &str,
    attachment: Attachment,
) -> Result<Message, AppError> {
    let kind = attachment_kind(&attachment)?;
    append_message(
        state,
        community_id,
        sender_id,
        sender_role,
        caption,
        Some((kind, attachment)),
    )
}

fn attachment_kind(attachment: &Attachment) -> Result<MessageKind, AppError> {
    if attachment.data.is_empty() {
        return Err(AppError::InvalidInput(
            "attachment data cannot be empty".to_string(),
        ));
    }

    if attachment.data.len() > MAX_ATTACHMENT_BYTES {
        return Err(AppError::InvalidInput(format!(
            "attachment exceeds {MAX_ATTACHMENT_BYTES} bytes"
        )));
    }

    let media_type = attachment.media_type.to_ascii_lowercase();
    if media_type.starts_with("image/") {
        Ok(MessageKind::Image)
    } else if media_type.starts_with("audio/") {
        Ok(MessageKind::Voice)
    } else {
        Err(AppError::InvalidInput(format!(
            "unsupported attachment type {:?}",
            attachment.media_type
        )))
    }
}

fn append_message(
    state: &AppState,
    community_id: Uuid,
    sender_id: Uuid,
    sender_role: Role,
    content: &str,
    attachment: Option<(MessageKind, Attachment)>,
) -> Result<Message, AppError> {
    let mut communities: Vec<Community> = state.store.load(Collection::Communities)?;
    let community = communities
        .iter_mut()
        .find(|community| community.id == community_id)
        .ok_or_else(|| AppError::NotFound(format!("community {community_id} not found")))?;

    let sender = get_user(state, sender_id, sender_role)?;
    if !community.has_member(sender.id) {
        return Err(AppError::InvalidInput(format!(
            "{sender_role} {sender_id} is not a member of community {community_id}"
        )));
    }

    // Keep the thread ordered even if the wall clock steps backwards.
    let now = Utc::now();
    let timestamp = community
        .messages
        .last()
        .map_or(now, |last| last.timestamp.max(now));

    let (kind, attachment) = match attachment {
        Some((kind, attachment)) => (kind, Some(attachment)),
        None => (MessageKind::Text, None),
    };

    let message = Message {
        id: Uuid::new_v4(),
        sender_id,
        sender_name: sender.name,
        sender_role,
        content: content.to_string(),
        kind,
        attachment,
        timestamp,
    };
    community.messages.push(message.clone());

    state.store.save(Collection::Communities, &communities)?;
    state.metrics.messages_posted_total.inc();

    info!(
        community_id = %community_id,
        sender_id = %sender_id,
        role = %sender_role,
        kind = ?kind,
        "message posted"
    );

    Ok(message)
}

pub fn get_community(state: &AppState, community_id: Uuid) -> Result<Community, AppError> {
    let communities: Vec<Community> = state.store.load(Collection::Communities)?;

    communities
        .into_iter()
        .find(|community| community.id == community_id)
        .ok_or_else(|| AppError::NotFound(format!("community {community_id} not found")))
}

/// Summaries of every community `user_id` belongs to. Membership is matched
/// on id alone.
pub fn list_user_communities(
    state: &AppState,
    user_id: Uuid,
    role: Role,
) -> Result<Vec<CommunitySummary>, AppError> {
    let communities: Vec<Community> = state.store.load(Collection::Communities)?;

    let summaries: Vec<CommunitySummary> = communities
        .iter()
        .filter(|community| community.has_member(user_id))
        .map(Community::summary)
        .collect();

    debug!(user_id = %user_id, role = %role, communities = summaries.len(), "listed communities");
    Ok(summaries)
}
