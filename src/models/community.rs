use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::{Role, User};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    /// Only set for farmers; snapshot taken when the membership was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl Member {
    pub fn vendor(vendor: &User) -> Self {
        Self {
            id: vendor.id,
            name: vendor.name.clone(),
            role: Role::Vendor,
            distance_km: None,
        }
    }

    pub fn farmer(farmer: &User, distance_km: f64) -> Self {
        Self {
            id: farmer.id,
            name: farmer.name.clone(),
            role: Role::Farmer,
            distance_km: Some(distance_km),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    Voice,
}

/// Media carried by an image or voice message, stored as the client encoded
/// it (typically base64).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub media_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub sender_role: Role,
    /// Text body, or the caption of an attachment.
    pub content: String,
    #[serde(default)]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Community {
    pub id: Uuid,
    pub name: String,
    pub vendor_id: Uuid,
    pub vendor_name: String,
    pub members: Vec<Member>,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Community {
    pub fn has_member(&self, user_id: Uuid) -> bool {
        self.members.iter().any(|member| member.id == user_id)
    }

    pub fn summary(&self) -> CommunitySummary {
        CommunitySummary {
            id: self.id,
            name: self.name.clone(),
            vendor_name: self.vendor_name.clone(),
            member_count: self.members.len(),
            message_count: self.messages.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommunitySummary {
    pub id: Uuid,
    pub name: String,
    pub vendor_name: String,
    pub member_count: usize,
    pub message_count: usize,
}
