use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{UserId, UserRole, UserStatus};

/// Resource paths exposed by the admin API, relative to the configured base
/// URL.
pub mod resources {
    pub const USERS: &str = "admin/users";
    pub const EVENTS: &str = "admin/events";
    pub const CATEGORIES: &str = "admin/categories";
    pub const SUBCATEGORIES: &str = "admin/subcategories";
    pub const FAQS: &str = "admin/faqs";
    pub const SUPPORT_TICKETS: &str = "admin/support";
    pub const NOTIFICATIONS: &str = "admin/notifications";
    pub const DELETION_HISTORY: &str = "admin/deletion-history";
}

/// Page metadata exactly as the backend spells it on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    #[serde(rename = "totalPage")]
    pub total_page: u32,
}

/// Standard JSON envelope every endpoint answers with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<WirePageMeta>,
}

/// Error payloads nest the human-readable text under `data.message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ErrorDetail>,
}

impl ErrorEnvelope {
    /// Best human-readable text the envelope carries, preferring the nested
    /// `data.message` the backend uses for failures.
    pub fn display_message(&self) -> Option<&str> {
        self.data
            .as_ref()
            .map(|d| d.message.as_str())
            .or(self.message.as_deref())
    }
}

/// A user record as the backend actually returns it: `personalInfo` and
/// `address` arrive as stringified blobs that must be decoded strictly
/// before the record is usable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUserRecord {
    pub id: UserId,
    pub email: String,
    pub role: UserRole,
    pub status: UserStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}
