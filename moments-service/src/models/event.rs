//! Event: an organizer's QR-linked collection campaign.

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: String,
    pub organizer_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    /// Short code guests reach the event by; embedded in the QR code.
    pub code: String,
    /// PNG of the guest upload URL, base64-encoded.
    pub qr_image_base64: String,
    pub expires_at: DateTime,
    // Quotas captured from the organizer's entitlements at creation time,
    // so a later plan change does not rewrite live events.
    pub upload_cap: i32,
    pub storage_limit_bytes: i64,
    pub watermark: bool,
    // Incrementally maintained usage counters.
    pub media_count: i64,
    pub storage_used_bytes: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Event {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        organizer_id: &str,
        title: String,
        description: Option<String>,
        location: Option<String>,
        code: String,
        qr_image_base64: String,
        expires_at: DateTime,
        upload_cap: i32,
        storage_limit_bytes: i64,
        watermark: bool,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: Uuid::new_v4().to_string(),
            organizer_id: organizer_id.to_string(),
            title,
            description,
            location,
            code,
            qr_image_base64,
            expires_at,
            upload_cap,
            storage_limit_bytes,
            watermark,
            media_count: 0,
            storage_used_bytes: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime) -> bool {
        self.expires_at <= now
    }

    /// Whether guests may still upload: not expired, under the upload cap,
    /// and under the storage budget.
    pub fn uploads_open(&self, now: DateTime) -> bool {
        !self.is_expired(now)
            && self.media_count < self.upload_cap as i64
            && self.storage_used_bytes < self.storage_limit_bytes
    }
}
