use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
    Image,
    Video,
}

/// One uploaded asset, hosted on Cloudinary and referenced by `public_id`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Media {
    #[serde(rename = "_id")]
    pub id: String,
    pub event_id: String,
    pub uploader_name: Option<String>,
    pub file_type: MediaType,
    pub public_id: String,
    pub url: String,
    pub bytes: i64,
    pub created_at: DateTime,
}

impl Media {
    pub fn new(
        event_id: &str,
        uploader_name: Option<String>,
        file_type: MediaType,
        public_id: String,
        url: String,
        bytes: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_id: event_id.to_string(),
            uploader_name,
            file_type,
            public_id,
            url,
            bytes,
            created_at: DateTime::now(),
        }
    }
}
