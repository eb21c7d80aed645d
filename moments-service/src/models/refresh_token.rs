use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stored refresh-token record. Only a SHA-256 hash of the token string is
/// persisted; the raw token lives solely with the client.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshToken {
    /// Token id; matches the `jti` claim of the refresh JWT.
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: DateTime,
    pub created_at: DateTime,
}

impl RefreshToken {
    pub fn new(id: String, user_id: &str, token: &str, expiry_days: i64) -> Self {
        let expires_at = DateTime::from_millis(
            DateTime::now().timestamp_millis() + expiry_days * 24 * 60 * 60 * 1000,
        );
        Self {
            id,
            user_id: user_id.to_string(),
            token_hash: Self::hash(token),
            expires_at,
            created_at: DateTime::now(),
        }
    }

    pub fn hash(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn is_expired(&self, now: DateTime) -> bool {
        self.expires_at <= now
    }
}
