//! Cloudinary media hosting client.
//!
//! Guests upload directly to Cloudinary with parameters we sign server-side;
//! this client produces those signatures and performs asset/folder deletion.
//! Deletion is best-effort everywhere: callers log failures and move on.

use anyhow::{anyhow, Result};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::CloudinaryConfig;

#[derive(Clone)]
pub struct CloudinaryClient {
    client: Client,
    config: CloudinaryConfig,
}

/// Parameters a guest needs for a direct signed upload.
#[derive(Debug, Serialize)]
pub struct UploadSignature {
    pub cloud_name: String,
    pub api_key: String,
    pub timestamp: i64,
    pub folder: String,
    pub signature: String,
}

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.cloud_name.is_empty()
            && !self.config.api_key.is_empty()
            && !self.config.api_secret.expose_secret().is_empty()
    }

    /// Sign an upload into `folder` at `timestamp` (unix seconds).
    ///
    /// Cloudinary's scheme: sort the signed params alphabetically, join as
    /// `k=v` with `&`, append the API secret, hash. We use the SHA-256
    /// variant of the scheme.
    pub fn sign_upload(&self, folder: &str, timestamp: i64) -> UploadSignature {
        let to_sign = format!("folder={}&timestamp={}", folder, timestamp);
        UploadSignature {
            cloud_name: self.config.cloud_name.clone(),
            api_key: self.config.api_key.clone(),
            timestamp,
            folder: folder.to_string(),
            signature: self.sign(&to_sign),
        }
    }

    /// Delete a single uploaded asset by public id.
    pub async fn destroy_asset(&self, public_id: &str, resource_type: &str) -> Result<()> {
        if !self.is_configured() {
            return Err(anyhow!("Cloudinary credentials not configured"));
        }

        let timestamp = mongodb::bson::DateTime::now().timestamp_millis() / 1000;
        let to_sign = format!("public_id={}&timestamp={}", public_id, timestamp);
        let signature = self.sign(&to_sign);

        let url = format!(
            "{}/{}/{}/destroy",
            self.config.api_base_url, self.config.cloud_name, resource_type
        );

        let response = self
            .client
            .post(&url)
            .form(&[
                ("public_id", public_id),
                ("timestamp", &timestamp.to_string()),
                ("api_key", &self.config.api_key),
                ("signature", &signature),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Cloudinary destroy failed ({}): {}", status, body));
        }

        tracing::debug!(public_id = %public_id, "Cloudinary asset destroyed");
        Ok(())
    }

    /// Delete every resource under `folder`, then the folder itself.
    pub async fn delete_folder(&self, folder: &str) -> Result<()> {
        if !self.is_configured() {
            return Err(anyhow!("Cloudinary credentials not configured"));
        }

        for resource_type in ["image", "video"] {
            let url = format!(
                "{}/{}/resources/{}/upload",
                self.config.api_base_url, self.config.cloud_name, resource_type
            );
            let response = self
                .client
                .delete(&url)
                .query(&[("prefix", folder)])
                .basic_auth(
                    &self.config.api_key,
                    Some(self.config.api_secret.expose_secret()),
                )
                .send()
                .await?;

            if !response.status().is_success() {
                tracing::warn!(
                    folder = %folder,
                    resource_type = %resource_type,
                    status = %response.status(),
                    "Cloudinary resource sweep returned non-success"
                );
            }
        }

        let url = format!(
            "{}/{}/folders/{}",
            self.config.api_base_url, self.config.cloud_name, folder
        );
        let response = self
            .client
            .delete(&url)
            .basic_auth(
                &self.config.api_key,
                Some(self.config.api_secret.expose_secret()),
            )
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Cloudinary folder delete failed ({}): {}",
                status,
                body
            ));
        }

        tracing::debug!(folder = %folder, "Cloudinary folder deleted");
        Ok(())
    }

    fn sign(&self, to_sign: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.config.api_secret.expose_secret().as_bytes());
        hex::encode(hasher.finalize())
    }
}
