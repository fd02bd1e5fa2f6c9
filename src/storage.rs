//! Private object storage holding the downloadable animation packs.
//!
//! Objects are keyed `<animationId>.zip` in a single private bucket. Access is
//! only ever granted through short-lived signed URLs.

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::config::StorageConfig;
use crate::error::{AppError, Result};

/// Signed download links stay valid for 24 hours.
pub const DOWNLOAD_URL_TTL_SECS: i64 = 86_400;

/// A time-limited link to one purchased pack. Recomputed on every request,
/// never stored.
#[derive(Debug, Clone, Serialize)]
pub struct SignedDownloadGrant {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest {
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    signed_url: String,
}

#[derive(Debug, Clone)]
pub struct StorageClient {
    client: Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl StorageClient {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
            bucket: config.bucket.clone(),
        }
    }

    pub fn object_key(animation_id: &str) -> String {
        format!("{}.zip", animation_id)
    }

    /// Sign the pack for `animation_id` with the standard 24 hour expiry.
    pub async fn sign_download(&self, animation_id: &str) -> Result<SignedDownloadGrant> {
        self.create_signed_url(&Self::object_key(animation_id), DOWNLOAD_URL_TTL_SECS)
            .await
    }

    pub async fn create_signed_url(
        &self,
        object_key: &str,
        expires_in_secs: i64,
    ) -> Result<SignedDownloadGrant> {
        let endpoint = self.endpoint(&["object", "sign", &self.bucket, object_key])?;
        let issued_at = Utc::now();

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&SignRequest {
                expires_in: expires_in_secs,
            })
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Storage API error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Storage API error (HTTP {}): {}",
                status.as_u16(),
                body
            )));
        }

        let signed: SignResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse storage response: {}", e)))?;

        Ok(SignedDownloadGrant {
            url: self.absolute_url(&signed.signed_url),
            expires_at: issued_at + Duration::seconds(expires_in_secs),
        })
    }

    /// `{base}/storage/v1/<segments...>` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AppError::Internal(format!("Invalid storage base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("Storage base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["storage", "v1"])
            .extend(segments);
        Ok(url)
    }

    /// The storage API answers with a path relative to `/storage/v1`.
    fn absolute_url(&self, signed: &str) -> String {
        if signed.starts_with("http://") || signed.starts_with("https://") {
            signed.to_string()
        } else {
            format!(
                "{}/storage/v1/{}",
                self.base_url,
                signed.trim_start_matches('/')
            )
        }
    }
}
