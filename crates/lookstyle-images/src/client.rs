//! HTTP client for a Cloudinary-compatible image store.
//!
//! Every request is signed with the account secret: the signed parameters
//! are sorted by name, joined as `k=v&k=v`, suffixed with the secret and
//! hashed with SHA-256.

use std::time::Duration;

use lookstyle_core::ImageStoreConfig;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use crate::error::ImageStoreError;
use crate::retry::retry_with_backoff;
use crate::types::{DeleteOutcome, DestroyResponse, ImageUpload, StoredImage, UploadResponse};
use crate::ImageStore;

const SIGNATURE_ALGORITHM: &str = "sha256";
const ERROR_BODY_LIMIT: usize = 512;

/// Client for the image store REST API.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct CloudinaryClient {
    client: Client,
    base_url: Url,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl std::fmt::Debug for CloudinaryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryClient")
            .field("base_url", &self.base_url.as_str())
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl CloudinaryClient {
    /// Creates a client from configuration. Point `config.base_url` at a mock
    /// server in tests.
    ///
    /// # Errors
    ///
    /// Returns [`ImageStoreError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ImageStoreError::InvalidConfig`] if
    /// `base_url` is not a valid URL.
    pub fn new(config: &ImageStoreConfig) -> Result<Self, ImageStoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("lookstyle/0.1 (catalog)")
            .build()?;

        let normalised = format!("{}/", config.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| {
            ImageStoreError::InvalidConfig(format!("invalid base URL '{}': {e}", config.base_url))
        })?;

        Ok(Self {
            client,
            base_url,
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        })
    }

    /// Uploads one image into `folder`.
    ///
    /// # Errors
    ///
    /// - [`ImageStoreError::Http`] on network failure after retries.
    /// - [`ImageStoreError::UnexpectedStatus`] on a non-2xx status.
    /// - [`ImageStoreError::Deserialize`] if the body is not the expected shape.
    pub async fn upload_image(
        &self,
        image: &ImageUpload,
        folder: &str,
    ) -> Result<StoredImage, ImageStoreError> {
        let url = self.endpoint("upload")?;
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("folder", folder), ("timestamp", &timestamp)],
            &self.api_secret,
        );

        let (url, timestamp, signature) = (&url, timestamp.as_str(), signature.as_str());
        let response: UploadResponse =
            retry_with_backoff(self.max_retries, self.retry_backoff_ms, || async move {
                let mut file = Part::bytes(image.bytes.clone()).file_name(image.file_name.clone());
                if let Some(content_type) = &image.content_type {
                    file = file.mime_str(content_type)?;
                }
                let form = Form::new()
                    .part("file", file)
                    .text("folder", folder.to_owned())
                    .text("timestamp", timestamp.to_owned())
                    .text("api_key", self.api_key.clone())
                    .text("signature_algorithm", SIGNATURE_ALGORITHM)
                    .text("signature", signature.to_owned());

                let response = self.client.post(url.clone()).multipart(form).send().await?;
                let (status, body) = read_body(response).await?;
                if !status.is_success() {
                    return Err(unexpected_status("upload", status, &body));
                }
                parse_json(&body, "upload")
            })
            .await?;

        tracing::debug!(
            asset_id = %response.public_id,
            file_name = %image.file_name,
            "image uploaded"
        );

        Ok(StoredImage {
            url: response.secure_url,
            asset_id: response.public_id,
        })
    }

    /// Deletes one asset by its store identifier. A missing asset is not an
    /// error.
    ///
    /// # Errors
    ///
    /// - [`ImageStoreError::Http`] on network failure after retries.
    /// - [`ImageStoreError::UnexpectedStatus`] on a non-2xx, non-404 status.
    /// - [`ImageStoreError::Rejected`] if the store reports an unknown result.
    pub async fn destroy_image(&self, asset_id: &str) -> Result<DeleteOutcome, ImageStoreError> {
        let url = self.endpoint("destroy")?;
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("public_id", asset_id), ("timestamp", &timestamp)],
            &self.api_secret,
        );

        let (url, timestamp, signature) = (&url, timestamp.as_str(), signature.as_str());
        let (status, body) =
            retry_with_backoff(self.max_retries, self.retry_backoff_ms, || async move {
                let params = [
                    ("public_id", asset_id),
                    ("timestamp", timestamp),
                    ("api_key", self.api_key.as_str()),
                    ("signature_algorithm", SIGNATURE_ALGORITHM),
                    ("signature", signature),
                ];
                let response = self.client.post(url.clone()).form(&params).send().await?;
                let (status, body) = read_body(response).await?;
                if status.is_success() || status == StatusCode::NOT_FOUND {
                    Ok((status, body))
                } else {
                    Err(unexpected_status("destroy", status, &body))
                }
            })
            .await?;

        if status == StatusCode::NOT_FOUND {
            tracing::debug!(asset_id, "image already absent from store");
            return Ok(DeleteOutcome::NotFoundIgnored);
        }

        let parsed: DestroyResponse = parse_json(&body, "destroy")?;
        match parsed.result.as_str() {
            "ok" => {
                tracing::debug!(asset_id, "image deleted");
                Ok(DeleteOutcome::Deleted)
            }
            "not found" => {
                tracing::debug!(asset_id, "image already absent from store");
                Ok(DeleteOutcome::NotFoundIgnored)
            }
            other => Err(ImageStoreError::Rejected {
                operation: "destroy",
                detail: other.to_owned(),
            }),
        }
    }

    /// `{base}/v1_1/{cloud}/image/{action}`.
    fn endpoint(&self, action: &str) -> Result<Url, ImageStoreError> {
        self.base_url
            .join(&format!("v1_1/{}/image/{action}", self.cloud_name))
            .map_err(|e| ImageStoreError::InvalidConfig(format!("cannot build {action} URL: {e}")))
    }
}

impl ImageStore for CloudinaryClient {
    async fn upload(
        &self,
        image: ImageUpload,
        folder: &str,
    ) -> Result<StoredImage, ImageStoreError> {
        self.upload_image(&image, folder).await
    }

    async fn delete(&self, asset_id: &str) -> Result<DeleteOutcome, ImageStoreError> {
        self.destroy_image(asset_id).await
    }
}

/// Signs request parameters: sort by name, join as `k=v&k=v`, append the
/// secret, and hex-encode the SHA-256 digest.
#[must_use]
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
    sorted.sort_by_key(|(name, _)| *name);
    let joined = sorted
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{:x}", Sha256::digest(format!("{joined}{api_secret}").as_bytes()))
}

async fn read_body(response: reqwest::Response) -> Result<(StatusCode, String), ImageStoreError> {
    let status = response.status();
    let body = response.text().await?;
    Ok((status, body))
}

fn unexpected_status(operation: &'static str, status: StatusCode, body: &str) -> ImageStoreError {
    let mut body = body.to_owned();
    if body.len() > ERROR_BODY_LIMIT {
        let mut cut = ERROR_BODY_LIMIT;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    ImageStoreError::UnexpectedStatus {
        operation,
        status: status.as_u16(),
        body,
    }
}

fn parse_json<T: DeserializeOwned>(body: &str, context: &str) -> Result<T, ImageStoreError> {
    serde_json::from_str(body).map_err(|e| ImageStoreError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
