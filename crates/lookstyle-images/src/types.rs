//! Values exchanged with the image store and the JSON bodies it returns.

use serde::Deserialize;

/// One binary payload to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    /// MIME type reported by the client, e.g. `image/jpeg`.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    #[must_use]
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }
}

/// Reference to an uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Public HTTPS URL of the asset.
    pub url: String,
    /// Store-side identifier used to delete the asset later.
    pub asset_id: String,
}

/// Result of a delete request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The asset was already gone.
    NotFoundIgnored,
}

/// Body of a successful `image/upload` call. Only the fields we keep.
#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    pub public_id: String,
    pub secure_url: String,
}

/// Body of an `image/destroy` call: `{"result": "ok"}` or `{"result": "not found"}`.
#[derive(Debug, Deserialize)]
pub(crate) struct DestroyResponse {
    pub result: String,
}
