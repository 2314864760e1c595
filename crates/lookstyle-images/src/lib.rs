//! External image storage for variant pictures.
//!
//! [`ImageStore`] is the seam the catalog depends on; [`CloudinaryClient`]
//! is the production implementation.

pub mod client;
pub mod error;
pub(crate) mod retry;
pub mod types;

use std::future::Future;

pub use client::{sign_params, CloudinaryClient};
pub use error::ImageStoreError;
pub use types::{DeleteOutcome, ImageUpload, StoredImage};

/// Upload and delete of binary assets at an external object store.
pub trait ImageStore: Send + Sync {
    /// Uploads `image` into `folder` and returns its public URL and asset id.
    fn upload(
        &self,
        image: ImageUpload,
        folder: &str,
    ) -> impl Future<Output = Result<StoredImage, ImageStoreError>> + Send;

    /// Deletes the asset identified by `asset_id`.
    fn delete(
        &self,
        asset_id: &str,
    ) -> impl Future<Output = Result<DeleteOutcome, ImageStoreError>> + Send;
}

/// Recovers the asset id of a reference stored without one.
///
/// For delivery URLs the id is the path after `/upload/`, minus an optional
/// `v<digits>` version segment and the file extension, so
/// `https://res.cloudinary.com/demo/image/upload/v17/lookstyle/2023/abc.jpg`
/// becomes `lookstyle/2023/abc`. Other URLs fall back to `folder` plus the
/// file stem. Returns `None` when the URL has no file name.
#[must_use]
pub fn asset_id_from_url(url: &str, folder: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    if let Some((_, tail)) = path.split_once("/upload/") {
        return delivery_asset_id(tail);
    }

    let file = path.rsplit('/').next().filter(|s| !s.is_empty())?;
    let stem = strip_extension(file)?;
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        Some(stem.to_owned())
    } else {
        Some(format!("{folder}/{stem}"))
    }
}

fn delivery_asset_id(tail: &str) -> Option<String> {
    let mut segments: Vec<&str> = tail.split('/').filter(|s| !s.is_empty()).collect();
    if segments.first().is_some_and(|s| is_version_segment(s)) {
        segments.remove(0);
    }
    let file = segments.pop()?;
    let stem = strip_extension(file)?;
    segments.push(stem);
    Some(segments.join("/"))
}

fn is_version_segment(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

fn strip_extension(file: &str) -> Option<&str> {
    let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
    Some(stem).filter(|s| !s.is_empty())
}
