//! Best-effort cleanup of external image assets.

use futures::future::join_all;
use lookstyle_images::{asset_id_from_url, DeleteOutcome, ImageStore};
use serde::Serialize;

/// An external asset that could not be removed. The local reference is
/// already gone; the asset is orphaned in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupWarning {
    pub url: String,
    pub asset_id: Option<String>,
    pub reason: String,
}

/// A successful result plus the cleanup failures that did not abort it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciled<T> {
    pub value: T,
    pub warnings: Vec<CleanupWarning>,
}

impl<T> Reconciled<T> {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// An asset the catalog no longer references.
#[derive(Debug, Clone)]
pub(crate) struct StaleAsset {
    pub url: String,
    pub asset_id: Option<String>,
}

/// Deletes every asset concurrently. Never fails; each asset that could not
/// be removed becomes one warning.
pub(crate) async fn discard_assets<S: ImageStore>(
    store: &S,
    folder: &str,
    assets: Vec<StaleAsset>,
) -> Vec<CleanupWarning> {
    let attempts = assets.into_iter().map(|asset| async move {
        let Some(asset_id) = asset
            .asset_id
            .clone()
            .or_else(|| asset_id_from_url(&asset.url, folder))
        else {
            tracing::warn!(url = %asset.url, "cannot determine asset id, leaving asset in store");
            return Some(CleanupWarning {
                url: asset.url,
                asset_id: None,
                reason: "cannot determine asset id from url".to_owned(),
            });
        };

        match store.delete(&asset_id).await {
            Ok(DeleteOutcome::Deleted) => {
                tracing::debug!(asset_id = %asset_id, "stale image deleted");
                None
            }
            Ok(DeleteOutcome::NotFoundIgnored) => {
                tracing::debug!(asset_id = %asset_id, "stale image already absent");
                None
            }
            Err(e) => {
                tracing::warn!(
                    asset_id = %asset_id,
                    url = %asset.url,
                    error = %e,
                    "failed to delete stale image"
                );
                Some(CleanupWarning {
                    url: asset.url,
                    asset_id: Some(asset_id),
                    reason: e.to_string(),
                })
            }
        }
    });

    join_all(attempts).await.into_iter().flatten().collect()
}
