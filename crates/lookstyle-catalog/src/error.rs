use lookstyle_core::CoreError;
use lookstyle_db::DbError;
use lookstyle_images::ImageStoreError;
use serde::Serialize;
use thiserror::Error;

/// Coarse error category the HTTP layer maps to a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientStock,
    Storage,
    AssetUpload,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::Storage => "storage",
            ErrorKind::AssetUpload => "asset_upload",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error(
        "insufficient stock for variant {variant_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        variant_id: i64,
        requested: i32,
        available: i32,
    },

    #[error("storage error: {0}")]
    Storage(#[from] DbError),

    #[error("image upload failed: {0}")]
    AssetUpload(#[source] ImageStoreError),
}

impl CatalogError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Validation(_) => ErrorKind::Validation,
            CatalogError::NotFound { .. } => ErrorKind::NotFound,
            CatalogError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CatalogError::Storage(_) => ErrorKind::Storage,
            CatalogError::AssetUpload(_) => ErrorKind::AssetUpload,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        CatalogError::NotFound { entity, id }
    }
}

impl From<CoreError> for CatalogError {
    fn from(err: CoreError) -> Self {
        CatalogError::Validation(err.to_string())
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        CatalogError::Storage(DbError::Sqlx(err))
    }
}
