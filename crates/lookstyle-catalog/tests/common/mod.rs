//! Shared fixtures for the catalog integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use lookstyle_images::{DeleteOutcome, ImageStore, ImageStoreError, ImageUpload, StoredImage};

pub const FOLDER: &str = "lookstyle";

/// In-memory image store that records calls and fails on demand. Clones
/// share state, so a test can keep one and hand another to the manager.
#[derive(Clone, Default)]
pub struct StubStore {
    state: Arc<Mutex<StubState>>,
}

#[derive(Default)]
struct StubState {
    uploads: usize,
    live: Vec<String>,
    deleted: Vec<String>,
    fail_upload_at: Option<usize>,
    failing_deletes: HashSet<String>,
}

impl StubStore {
    /// A store whose `n`-th upload (0-based) fails.
    pub fn failing_upload_at(n: usize) -> Self {
        let store = Self::default();
        store.lock().fail_upload_at = Some(n);
        store
    }

    pub fn fail_delete_of(&self, asset_id: &str) {
        self.lock().failing_deletes.insert(asset_id.to_owned());
    }

    /// Marks `asset_id` as stored without going through `upload`.
    pub fn preload(&self, asset_id: &str) {
        self.lock().live.push(asset_id.to_owned());
    }

    /// Asset ids currently stored.
    pub fn live(&self) -> Vec<String> {
        self.lock().live.clone()
    }

    /// Asset ids successfully deleted, in call order.
    pub fn deleted(&self) -> Vec<String> {
        self.lock().deleted.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StubState> {
        self.state.lock().expect("stub store mutex poisoned")
    }
}

impl ImageStore for StubStore {
    async fn upload(
        &self,
        image: ImageUpload,
        folder: &str,
    ) -> Result<StoredImage, ImageStoreError> {
        let mut state = self.lock();
        let n = state.uploads;
        state.uploads += 1;
        if state.fail_upload_at == Some(n) {
            return Err(ImageStoreError::UnexpectedStatus {
                operation: "upload",
                status: 400,
                body: "injected failure".to_owned(),
            });
        }
        let stem = image.file_name.split('.').next().unwrap_or("image");
        let asset_id = format!("{folder}/{n}-{stem}");
        state.live.push(asset_id.clone());
        Ok(StoredImage {
            url: format!("https://img.test/{asset_id}.jpg"),
            asset_id,
        })
    }

    async fn delete(&self, asset_id: &str) -> Result<DeleteOutcome, ImageStoreError> {
        let mut state = self.lock();
        if state.failing_deletes.contains(asset_id) {
            return Err(ImageStoreError::UnexpectedStatus {
                operation: "destroy",
                status: 503,
                body: "injected failure".to_owned(),
            });
        }
        let before = state.live.len();
        state.live.retain(|id| id != asset_id);
        if state.live.len() == before {
            return Ok(DeleteOutcome::NotFoundIgnored);
        }
        state.deleted.push(asset_id.to_owned());
        Ok(DeleteOutcome::Deleted)
    }
}

pub fn jpeg(name: &str) -> ImageUpload {
    ImageUpload::new(name, Some("image/jpeg".to_owned()), vec![0xFF, 0xD8])
}

pub struct Fixture {
    pub product_id: i64,
    pub colors: Vec<i64>,
    /// `S`, `M`, `L` in that order.
    pub sizes: Vec<i64>,
}

/// Insert one product priced 49.99, two colors and three sizes.
pub async fn seed(pool: &sqlx::PgPool) -> Fixture {
    let product_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO products (name, base_price) VALUES ('Linen Shirt', 49.99) RETURNING id",
    )
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert product failed: {e}"));

    let mut colors = Vec::new();
    for name in ["Navy", "Sand"] {
        let id = sqlx::query_scalar::<_, i64>("INSERT INTO colors (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(pool)
            .await
            .unwrap_or_else(|e| panic!("insert color {name} failed: {e}"));
        colors.push(id);
    }

    let mut sizes = Vec::new();
    for name in ["S", "M", "L"] {
        let id = sqlx::query_scalar::<_, i64>("INSERT INTO sizes (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(pool)
            .await
            .unwrap_or_else(|e| panic!("insert size {name} failed: {e}"));
        sizes.push(id);
    }

    Fixture {
        product_id,
        colors,
        sizes,
    }
}

pub async fn count_rows(pool: &sqlx::PgPool, table: &str, variant_id: i64) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM {table} WHERE variant_id = $1"
    ))
    .bind(variant_id)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("count {table} failed: {e}"))
}

pub async fn stock_of(pool: &sqlx::PgPool, variant_id: i64) -> i32 {
    sqlx::query_scalar::<_, i32>("SELECT stock_quantity FROM variants WHERE id = $1")
        .bind(variant_id)
        .fetch_one(pool)
        .await
        .unwrap_or_else(|e| panic!("stock lookup failed: {e}"))
}

/// Insert a variant row directly with the given aggregate stock.
pub async fn variant_with_stock(pool: &sqlx::PgPool, fixture: &Fixture, stock: i32) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO variants (product_id, color_id, stock_quantity) \
         VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(fixture.product_id)
    .bind(fixture.colors[0])
    .bind(stock)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert variant failed: {e}"))
}

pub async fn sale(pool: &sqlx::PgPool) -> i64 {
    sqlx::query_scalar::<_, i64>("INSERT INTO sales (user_id, total) VALUES (1, 0) RETURNING id")
        .fetch_one(pool)
        .await
        .unwrap_or_else(|e| panic!("insert sale failed: {e}"))
}
