//! In-memory port implementations.
//!
//! Used by tests and by embedders that keep the queue inside one process.
//! State lives behind `tokio::sync::Mutex`; nothing is persisted.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::fs_lock::expiry;
use super::json_catalog::CatalogRecord;
use crate::domain::{
    AssetRef, CategoryId, Product, ProductId, QueueError, ResultDescriptor, TaskDescriptor, TaskId,
};
use crate::ports::{
    AssetResolver, Clock, ImageArchive, ProcessingLock, ProductCatalog, ResolvedAsset, ResultStore,
    TaskStore,
};

/// Task descriptors keyed by id, listed in id order.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<BTreeMap<TaskId, TaskDescriptor>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tasks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.lock().await.is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn put(&self, task: &TaskDescriptor) -> Result<(), QueueError> {
        task.validate()?;
        let mut tasks = self.tasks.lock().await;
        if tasks.contains_key(&task.task_id) {
            return Err(QueueError::Conflict(task.task_id.clone()));
        }
        tasks.insert(task.task_id.clone(), task.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<TaskDescriptor>, QueueError> {
        Ok(self.tasks.lock().await.values().cloned().collect())
    }

    async fn get(&self, task_id: &TaskId) -> Result<Option<TaskDescriptor>, QueueError> {
        Ok(self.tasks.lock().await.get(task_id).cloned())
    }
}

/// Result descriptors as the external worker would leave them.
#[derive(Default)]
pub struct InMemoryResultStore {
    results: Mutex<BTreeMap<TaskId, ResultDescriptor>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the worker writing a result; replaces any earlier one.
    pub async fn insert(&self, result: ResultDescriptor) {
        self.results
            .lock()
            .await
            .insert(result.task_id.clone(), result);
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn get(&self, task_id: &TaskId) -> Result<Option<ResultDescriptor>, QueueError> {
        Ok(self.results.lock().await.get(task_id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<ResultDescriptor>, QueueError> {
        Ok(self.results.lock().await.values().cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryCatalog {
    records: Mutex<BTreeMap<ProductId, CatalogRecord>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: CatalogRecord) {
        self.records
            .lock()
            .await
            .insert(record.product.id, record);
    }

    /// Shorthand for a product in the given categories.
    pub async fn insert_product(
        &self,
        product: Product,
        categories: impl IntoIterator<Item = CategoryId>,
    ) {
        self.insert(CatalogRecord::new(product).in_categories(categories))
            .await;
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, QueueError> {
        Ok(self.records.lock().await.get(&id).map(|r| r.product.clone()))
    }

    async fn processed_marker(&self, id: ProductId) -> Result<Option<TaskId>, QueueError> {
        Ok(self
            .records
            .lock()
            .await
            .get(&id)
            .and_then(|r| r.processed_marker.clone()))
    }

    async fn set_processed_marker(
        &self,
        id: ProductId,
        task_id: &TaskId,
    ) -> Result<(), QueueError> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(&id)
            .ok_or_else(|| QueueError::not_found("product", id))?;
        record.processed_marker = Some(task_id.clone());
        Ok(())
    }

    async fn in_category(&self, id: ProductId, category: CategoryId) -> Result<bool, QueueError> {
        Ok(self
            .records
            .lock()
            .await
            .get(&id)
            .is_some_and(|r| r.categories.contains(&category)))
    }

    async fn products_in_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<ProductId>, QueueError> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .filter(|r| r.product.is_product() && r.categories.contains(&category))
            .map(|r| r.product.id)
            .collect())
    }
}

/// Process-local lock with the same expiry rules as the file lock.
pub struct InMemoryLock {
    expires_at: Mutex<Option<DateTime<Utc>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryLock {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            expires_at: Mutex::new(None),
            clock,
        }
    }
}

#[async_trait]
impl ProcessingLock for InMemoryLock {
    async fn try_acquire(&self, ttl: Duration) -> Result<bool, QueueError> {
        let now = self.clock.now();
        let mut expires_at = self.expires_at.lock().await;
        if expires_at.is_some_and(|at| at > now) {
            return Ok(false);
        }
        *expires_at = Some(expiry(now, ttl));
        Ok(true)
    }

    async fn release(&self) -> Result<(), QueueError> {
        *self.expires_at.lock().await = None;
        Ok(())
    }

    async fn is_held(&self) -> Result<bool, QueueError> {
        let now = self.clock.now();
        Ok(self.expires_at.lock().await.is_some_and(|at| at > now))
    }
}

/// Records what would have been copied instead of touching the disk.
pub struct InMemoryImageArchive {
    dir: PathBuf,
    preserved: Mutex<Vec<(PathBuf, String)>>,
}

impl InMemoryImageArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            preserved: Mutex::new(Vec::new()),
        }
    }

    /// `(source, name)` pairs in call order.
    pub async fn preserved(&self) -> Vec<(PathBuf, String)> {
        self.preserved.lock().await.clone()
    }
}

#[async_trait]
impl ImageArchive for InMemoryImageArchive {
    async fn preserve(&self, source: &Path, name: &str) -> Result<PathBuf, QueueError> {
        self.preserved
            .lock()
            .await
            .push((source.to_path_buf(), name.to_string()));
        Ok(self.dir.join(name))
    }
}

/// Fixed table of resolvable assets; anything else is unresolved.
#[derive(Default)]
pub struct InMemoryAssetResolver {
    assets: HashMap<AssetRef, ResolvedAsset>,
}

impl InMemoryAssetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, asset: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let url = format!("https://media.test/{}", path.display());
        self.assets.insert(
            AssetRef::new(asset),
            ResolvedAsset { path, url },
        );
        self
    }
}

#[async_trait]
impl AssetResolver for InMemoryAssetResolver {
    async fn resolve(&self, asset: &AssetRef) -> Result<Option<ResolvedAsset>, QueueError> {
        Ok(self.assets.get(asset).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProductSnapshot;
    use crate::ports::FixedClock;
    use chrono::{TimeDelta, TimeZone};

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn task_store_rejects_duplicate_ids() {
        let store = InMemoryTaskStore::new();
        let task = TaskDescriptor::new(
            TaskId::new("20240101_120000_501"),
            ProductSnapshot::new().with("brand", "Acme"),
            noon(),
        );
        store.put(&task).await.unwrap();
        let err = store.put(&task).await.unwrap_err();
        assert!(matches!(err, QueueError::Conflict(_)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn lock_expires_with_the_clock() {
        let clock = Arc::new(FixedClock::new(noon()));
        let lock = InMemoryLock::new(clock.clone());

        assert!(lock.try_acquire(Duration::from_secs(600)).await.unwrap());
        assert!(!lock.try_acquire(Duration::from_secs(600)).await.unwrap());

        clock.advance(TimeDelta::minutes(10));
        assert!(!lock.is_held().await.unwrap());
        assert!(lock.try_acquire(Duration::from_secs(600)).await.unwrap());

        lock.release().await.unwrap();
        assert!(!lock.is_held().await.unwrap());
    }

    #[tokio::test]
    async fn catalog_lists_only_products_in_category() {
        let catalog = InMemoryCatalog::new();
        catalog
            .insert_product(Product::new(ProductId::new(1)), [CategoryId::new(7)])
            .await;
        catalog
            .insert_product(Product::new(ProductId::new(2)), [CategoryId::new(8)])
            .await;
        let mut page = Product::new(ProductId::new(3));
        page.kind = "page".to_string();
        catalog.insert_product(page, [CategoryId::new(7)]).await;

        assert_eq!(
            catalog.products_in_category(CategoryId::new(7)).await.unwrap(),
            vec![ProductId::new(1)]
        );
    }
}
