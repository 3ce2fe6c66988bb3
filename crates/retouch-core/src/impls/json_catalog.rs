//! JSON-file product catalog.
//!
//! Stands in for the host shop when the queue runs standalone: the host exports
//! its products (with category membership already expanded) into one document,
//! and processed markers are written back into the same file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::fs_json::{read_json, write_json_replace};
use crate::domain::{CategoryId, Product, ProductId, QueueError, TaskId};
use crate::ports::ProductCatalog;

/// One product plus the catalog-side bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    #[serde(flatten)]
    pub product: Product,

    /// Categories the product belongs to, ancestors included.
    #[serde(default)]
    pub categories: Vec<CategoryId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_marker: Option<TaskId>,
}

impl CatalogRecord {
    pub fn new(product: Product) -> Self {
        Self {
            product,
            categories: Vec::new(),
            processed_marker: None,
        }
    }

    pub fn in_categories(mut self, categories: impl IntoIterator<Item = CategoryId>) -> Self {
        self.categories.extend(categories);
        self
    }

    pub fn with_marker(mut self, task_id: TaskId) -> Self {
        self.processed_marker = Some(task_id);
        self
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    products: Vec<CatalogRecord>,
}

pub struct JsonFileCatalog {
    path: PathBuf,
    records: Mutex<BTreeMap<ProductId, CatalogRecord>>,
}

impl JsonFileCatalog {
    /// Load the document at `path`; a missing file is an empty catalog.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, QueueError> {
        let path = path.into();
        let records = read_records(&path).await?;
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, records: &BTreeMap<ProductId, CatalogRecord>) -> Result<(), QueueError> {
        let document = CatalogDocument {
            products: records.values().cloned().collect(),
        };
        write_json_replace(&self.path, &document).await
    }
}

async fn read_records(path: &Path) -> Result<BTreeMap<ProductId, CatalogRecord>, QueueError> {
    let document = match tokio::fs::try_exists(path).await {
        Ok(true) => read_json::<CatalogDocument>(path).await?.ok_or_else(|| {
            QueueError::Validation(format!("catalog {} is not valid JSON", path.display()))
        })?,
        Ok(false) => CatalogDocument::default(),
        Err(e) => return Err(QueueError::storage(path, e)),
    };
    Ok(document
        .products
        .into_iter()
        .map(|record| (record.product.id, record))
        .collect())
}

#[async_trait]
impl ProductCatalog for JsonFileCatalog {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, QueueError> {
        let records = self.records.lock().await;
        Ok(records.get(&id).map(|r| r.product.clone()))
    }

    async fn processed_marker(&self, id: ProductId) -> Result<Option<TaskId>, QueueError> {
        let records = self.records.lock().await;
        Ok(records.get(&id).and_then(|r| r.processed_marker.clone()))
    }

    async fn set_processed_marker(
        &self,
        id: ProductId,
        task_id: &TaskId,
    ) -> Result<(), QueueError> {
        let mut records = self.records.lock().await;
        // the host may have re-exported the file since we loaded it
        let mut fresh = read_records(&self.path).await?;
        let record = fresh
            .get_mut(&id)
            .ok_or_else(|| QueueError::not_found("product", id))?;
        record.processed_marker = Some(task_id.clone());
        self.persist(&fresh).await?;
        *records = fresh;
        Ok(())
    }

    async fn in_category(&self, id: ProductId, category: CategoryId) -> Result<bool, QueueError> {
        let records = self.records.lock().await;
        Ok(records
            .get(&id)
            .is_some_and(|r| r.categories.contains(&category)))
    }

    async fn products_in_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<ProductId>, QueueError> {
        let records = self.records.lock().await;
        Ok(records
            .values()
            .filter(|r| r.product.is_product() && r.categories.contains(&category))
            .map(|r| r.product.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
      "products": [
        {
          "id": 501,
          "attributes": {"brand": "Acme", "season": "летняя"},
          "image": "2024/01/acme.jpg",
          "categories": [14834, 15000]
        },
        {"id": 502, "kind": "page", "categories": [14834]},
        {"id": 503, "categories": [99], "processed_marker": "20231231_000000_503"}
      ]
    }"#;

    #[tokio::test]
    async fn reads_products_and_membership() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("catalog.json");
        std::fs::write(&path, DOC).unwrap();
        let catalog = JsonFileCatalog::open(&path).await.unwrap();

        let p = catalog.product(ProductId::new(501)).await.unwrap().unwrap();
        assert!(p.is_product());
        assert_eq!(p.attribute("brand"), "Acme");
        assert_eq!(p.attribute("model"), "");

        let page = catalog.product(ProductId::new(502)).await.unwrap().unwrap();
        assert!(!page.is_product());

        assert!(
            catalog
                .in_category(ProductId::new(501), CategoryId::new(14834))
                .await
                .unwrap()
        );
        assert!(
            !catalog
                .in_category(ProductId::new(503), CategoryId::new(14834))
                .await
                .unwrap()
        );
        assert_eq!(
            catalog
                .products_in_category(CategoryId::new(14834))
                .await
                .unwrap(),
            vec![ProductId::new(501)]
        );
        assert_eq!(
            catalog.processed_marker(ProductId::new(503)).await.unwrap(),
            Some(TaskId::new("20231231_000000_503"))
        );
    }

    #[tokio::test]
    async fn markers_are_written_back() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("catalog.json");
        std::fs::write(&path, DOC).unwrap();

        let catalog = JsonFileCatalog::open(&path).await.unwrap();
        catalog
            .set_processed_marker(ProductId::new(501), &TaskId::new("20240101_120000_501"))
            .await
            .unwrap();

        let reopened = JsonFileCatalog::open(&path).await.unwrap();
        assert_eq!(
            reopened.processed_marker(ProductId::new(501)).await.unwrap(),
            Some(TaskId::new("20240101_120000_501"))
        );
        // 他の属性は保持される
        let p = reopened.product(ProductId::new(501)).await.unwrap().unwrap();
        assert_eq!(p.attribute("season"), "летняя");
    }

    #[tokio::test]
    async fn marker_for_unknown_product_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog = JsonFileCatalog::open(tmp.path().join("none.json")).await.unwrap();
        let err = catalog
            .set_processed_marker(ProductId::new(1), &TaskId::new("t"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::NotFound { .. }));
    }

    #[tokio::test]
    async fn failed_write_leaves_marker_unset() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("catalog.json");
        std::fs::write(&path, DOC).unwrap();
        let catalog = JsonFileCatalog::open(&path).await.unwrap();

        // a directory in place of the file makes both the read and the write fail
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        let id = ProductId::new(501);
        let task_id = TaskId::new("20240101_120000_501");
        assert!(catalog.set_processed_marker(id, &task_id).await.is_err());
        assert_eq!(catalog.processed_marker(id).await.unwrap(), None);

        std::fs::remove_dir(&path).unwrap();
        std::fs::write(&path, DOC).unwrap();
        catalog.set_processed_marker(id, &task_id).await.unwrap();
        let reopened = JsonFileCatalog::open(&path).await.unwrap();
        assert_eq!(reopened.processed_marker(id).await.unwrap(), Some(task_id));
    }

    #[tokio::test]
    async fn marker_write_keeps_host_reexport() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("catalog.json");
        std::fs::write(&path, r#"{"products": [{"id": 501, "categories": [14834]}]}"#).unwrap();
        let catalog = JsonFileCatalog::open(&path).await.unwrap();
        assert!(catalog.product(ProductId::new(503)).await.unwrap().is_none());

        // host re-exports with a new product while we are running
        std::fs::write(&path, DOC).unwrap();
        catalog
            .set_processed_marker(ProductId::new(501), &TaskId::new("20240101_120000_501"))
            .await
            .unwrap();

        let reopened = JsonFileCatalog::open(&path).await.unwrap();
        assert_eq!(
            reopened.processed_marker(ProductId::new(501)).await.unwrap(),
            Some(TaskId::new("20240101_120000_501"))
        );
        assert_eq!(
            reopened.processed_marker(ProductId::new(503)).await.unwrap(),
            Some(TaskId::new("20231231_000000_503"))
        );
        assert!(catalog.product(ProductId::new(503)).await.unwrap().is_some());
        assert_eq!(
            catalog.processed_marker(ProductId::new(501)).await.unwrap(),
            Some(TaskId::new("20240101_120000_501"))
        );
    }

    #[tokio::test]
    async fn invalid_catalog_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("catalog.json");
        std::fs::write(&path, b"{ not json").unwrap();
        assert!(JsonFileCatalog::open(&path).await.is_err());
    }
}
