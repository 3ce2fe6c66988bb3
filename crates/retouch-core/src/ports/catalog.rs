//! ProductCatalog port - ホスト側の商品カタログ
//!
//! 属性の読み取り、処理済みマーカーの読み書き、カテゴリ所属の判定を提供します。
//! カテゴリツリーの展開はカタログ側の責務です。

use async_trait::async_trait;

use crate::domain::{CategoryId, Product, ProductId, QueueError, TaskId};

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// `None` when no record with this id exists (of any kind).
    async fn product(&self, id: ProductId) -> Result<Option<Product>, QueueError>;

    /// Task id that last produced output for the product.
    async fn processed_marker(&self, id: ProductId) -> Result<Option<TaskId>, QueueError>;

    async fn set_processed_marker(&self, id: ProductId, task_id: &TaskId)
    -> Result<(), QueueError>;

    /// Membership in the category or any of its descendants.
    async fn in_category(&self, id: ProductId, category: CategoryId) -> Result<bool, QueueError>;

    /// Every product in the category or any of its descendants.
    async fn products_in_category(&self, category: CategoryId)
    -> Result<Vec<ProductId>, QueueError>;
}
