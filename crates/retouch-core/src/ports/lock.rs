//! ProcessingLock port - 投入処理の single-flight ロック
//!
//! 期限付きのフラグ。保持者がクラッシュしても TTL が切れれば再取得できます。

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::QueueError;

/// ProcessingLock はバッチ・単一投入を直列化する
///
/// # 設計原則
/// - `try_acquire` は check-and-set を一度に行う（取れなければ `Ok(false)`）
/// - 照合（reconciliation）はこのロックを使わない
/// - `release` は保持していなくても成功する（stop 操作）
#[async_trait]
pub trait ProcessingLock: Send + Sync {
    async fn try_acquire(&self, ttl: Duration) -> Result<bool, QueueError>;

    async fn release(&self) -> Result<(), QueueError>;

    async fn is_held(&self) -> Result<bool, QueueError>;
}
