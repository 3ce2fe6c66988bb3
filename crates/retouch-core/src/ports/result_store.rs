//! ResultStore port - 外部ワーカーが書く結果記述子の読み取り

use async_trait::async_trait;

use crate::domain::{QueueError, ResultDescriptor, TaskId};

/// ResultStore は読み取り専用
///
/// - `get`: 未生成・壊れている（ワーカーが書き込み途中）なら `Ok(None)`
/// - `list_all`: TaskStore と同じく壊れたレコードは読み飛ばす
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn get(&self, task_id: &TaskId) -> Result<Option<ResultDescriptor>, QueueError>;

    async fn list_all(&self) -> Result<Vec<ResultDescriptor>, QueueError>;
}
