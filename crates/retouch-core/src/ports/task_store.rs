//! TaskStore port - タスク記述子の永続化
//!
//! 1 タスク = 1 レコード（ファイル実装では `<task_id>.json`）。

use async_trait::async_trait;

use crate::domain::{QueueError, TaskDescriptor, TaskId};

/// TaskStore はタスク記述子の正本
///
/// # 契約
/// - `put`: 検証に失敗したら何も書かない（`Validation`）。既存 ID は上書きしない（`Conflict`）。
///   I/O 失敗は握りつぶさず `Storage` で返す。
/// - `list_all`: 壊れた・書きかけのレコードは読み飛ばす。順序は未規定。
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn put(&self, task: &TaskDescriptor) -> Result<(), QueueError>;

    async fn list_all(&self) -> Result<Vec<TaskDescriptor>, QueueError>;

    /// Convenience lookup with the same tolerance as `list_all`.
    async fn get(&self, task_id: &TaskId) -> Result<Option<TaskDescriptor>, QueueError> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .find(|task| &task.task_id == task_id))
    }
}
