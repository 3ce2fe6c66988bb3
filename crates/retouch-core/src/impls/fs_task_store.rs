//! File-backed TaskStore: one pretty-printed `<task_id>.json` per task.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::fs_json::{read_json, read_json_dir, write_json_new};
use crate::domain::{QueueError, TaskDescriptor, TaskId};
use crate::ports::TaskStore;

/// Directory name under the data root.
pub const TASKS_DIR: &str = "tasks";

#[derive(Debug, Clone)]
pub struct FsTaskStore {
    dir: PathBuf,
}

impl FsTaskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, task_id: &TaskId) -> PathBuf {
        self.dir.join(task_id.file_name())
    }
}

#[async_trait]
impl TaskStore for FsTaskStore {
    async fn put(&self, task: &TaskDescriptor) -> Result<(), QueueError> {
        task.validate()?;
        let path = self.path_of(&task.task_id);
        if !write_json_new(&path, task).await? {
            return Err(QueueError::Conflict(task.task_id.clone()));
        }
        debug!(task_id = %task.task_id, path = %path.display(), "task written");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<TaskDescriptor>, QueueError> {
        read_json_dir(&self.dir).await
    }

    async fn get(&self, task_id: &TaskId) -> Result<Option<TaskDescriptor>, QueueError> {
        if task_id.validate_file_stem().is_err() {
            return Ok(None);
        }
        read_json(&self.path_of(task_id)).await
    }
}
